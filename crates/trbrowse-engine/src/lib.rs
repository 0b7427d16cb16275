//! trbrowse-engine
//!
//! The region browsing & filtering state engine: filter criteria model,
//! dataset query facade, pagination and region navigation, per-mode state
//! cache and session synchronization. Generic over the dataset backend and
//! the persistent state store.

pub mod annotations;
pub mod criteria;
pub mod engine;
pub mod facade;
pub mod mode_cache;
pub mod session;

pub use engine::{BrowseEngine, SelectionHint};
pub use facade::{AdvancedResult, DatasetQueryFacade, FilterOutcome};
