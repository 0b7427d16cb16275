//! trbrowse-store
//!
//! Implementations of the persistent key-value `StateStore` seam: a JSON
//! document on disk for real runs and an in-memory map for tests.

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
