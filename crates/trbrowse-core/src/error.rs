use thiserror::Error;

/// Error taxonomy shared across the workspace.
///
/// `Load` and `Query` mean the displayed state may no longer match the
/// backend and must reach the user. `Resolution` is soft for passive
/// navigation and hard for explicit lookups; callers decide.
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("Failed to load dataset: {0}")]
    Load(String),

    #[error("Backend rejected query: {0}")]
    Query(String),

    #[error("Record number out of range: got {index}, valid records are 1..={total}")]
    Range { index: usize, total: usize },

    #[error("Not found under the active filter: {0}")]
    Resolution(String),

    #[error("Invalid region '{0}', expected chr:start-end (e.g. chr1:1000-2000)")]
    InvalidRegion(String),

    #[error("State store failure: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, BrowseError>;
