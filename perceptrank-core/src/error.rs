//! Error types for the rating and sampling engine.

use thiserror::Error;

use crate::types::ItemId;

/// Failure reported by a `PersistentStore` implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PersistenceError {
    pub message: String,
    #[source]
    pub source: Option<std::io::Error>,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        PersistenceError { message: message.into(), source: None }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        PersistenceError { message: message.into(), source: Some(source) }
    }
}

/// Errors surfaced by the engine to its driver.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fewer than two items to compare. Fatal for the current phase.
    #[error("need at least 2 items to compare, found {found}")]
    InsufficientItems { found: usize },

    /// Dimension index does not name a configured dimension.
    #[error("dimension index {index} out of range ({count} dimensions configured)")]
    DimensionOutOfRange { index: usize, count: usize },

    /// The campaign was configured without any dimension.
    #[error("at least one dimension is required")]
    NoDimensions,

    /// The same dimension name was configured twice.
    #[error("dimension \"{0}\" is listed more than once")]
    DuplicateDimension(String),

    /// A persisted count table was built for a different number of dimensions.
    #[error("count table covers {found} dimension(s) but {expected} are configured")]
    CountsShapeMismatch { found: usize, expected: usize },

    /// An item was compared against itself.
    #[error("cannot compare item \"{0}\" with itself")]
    SameItem(ItemId),

    /// Subject identifiers must be non-empty when given.
    #[error("subject identifier must not be empty")]
    InvalidSubject,

    /// A judgment arrived with no pair on display.
    #[error("no pair is awaiting a judgment")]
    NoPendingPair,

    #[error("unknown outcome \"{0}\" (expected left, right or equal)")]
    UnknownOutcome(String),

    /// An item's asset could not be resolved at display time. Non-fatal.
    #[error("asset for item \"{item}\" is unavailable")]
    AssetUnavailable { item: ItemId },

    /// The backing store rejected a commit. In-memory state has already
    /// advanced; the commit stays queued for retry.
    #[error("failed to persist judgment ({pending} commit(s) pending): {source}")]
    Persistence {
        pending: usize,
        #[source]
        source: PersistenceError,
    },
}

impl EngineError {
    /// Whether the judging loop can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::AssetUnavailable { .. }
                | EngineError::Persistence { .. }
                | EngineError::UnknownOutcome(_)
                | EngineError::NoPendingPair
        )
    }
}
