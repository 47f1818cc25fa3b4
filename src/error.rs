//! Error types for board ordering and persistence.

use thiserror::Error;

pub type BoardResult<T> = Result<T, BoardError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Source index outside the sequence
    #[error("index {index} out of bounds for {len} siblings")]
    InvalidIndex { index: usize, len: usize },

    /// Stale cache: the entity isn't where the gesture says it is
    #[error("entity {id} not found in source sequence")]
    EntityNotFound { id: u32 },

    #[error("persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BoardError {
    fn from(err: reqwest::Error) -> Self {
        BoardError::PersistenceFailure(err.to_string())
    }
}
