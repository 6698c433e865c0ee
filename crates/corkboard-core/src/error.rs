//! Referential errors reported by board operations.
//!
//! Validation problems (blank names, empty content) are not errors: those
//! operations quietly do nothing. Only operations that name a record which
//! doesn't exist come back as a [`BoardError`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("no edit session is open")]
    NoEditSession,
}

pub type BoardResult<T> = std::result::Result<T, BoardError>;
