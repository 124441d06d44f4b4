//! Error types shared by collaborator implementations

use thiserror::Error;

/// Errors raised by external collaborators (vector index, chunk store, generator)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retrieval error: {0}")]
    Rag(String),
}

pub type Result<T> = std::result::Result<T, Error>;
