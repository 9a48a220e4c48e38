use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No documents could be loaded from {0}")]
    NoDocuments(String),

    #[error("No documents have been indexed yet")]
    NotReady,

    #[error("External call failed: {0}")]
    ExternalCall(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn operation(err: impl std::fmt::Display) -> Self {
        Self::Operation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
