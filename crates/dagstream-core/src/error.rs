use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagstreamError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DagstreamError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            DagstreamError::Config(_) => "CONFIG_ERROR",
            DagstreamError::Serialization(_) => "SERIALIZATION_ERROR",
            DagstreamError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, DagstreamError>;
