use thiserror::Error;
use uuid::Uuid;

pub type BanditResult<T> = Result<T, BanditError>;

#[derive(Error, Debug)]
pub enum BanditError {
    /// Construction-time failure: out-of-range `arms`/`epsilon` or a malformed
    /// `counts`/`values` pair.
    #[error("{0}")]
    InvalidConfiguration(String),

    /// Bad `arm` or `reward` passed to a reward call.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("experiment not found: {0}")]
    ExperimentNotFound(Uuid),

    /// Snapshot JSON that does not have the four-field shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BanditError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
