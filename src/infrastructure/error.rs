use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Backend error: {0}")]
    Backend(String),
}
