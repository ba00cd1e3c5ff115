use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid option {option}: {reason}")]
    InvalidOption { option: String, reason: String },
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
