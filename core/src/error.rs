use thiserror::Error;

#[derive(Error, Debug)]
pub enum MissionError {
    #[error("Invalid route: {reason}")]
    InvalidRoute { reason: String },

    #[error("Invalid racer roster: {reason}")]
    InvalidRoster { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Racer {index} not found")]
    RacerNotFound { index: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type MissionResult<T> = Result<T, MissionError>;
