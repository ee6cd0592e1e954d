use thiserror::Error;

pub type QuestResult<T> = Result<T, QuestError>;

#[derive(Error, Debug)]
pub enum QuestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("Level table error: {0}")]
    LevelTable(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
