use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostarError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Synthesis error: {0}")]
    Synthesis(String),
    #[error("Level {level} exceeded its time limit of {limit_ms} ms")]
    Timeout { level: usize, limit_ms: u128 },
    #[error("Evaluation interrupted")]
    Interrupted,
    #[error("Input error: {0}")]
    Input(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, CostarError>;

// Helper conversions
impl From<rusqlite::Error> for CostarError {
    fn from(e: rusqlite::Error) -> Self {
        if e.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted) {
            Self::Interrupted
        } else {
            Self::Storage(e.to_string())
        }
    }
}

impl From<config::ConfigError> for CostarError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl From<std::io::Error> for CostarError {
    fn from(e: std::io::Error) -> Self { Self::Input(e.to_string()) }
}
