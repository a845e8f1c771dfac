use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Words file not found: {0}")]
    SourceNotFound(String),

    #[error("Unknown match mode: {0} (expected exact, contains, startswith or endswith)")]
    UnknownMode(String),

    #[error("No category matched: {0}")]
    UnknownCategory(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for SolverError {
    fn from(err: std::io::Error) -> Self {
        SolverError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SolverError {
    fn from(err: serde_json::Error) -> Self {
        SolverError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
