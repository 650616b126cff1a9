use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] slash::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("expected {expected} rows, found only {actual}")]
    ShortRead { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CliError>;
