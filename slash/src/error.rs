use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("hash family is degenerate: K*L = {k_times_l} exceeds range 2^{range_pow} ({range})")]
    DegenerateHashFamily {
        k_times_l: u64,
        range_pow: u32,
        range: u64,
    },
    #[error("invalid markers array: {reason}")]
    InvalidMarkers { reason: String },
    #[error("expected {expected} labels, got {actual}")]
    LabelCountMismatch { expected: usize, actual: usize },
    #[error("transport failure: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
