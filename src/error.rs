use thiserror::Error;

/// Errors raised by the archipelago core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("expected a vector of length {expected} but got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("index {index} is out of range for size {size}")]
    OutOfRange { index: usize, size: usize },

    #[error("the island does not belong to this archipelago")]
    NotFound,

    #[error("the archipelago cannot hold more than {0} islands")]
    Overflow(usize),

    #[error("island {island:?} failed: {message}")]
    UserFailure {
        /// The index of the island the failure was captured on, when known. `None` for a
        /// standalone island with no archipelago back-reference.
        island: Option<usize>,
        message: String,
    },

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Wrap an opaque user error (from a `Problem`, `Algorithm` or `Udi`) as a [`Error::UserFailure`],
    /// tagging it with the island it was captured on.
    pub(crate) fn from_user_error(
        island: Option<usize>,
        err: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Error::UserFailure {
            island,
            message: err.to_string(),
        }
    }
}

pub type OResult<T> = Result<T, Error>;
