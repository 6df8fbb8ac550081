use crate::store::StoreError;
use std::fmt;

/// Machine-readable error codes for tooling and operator scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Configuration,
    AlreadyStarted,
    DuplicateWorker,
    UnknownWorker,
    Exhausted,
    StorageFailed,
    LockContention,
    Unimplemented,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Configuration => "E1001",
            Self::AlreadyStarted => "E1002",
            Self::DuplicateWorker => "E2001",
            Self::UnknownWorker => "E2002",
            Self::Exhausted => "E2003",
            Self::StorageFailed => "E5001",
            Self::LockContention => "E5002",
            Self::Unimplemented => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Configuration => "Invalid experiment configuration",
            Self::AlreadyStarted => "Experiment already started",
            Self::DuplicateWorker => "Worker already registered",
            Self::UnknownWorker => "Worker not registered",
            Self::Exhausted => "Worker has received every unit",
            Self::StorageFailed => "Blob store operation failed",
            Self::LockContention => "Lock contention",
            Self::Unimplemented => "Operation not implemented",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::Configuration => Some("Check unit size, coverage, and entity list values."),
            Self::AlreadyStarted => {
                Some("An experiment's unit set is immutable; start a new experiment instead.")
            }
            Self::DuplicateWorker => Some("Use `allocate` to hand the existing worker more work."),
            Self::UnknownWorker => Some("Register the worker before requesting an allocation."),
            Self::Exhausted => None,
            Self::StorageFailed => Some("Check store connectivity/permissions and retry."),
            Self::LockContention => {
                Some("Retry after the other `allot` process releases its lock.")
            }
            Self::Unimplemented => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by experiment lifecycle and allocation operations.
///
/// `Exhausted` is an expected terminal condition for a worker, not a bug;
/// callers should map it to a distinct status rather than a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("invalid experiment configuration: {0}")]
    Configuration(String),

    #[error("experiment `{0}` has already been started")]
    AlreadyStarted(String),

    #[error("worker `{0}` is already registered")]
    DuplicateWorker(String),

    #[error("worker `{0}` is not registered")]
    UnknownWorker(String),

    #[error("worker `{0}` has already received every unit")]
    Exhausted(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("`{0}` is not implemented in this release")]
    Unimplemented(&'static str),
}

impl ExperimentError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::AlreadyStarted(_) => ErrorCode::AlreadyStarted,
            Self::DuplicateWorker(_) => ErrorCode::DuplicateWorker,
            Self::UnknownWorker(_) => ErrorCode::UnknownWorker,
            Self::Exhausted(_) => ErrorCode::Exhausted,
            Self::Storage(_) => ErrorCode::StorageFailed,
            Self::Unimplemented(_) => ErrorCode::Unimplemented,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
