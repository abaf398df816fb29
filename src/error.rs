use serde::Serialize;

/// Process-level failure carrying the exit code `main` should return.
///
/// Codes in use: `2` for configuration/usage problems, `4` for I/O, network
/// and rendering failures.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Classification of the recoverable failures inside a channel pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A record's `created_at` could not be parsed. The record is dropped.
    MalformedTimestamp,
    /// A record's `value` is missing or not a finite number. The record is dropped.
    MalformedValue,
    /// Retries were exhausted on a retryable status or transport error.
    TransientFetchFailure,
    /// The feed answered with a status that retrying will not fix.
    NonRetryableFetchFailure,
    /// Anything else that broke one channel's fetch/parse/align/stats run.
    ChannelPipelineFailure,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::MalformedTimestamp => "malformed timestamp",
            ErrorKind::MalformedValue => "malformed value",
            ErrorKind::TransientFetchFailure => "transient fetch failure",
            ErrorKind::NonRetryableFetchFailure => "non-retryable fetch failure",
            ErrorKind::ChannelPipelineFailure => "channel pipeline failure",
        }
    }
}

/// Per-record / per-channel error. Never fatal for the run.
#[derive(Clone, PartialEq, Serialize)]
pub struct DataError {
    kind: ErrorKind,
    message: String,
}

impl DataError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::fmt::Debug for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for DataError {}
