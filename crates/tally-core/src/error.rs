//! Shared error type across tally crates.

use thiserror::Error;

use crate::metric::MetricKind;

/// Stable error codes (mirrored by the C ABI status values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Metric name is empty or otherwise unusable.
    InvalidName,
    /// Metric name already registered for this kind.
    DuplicateName,
    /// Config declares an unknown schema version.
    UnsupportedVersion,
    /// Config could not be read or parsed.
    BadConfig,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::DuplicateName => "DUPLICATE_NAME",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Unified error type used by core and the C ABI.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("metric name must not be empty")]
    EmptyName,
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: MetricKind, name: String },
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl TelemetryError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            TelemetryError::EmptyName => ErrorCode::InvalidName,
            TelemetryError::DuplicateName { .. } => ErrorCode::DuplicateName,
            TelemetryError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            TelemetryError::BadConfig(_) => ErrorCode::BadConfig,
            TelemetryError::Internal(_) => ErrorCode::Internal,
        }
    }
}
