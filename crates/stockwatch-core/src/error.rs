//! Shared error type across stockwatch crates.

use thiserror::Error;

/// Closed set of failure kinds.
///
/// Used both as the `kind` label of the error counter and to pick the HTTP
/// status of a failed request, so the label space stays bounded no matter
/// what the downstream code fails with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Invalid input / malformed request.
    BadRequest,
    /// Requested data does not exist upstream.
    NotFound,
    /// Known route, unsupported method.
    MethodNotAllowed,
    /// Data provider failed.
    Upstream,
    /// Data provider did not answer in time.
    Timeout,
    /// Request future dropped before it completed.
    Cancelled,
    /// Handler panicked.
    Panic,
    /// Internal server error.
    Internal,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::BadRequest,
        ErrorKind::NotFound,
        ErrorKind::MethodNotAllowed,
        ErrorKind::Upstream,
        ErrorKind::Timeout,
        ErrorKind::Cancelled,
        ErrorKind::Panic,
        ErrorKind::Internal,
    ];

    /// Label value used in metrics and JSON error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Panic => "panic",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, StockwatchError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StockwatchError {
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("label arity mismatch for {name}: expected {expected}, got {got}")]
    LabelArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("upstream: {0}")]
    Upstream(String),
    #[error("upstream timed out: {0}")]
    Timeout(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl StockwatchError {
    /// Map an error to its failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StockwatchError::BadRequest(_) | StockwatchError::UnsupportedVersion => {
                ErrorKind::BadRequest
            }
            StockwatchError::NotFound(_) => ErrorKind::NotFound,
            StockwatchError::MethodNotAllowed(_) => ErrorKind::MethodNotAllowed,
            StockwatchError::Upstream(_) => ErrorKind::Upstream,
            StockwatchError::Timeout(_) => ErrorKind::Timeout,
            StockwatchError::DuplicateMetric(_)
            | StockwatchError::UnknownMetric(_)
            | StockwatchError::LabelArityMismatch { .. }
            | StockwatchError::InvalidArgument(_)
            | StockwatchError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_unique() {
        let mut labels: Vec<&str> = ErrorKind::ALL.iter().map(|k| k.as_str()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn metric_errors_are_internal() {
        let err = StockwatchError::LabelArityMismatch {
            name: "x".into(),
            expected: 1,
            got: 2,
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(StockwatchError::Timeout("quote".into()).kind(), ErrorKind::Timeout);
        assert_eq!(StockwatchError::UnsupportedVersion.kind(), ErrorKind::BadRequest);
    }
}
