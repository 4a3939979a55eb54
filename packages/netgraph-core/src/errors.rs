//! Error types for netgraph-core
//!
//! Only recoverable conditions surface here. Malformed identities are
//! programming errors and panic at construction instead.

use std::fmt;
use thiserror::Error;

/// Graph error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Argument outside its documented domain (e.g. neighborhood radius 0)
    InvalidArgument,
    /// The publisher thread is gone and cannot run commits
    PublisherStopped,
    /// Configuration errors
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::PublisherStopped => "publisher_stopped",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Graph error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct GraphError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl GraphError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn publisher_stopped(name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::PublisherStopped,
            format!("Publisher '{}' is no longer running", name.into()),
        )
    }
}

impl From<crate::config::ConfigError> for GraphError {
    fn from(err: crate::config::ConfigError) -> Self {
        GraphError::new(ErrorKind::Config, err.to_string()).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_invalid_argument_display() {
        let err = GraphError::invalid_argument("radius must be >= 1");
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(format!("{}", err), "[invalid_argument] radius must be >= 1");
    }

    #[test]
    fn test_publisher_stopped() {
        let err = GraphError::publisher_stopped("netgraph-publisher");
        assert_eq!(err.kind, ErrorKind::PublisherStopped);
        assert!(err.message.contains("netgraph-publisher"));
    }

    #[test]
    fn test_from_config_error_keeps_source() {
        let cfg = crate::config::ConfigError::MissingVersion;
        let err: GraphError = cfg.into();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(ErrorKind::PublisherStopped.as_str(), "publisher_stopped");
        assert_eq!(ErrorKind::Config.as_str(), "config");
    }
}
