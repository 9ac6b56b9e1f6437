use std::fmt;
use thiserror::Error;

/// The error type for loadsign operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The script carries no configuration section for the plugin
    MissingPluginConfig,

    /// The plugin section has no `serviceName`
    MissingServiceName,

    /// `serviceName` is present but is not a string
    InvalidServiceNameType,

    /// Configuration error (other invalid fields or values)
    ConfigInvalid,

    /// The ambient credential resolver failed
    CredentialFetch,

    /// Credentials exist but are invalid/malformed
    CredentialInvalid,

    /// Request cannot be signed (missing url, malformed url, bad headers, etc.)
    RequestInvalid,

    /// A request arrived before credentials resolved while another one was already held
    PendingSlotOccupied,

    /// Unexpected errors (serialization, I/O, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without the source chain
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a configuration error.
    ///
    /// Configuration errors are fatal: they abort plugin construction.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::MissingPluginConfig
                | ErrorKind::MissingServiceName
                | ErrorKind::InvalidServiceNameType
                | ErrorKind::ConfigInvalid
        )
    }

    /// Check if this is a credential error
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CredentialFetch | ErrorKind::CredentialInvalid
        )
    }
}

// Convenience constructors
impl Error {
    /// Create a missing plugin config error
    pub fn missing_plugin_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingPluginConfig, message)
    }

    /// Create a missing service name error
    pub fn missing_service_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingServiceName, message)
    }

    /// Create an invalid service name type error
    pub fn invalid_service_name_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidServiceNameType, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a credential fetch error
    pub fn credential_fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialFetch, message)
    }

    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a pending slot occupied error
    pub fn pending_slot_occupied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PendingSlotOccupied, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingPluginConfig => write!(f, "missing plugin configuration"),
            ErrorKind::MissingServiceName => write!(f, "missing service name"),
            ErrorKind::InvalidServiceNameType => write!(f, "invalid service name type"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::CredentialFetch => write!(f, "credential fetch failed"),
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::PendingSlotOccupied => write!(f, "pending slot occupied"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::method::InvalidMethod> for Error {
    fn from(err: http::method::InvalidMethod) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_kinds() {
        for err in [
            Error::missing_plugin_config("a"),
            Error::missing_service_name("b"),
            Error::invalid_service_name_type("c"),
            Error::config_invalid("d"),
        ] {
            assert!(err.is_config_error(), "{:?} must be a config error", err.kind());
            assert!(!err.is_credential_error());
        }

        assert!(!Error::credential_fetch("e").is_config_error());
        assert!(Error::credential_fetch("e").is_credential_error());
        assert!(!Error::request_invalid("f").is_config_error());
    }

    #[test]
    fn test_from_http_error_is_request_invalid() {
        let err: Error = "http://exa mple.com"
            .parse::<http::Uri>()
            .expect_err("uri must be invalid")
            .into();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_display_uses_message() {
        let err = Error::credential_fetch("no route to host")
            .with_source(anyhow::anyhow!("connect timeout"));
        assert_eq!(err.to_string(), "no route to host");
        assert_eq!(err.message(), "no route to host");
        assert!(std::error::Error::source(&err).is_some());
    }
}
