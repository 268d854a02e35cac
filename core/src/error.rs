use http::StatusCode;
use std::fmt;

/// The error type shared by every stevedore crate.
///
/// An error carries a coarse [`ErrorKind`] for programmatic matching, a
/// human readable message, optional context lines appended along the way,
/// and an optional source error preserving the full cause chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<String>,
    status: Option<StatusCode>,
    retryable: Option<bool>,
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// The request cannot be signed: empty secret key, missing credential,
    /// or an unusable signing algorithm.
    #[error("signing failed")]
    SigningInvalid,

    /// Credentials exist but are invalid, malformed, or expired.
    #[error("invalid credentials")]
    CredentialInvalid,

    /// Configuration error: missing fields or invalid values.
    #[error("invalid configuration")]
    ConfigInvalid,

    /// The request itself is malformed for the attempted operation.
    #[error("invalid request")]
    RequestInvalid,

    /// Network or I/O failure while talking to the remote service.
    #[error("transport failure")]
    Transport,

    /// The remote service answered with a non-success status.
    #[error("service error")]
    Service,

    /// An operation kept failing until its retry budget ran out. The last
    /// failure is attached as the source.
    #[error("retry attempts exhausted")]
    RetryExhausted,

    /// A multipart upload session was aborted. The failure that triggered
    /// the abort is attached as the source.
    #[error("upload aborted")]
    UploadAborted,

    /// Everything else: parse failures, unexpected states, broken
    /// invariants in remote responses.
    #[error("unexpected error")]
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            status: None,
            retryable: None,
            source: None,
        }
    }

    /// Attach a source error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Append a context line shown alongside the message.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attach the HTTP status that produced this error.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Override the retryable classification for this error.
    pub fn set_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether retrying the failed operation may succeed.
    ///
    /// Transport failures are retryable; service errors are retryable for
    /// server errors and throttling (5xx, 429). An explicit
    /// [`set_retryable`](Self::set_retryable) always wins.
    pub fn is_retryable(&self) -> bool {
        if let Some(explicit) = self.retryable {
            return explicit;
        }
        match self.kind {
            ErrorKind::Transport => true,
            ErrorKind::Service => self
                .status
                .map(|s| s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS)
                .unwrap_or(false),
            _ => false,
        }
    }
}

// Convenience constructors.
impl Error {
    /// Create a signing error.
    pub fn signing_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SigningInvalid, message)
    }

    /// Create a credential invalid error.
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a config invalid error.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a request invalid error.
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a service error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Service, message)
    }

    /// Create a retry exhausted error.
    pub fn retry_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RetryExhausted, message)
    }

    /// Create an upload aborted error.
    pub fn upload_aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UploadAborted, message)
    }

    /// Create an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " (status {status})")?;
        }
        for context in &self.context {
            write!(f, ", {context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| {
            let source: &(dyn std::error::Error + 'static) = err.as_ref();
            source
        })
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations so `?` works on http builder paths.
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

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::transport(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_defaults() {
        assert!(Error::transport("connection reset").is_retryable());
        assert!(Error::service("slow down")
            .with_status(StatusCode::SERVICE_UNAVAILABLE)
            .is_retryable());
        assert!(Error::service("throttled")
            .with_status(StatusCode::TOO_MANY_REQUESTS)
            .is_retryable());
        assert!(!Error::service("no such key")
            .with_status(StatusCode::NOT_FOUND)
            .is_retryable());
        assert!(!Error::signing_invalid("empty secret").is_retryable());
        assert!(!Error::transport("gave up")
            .set_retryable(false)
            .is_retryable());
    }

    #[test]
    fn test_source_chain_keeps_kinds() {
        let service = Error::service("internal error").with_status(StatusCode::INTERNAL_SERVER_ERROR);
        let exhausted = Error::retry_exhausted("giving up after 3 attempts").with_source(service);
        let aborted = Error::upload_aborted("upload aborted").with_source(exhausted);

        let mut kinds = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&aborted);
        while let Some(err) = current {
            if let Some(err) = err.downcast_ref::<Error>() {
                kinds.push(err.kind());
            }
            current = err.source();
        }
        assert_eq!(
            kinds,
            vec![
                ErrorKind::UploadAborted,
                ErrorKind::RetryExhausted,
                ErrorKind::Service
            ]
        );
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::unexpected("failed to fetch credentials")
            .with_context("endpoint: http://169.254.169.254");
        assert_eq!(
            err.to_string(),
            "failed to fetch credentials, endpoint: http://169.254.169.254"
        );
    }
}
