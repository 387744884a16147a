use thiserror::Error;

/// Failure kinds surfaced by property resolution and token acquisition.
///
/// A missing property is not an error: handlers answer `Ok(None)` and the
/// typed accessors fall back to the caller's default.
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("type coercion failed for '{key}': {reason}")]
    TypeCoercion { key: String, reason: String },

    #[error("authorization failed: {message}")]
    Authorization { message: String, transient: bool },

    #[error("remote resolution failed: {message}")]
    RemoteResolution { message: String, transient: bool },

    #[error("label mismatch for '{key}': {detail}")]
    Label { key: String, detail: String },

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("lifecycle violation: {0}")]
    Lifecycle(String),
}

impl PropertyError {
    pub fn type_coercion<K: Into<String>, S: Into<String>>(key: K, reason: S) -> Self {
        Self::TypeCoercion { key: key.into(), reason: reason.into() }
    }

    pub fn authorization<S: Into<String>>(msg: S) -> Self {
        Self::Authorization { message: msg.into(), transient: false }
    }

    pub fn remote<S: Into<String>>(msg: S) -> Self {
        Self::RemoteResolution { message: msg.into(), transient: false }
    }

    pub fn label<K: Into<String>, S: Into<String>>(key: K, detail: S) -> Self {
        Self::Label { key: key.into(), detail: detail.into() }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn lifecycle<S: Into<String>>(msg: S) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Failures worth retrying: the transport gave up or the backend was
    /// temporarily unable to answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Authorization { transient: true, .. } | Self::RemoteResolution { transient: true, .. }
        )
    }
}

/// Result type alias for property and token operations
pub type Result<T> = std::result::Result<T, PropertyError>;

/// Which side of the chain a network failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backend {
    /// identity provider: failures become `Authorization`
    Identity,
    /// configuration store or vault: failures become `RemoteResolution`
    Remote,
}

impl Backend {
    fn error(self, message: String, transient: bool) -> PropertyError {
        match self {
            Backend::Identity => PropertyError::Authorization { message, transient },
            Backend::Remote => PropertyError::RemoteResolution { message, transient },
        }
    }
}

/// Classify a transport failure; timeouts and connection errors are retryable.
pub(crate) fn from_transport(err: reqwest::Error, name: &str, backend: Backend) -> PropertyError {
    let transient = err.is_timeout() || err.is_connect() || err.is_request();
    backend.error(format!("{} request failed: {}", name, err), transient)
}

/// Map an unexpected HTTP status; 5xx and 429 are retryable.
pub(crate) fn from_status(status: http::StatusCode, name: &str, backend: Backend) -> PropertyError {
    let transient = status.is_server_error() || status == http::StatusCode::TOO_MANY_REQUESTS;
    backend.error(format!("{} responded with {}", name, status), transient)
}
