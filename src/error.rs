use thiserror::Error;

/// UploadFailureKind
///
/// The reasons a batch upload can fail. Any of these aborts the enclosing post
/// submission; nothing is partially persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailureKind {
    /// The server refused a file for exceeding its size limit (HTTP 413).
    PayloadTooLarge { detail: String },
    /// The server refused a file type or could not decode it as an image.
    UnsupportedType { detail: String },
    /// The server answered with a different number of URLs than files sent.
    CountMismatch { expected: usize, received: usize },
    /// Any other refusal of the upload request.
    Rejected { status: u16, detail: String },
}

impl std::fmt::Display for UploadFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PayloadTooLarge { detail } => write!(f, "file too large: {detail}"),
            Self::UnsupportedType { detail } => write!(f, "unsupported file: {detail}"),
            Self::CountMismatch { expected, received } => write!(
                f,
                "expected {expected} uploaded urls, server returned {received}"
            ),
            Self::Rejected { status, detail } => {
                write!(f, "upload rejected with status {status}: {detail}")
            }
        }
    }
}

/// ClientError
///
/// The single error type surfaced by the client. Raw transport shapes are
/// converted into one of these variants at the gateway boundary, so views only
/// ever match on tagged variants.
///
/// Only `AuthorizationRejection` is handled centrally (the gateway ends the
/// session and redirects); every other variant propagates to the caller for
/// display.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad username/password, or a blocked account. No state change.
    #[error("authentication failed: {detail}")]
    AuthenticationFailure { detail: String },

    /// The presented credential was missing, expired or invalid.
    #[error("session is no longer authorized")]
    AuthorizationRejection,

    /// Adding attachments would exceed the per-post limit. No mutation happened.
    #[error("at most {limit} attachments are allowed, {requested} requested")]
    CapacityExceeded { limit: usize, requested: usize },

    #[error("image upload failed: {0}")]
    UploadFailure(UploadFailureKind),

    /// A required field is missing or malformed. Raised before any network call.
    #[error("{field}: {message}")]
    ValidationFailure { field: &'static str, message: String },

    /// Duplicate username or email on registration.
    #[error("conflict: {detail}")]
    Conflict { detail: String },

    /// The session epoch advanced while this operation was in flight, so its
    /// result was discarded.
    #[error("session changed while the request was in flight")]
    Superseded,

    /// Any other non-success response, passed through unchanged.
    #[error("request failed with status {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("credential storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Convenience constructor for client-side validation errors.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            field,
            message: message.into(),
        }
    }

    /// True when this error was already handled centrally by the gateway.
    pub fn is_authorization_rejection(&self) -> bool {
        matches!(self, Self::AuthorizationRejection)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
