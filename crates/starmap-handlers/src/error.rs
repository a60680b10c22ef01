use starmap_upstream::UpstreamError;
use thiserror::Error;

/// Errors that reach the caller of a categorization request.
///
/// Batch-level model failures never appear here; they are absorbed by the
/// categorizer's fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StarmapError {
    // 400-level: Client errors
    #[error("invalid GitHub username '{subject}': {reason}")]
    InvalidSubject { subject: String, reason: String },

    #[error("GitHub user '{subject}' was not found")]
    UserNotFound { subject: String },

    // Upstream errors
    #[error("GitHub API rate limit exceeded")]
    RateLimited { reset_at: Option<u64> },

    #[error("failed to fetch starred repositories: {message}")]
    UpstreamFailed { status: Option<u16>, message: String },

    // 500-level: Server errors
    #[error("{message}")]
    InternalError { message: String },
}

impl StarmapError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidSubject { .. } => 400,
            Self::UserNotFound { .. } => 404,
            Self::RateLimited { .. } => 429,
            Self::UpstreamFailed { .. } => 502,
            Self::InternalError { .. } => 500,
        }
    }

    /// Error type string for responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidSubject { .. } => "InvalidSubject",
            Self::UserNotFound { .. } => "UserNotFound",
            Self::RateLimited { .. } => "RateLimited",
            Self::UpstreamFailed { .. } => "UpstreamFailed",
            Self::InternalError { .. } => "InternalError",
        }
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether the same request may succeed if retried later
    pub fn retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::UpstreamFailed { status, .. } => status.map_or(true, |s| s >= 500),
            Self::InvalidSubject { .. } | Self::UserNotFound { .. } => false,
            Self::InternalError { .. } => false,
        }
    }

    /// Optional hint for fixing the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidSubject { .. } => Some(
                "Usernames are up to 39 letters, digits or single hyphens, \
                 and cannot start or end with a hyphen"
                    .into(),
            ),
            Self::RateLimited {
                reset_at: Some(reset),
            } => Some(format!(
                "Retry after the limit resets (unix time {}) or configure GITHUB_TOKEN",
                reset
            )),
            Self::RateLimited { reset_at: None } => {
                Some("Retry later or configure GITHUB_TOKEN for a higher limit".into())
            }
            Self::UpstreamFailed { .. } if self.retryable() => Some("Retry in a few moments".into()),
            _ => None,
        }
    }
}

impl From<UpstreamError> for StarmapError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound { subject } => Self::UserNotFound { subject },
            UpstreamError::RateLimited { reset_at, .. } => Self::RateLimited { reset_at },
            UpstreamError::Status { status, .. } => Self::UpstreamFailed {
                status: Some(status),
                message: err.to_string(),
            },
            UpstreamError::Transport(_) | UpstreamError::InvalidResponse(_) => {
                Self::UpstreamFailed {
                    status: None,
                    message: err.to_string(),
                }
            }
        }
    }
}
