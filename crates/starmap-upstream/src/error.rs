//! Error types for upstream collection

use thiserror::Error;

/// A page fetch that could not be completed. Fatal to the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The subject does not exist upstream
    #[error("GitHub user '{subject}' was not found")]
    NotFound { subject: String },

    /// Primary or secondary rate limit hit
    #[error("GitHub API rate limit exceeded (HTTP {status})")]
    RateLimited {
        status: u16,
        /// Unix timestamp at which the limit resets, when advertised
        reset_at: Option<u64>,
    },

    /// Any other non-success status
    #[error("GitHub returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or timeout failure
    #[error("request to GitHub failed: {0}")]
    Transport(String),

    /// Success status with a body that is not a repository list
    #[error("unexpected response from GitHub: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// HTTP status reported by the upstream, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::InvalidResponse(_) => None,
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::InvalidResponse(_) => false,
            Self::RateLimited { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }
}
