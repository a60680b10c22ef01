//! Error types for model dispatch

use starmap_core::ParseError;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`ChatBackend`](crate::ChatBackend) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("backend response is not a chat completion: {0}")]
    InvalidResponse(String),

    #[error("backend returned no completion text")]
    EmptyCompletion,
}

/// Why one dispatch of a batch did not produce a category map.
///
/// Every variant is recoverable by the fallback attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unusable model output: {0}")]
    Parse(#[from] ParseError),

    #[error("backend failure: {0}")]
    Transport(#[from] BackendError),

    #[error("no response within {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl DispatchError {
    /// Short label for logs and metric tags
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_messages() {
        let parse = DispatchError::from(ParseError::NoCategories);
        assert_eq!(parse.kind(), "parse");

        let transport = DispatchError::from(BackendError::EmptyCompletion);
        assert_eq!(transport.kind(), "transport");

        let timeout = DispatchError::Timeout(Duration::from_secs(60));
        assert_eq!(timeout.kind(), "timeout");
        assert_eq!(timeout.to_string(), "no response within 60s");
    }
}
