//! Error types for model response parsing

use thiserror::Error;

/// Reasons a model response could not be turned into a category map
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No well-formed JSON object anywhere in the response text
    #[error("response contains no JSON object ({length} chars)")]
    NoJsonObject { length: usize },

    /// A JSON object was found but no category held a usable repository name
    #[error("response JSON has no usable categories")]
    NoCategories,
}
