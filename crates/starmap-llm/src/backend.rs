use crate::error::BackendError;
use async_trait::async_trait;

/// A named text-generation endpoint: prompt in, raw completion text out.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Label used in logs and metrics, e.g. `primary`
    fn name(&self) -> &str;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}
