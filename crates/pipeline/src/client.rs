use async_trait::async_trait;
use chunkflow_common::Result;

/// Abstract remote model capability
///
/// Pipelines only depend on this trait; the HTTP transport, payload schemas
/// and retry policy live behind it.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Complete a prompt, reserving at most `max_response_tokens` for the reply
    async fn complete(&self, prompt: &str, max_response_tokens: u32) -> Result<String>;

    /// Embed a text into a vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
