use std::time::Duration;

use async_trait::async_trait;
use chunkflow_common::{ChunkflowError, ConnectionSettings, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::ModelClient;
use crate::types::{
    ChatMessage, CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse,
};

/// Request timeout for model calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Attempts per request for transport-level failures
const MAX_RETRIES: u32 = 3;

/// OpenAI-compatible HTTP model client
///
/// The configured endpoint names the operation (chat completions or
/// embeddings); requests are posted to it as-is. Transport and rate-limit
/// failures are retried with exponential backoff; model rejections are not.
#[derive(Debug, Clone)]
pub struct HttpModelClient {
    connection: ConnectionSettings,
    model_name: String,
    client: Client,
}

impl HttpModelClient {
    /// Create new client
    pub fn new(connection: ConnectionSettings, model_name: impl Into<String>) -> Result<Self> {
        connection.validate()?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                ChunkflowError::transport(format!("Failed to create HTTP client: {}", e))
            })?;

        let model_name = model_name.into();
        info!(
            "Model client initialized: endpoint={}, model={}",
            connection.endpoint, model_name
        );

        Ok(Self {
            connection,
            model_name,
            client,
        })
    }

    async fn post_json<T: Serialize>(&self, payload: &T) -> Result<reqwest::Response> {
        let mut request = self.client.post(&self.connection.endpoint).json(payload);
        if let Some(api_key) = &self.connection.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChunkflowError::transport(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(ChunkflowError::rate_limit(format!(
                "Endpoint {} throttled the request",
                self.connection.endpoint
            )))
        } else {
            Err(ChunkflowError::model(format!(
                "Endpoint returned status {}",
                status
            )))
        }
    }

    /// Single completion attempt
    async fn try_complete(&self, prompt: &str, max_response_tokens: u32) -> Result<String> {
        let request = CompletionRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: max_response_tokens,
        };

        let response = self.post_json(&request).await?;
        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChunkflowError::model(format!("Failed to parse response: {}", e)))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ChunkflowError::model("Response contained no choices"))?;

        if text.is_empty() {
            return Err(ChunkflowError::model("Empty response from model"));
        }

        Ok(text)
    }

    /// Single embedding attempt
    async fn try_embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.model_name.clone(),
            input: text.to_string(),
        };

        let response = self.post_json(&request).await?;
        let result: EmbeddingResponse = response.json().await.map_err(|e| {
            ChunkflowError::model(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| ChunkflowError::model("Response contained no embedding data"))?;

        if embedding.is_empty() {
            return Err(ChunkflowError::model("Empty embedding from model"));
        }

        Ok(embedding)
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, prompt: &str, max_response_tokens: u32) -> Result<String> {
        debug!(
            "Sending completion request - Model: {}, Prompt length: {}, Reserved: {}",
            self.model_name,
            prompt.len(),
            max_response_tokens
        );

        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.try_complete(prompt, max_response_tokens).await {
                Ok(text) => {
                    debug!("Received response - Length: {}", text.len());
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = Duration::from_secs(2u64.pow(attempt - 1));
                    warn!(
                        "Completion request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt, MAX_RETRIES, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ChunkflowError::transport("All completion attempts failed")))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Sending embedding request - Model: {}, Text length: {}",
            self.model_name,
            text.len()
        );

        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.try_embed(text).await {
                Ok(embedding) => {
                    debug!("Received embedding - Dimension: {}", embedding.len());
                    return Ok(embedding);
                }
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = Duration::from_secs(2u64.pow(attempt - 1));
                    warn!(
                        "Embedding request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt, MAX_RETRIES, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ChunkflowError::transport("All embedding attempts failed")))
    }
}
