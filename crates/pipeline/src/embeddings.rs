use std::sync::Arc;

use chunkflow_common::{ChunkflowError, ModelSettings, Result};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::budget::{plan_embeddings, Budget};
use crate::chunking::split_text;
use crate::client::ModelClient;
use crate::outcome::{EmbeddingRecord, EmbeddingsOutcome};
use crate::tokens::{ApproxEstimator, TokenEstimator};
use crate::types::ProcessingOptions;

/// Concurrent embeddings pipeline over a list of input texts
///
/// Requests are independent, so messages run concurrently up to
/// `options.max_in_flight`. Results are always returned in input order. A
/// message larger than the budget is split and its sub-chunk vectors are
/// mean-pooled into one vector.
pub struct EmbeddingsPipeline {
    client: Arc<dyn ModelClient>,
    settings: ModelSettings,
    budget: Budget,
    estimator: Arc<dyn TokenEstimator>,
}

impl std::fmt::Debug for EmbeddingsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingsPipeline")
            .field("settings", &self.settings)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl EmbeddingsPipeline {
    /// Create new pipeline; fails fast on invalid settings
    pub fn new(client: Arc<dyn ModelClient>, settings: ModelSettings) -> Result<Self> {
        Self::with_estimator(client, settings, Arc::new(ApproxEstimator))
    }

    /// Create new pipeline with a custom token estimator
    pub fn with_estimator(
        client: Arc<dyn ModelClient>,
        settings: ModelSettings,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Result<Self> {
        let budget = plan_embeddings(&settings)?;
        info!(
            "Embeddings pipeline initialized: model={}, input_budget={}",
            settings.model_name, budget.input_budget
        );

        Ok(Self {
            client,
            settings,
            budget,
            estimator,
        })
    }

    /// Planned per-request budgets
    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Model settings the pipeline was built with
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Embed every message, preserving input order in the output
    pub async fn process(
        &self,
        messages: &[String],
        options: &ProcessingOptions,
    ) -> Result<EmbeddingsOutcome> {
        self.process_with_cancellation(messages, options, CancellationToken::new())
            .await
    }

    /// Embed every message; stops issuing requests once `cancel` fires
    pub async fn process_with_cancellation(
        &self,
        messages: &[String],
        options: &ProcessingOptions,
        cancel: CancellationToken,
    ) -> Result<EmbeddingsOutcome> {
        let max_in_flight = options.max_in_flight.max(1);
        info!(
            "Embedding {} messages (max {} in flight)",
            messages.len(),
            max_in_flight
        );

        let mut records: Vec<EmbeddingRecord> =
            stream::iter(messages.iter().enumerate().map(|(index, message)| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return EmbeddingRecord::failed(
                            index,
                            message.clone(),
                            &ChunkflowError::cancelled(
                                "Processing cancelled before this message was issued",
                            ),
                        );
                    }

                    let result = tokio::select! {
                        _ = cancel.cancelled() => Err(ChunkflowError::cancelled(
                            "Processing cancelled while awaiting the model",
                        )),
                        res = self.embed_message(message) => res,
                    };

                    match result {
                        Ok(embedding) => EmbeddingRecord::completed(index, message.clone(), embedding),
                        Err(e) => {
                            warn!("Message {} failed: {}", index, e);
                            EmbeddingRecord::failed(index, message.clone(), &e)
                        }
                    }
                }
            }))
            .buffer_unordered(max_in_flight)
            .collect()
            .await;

        // Completion order is arbitrary; the contract is input order
        records.sort_by_key(|record| record.index);

        Ok(EmbeddingsOutcome::from_records(records))
    }

    /// Embed one message, splitting and mean-pooling when it exceeds the budget
    async fn embed_message(&self, message: &str) -> Result<Vec<f32>> {
        if self.estimator.estimate(message) <= self.budget.input_budget as usize {
            return self.client.embed(message).await;
        }

        debug!(
            "Message exceeds embedding budget of {} tokens, splitting",
            self.budget.input_budget
        );
        let chunks = split_text(message, self.budget.input_budget, self.estimator.as_ref())?;

        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            vectors.push(self.client.embed(&chunk.text).await?);
        }

        mean_pool(&vectors)
    }
}

/// Element-wise mean of sub-chunk vectors
fn mean_pool(vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
    let first = vectors
        .first()
        .ok_or_else(|| ChunkflowError::model("No vectors to pool"))?;
    let dim = first.len();

    let mut pooled = vec![0.0f32; dim];
    for vector in vectors {
        if vector.len() != dim {
            return Err(ChunkflowError::model(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                dim,
                vector.len()
            )));
        }
        for (acc, value) in pooled.iter_mut().zip(vector) {
            *acc += value;
        }
    }

    let count = vectors.len() as f32;
    for value in pooled.iter_mut() {
        *value /= count;
    }

    Ok(pooled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Status;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Client mapping known texts to vectors, with optional per-text delay
    struct DelayedClient;

    #[async_trait]
    impl ModelClient for DelayedClient {
        async fn complete(&self, _prompt: &str, _max_response_tokens: u32) -> Result<String> {
            Err(ChunkflowError::model("complete not scripted"))
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // "a" finishes last, "c" first
            let (delay_ms, value) = match text {
                "a" => (30, 1.0),
                "b" => (15, 2.0),
                "c" => (0, 3.0),
                other => return Err(ChunkflowError::model(format!("unexpected text: {}", other))),
            };
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(vec![value, value])
        }
    }

    /// Client whose vectors count the calls made so far
    struct CountingClient {
        calls: AtomicUsize,
    }

    impl CountingClient {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for CountingClient {
        async fn complete(&self, _prompt: &str, _max_response_tokens: u32) -> Result<String> {
            Err(ChunkflowError::model("complete not scripted"))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(vec![call as f32])
        }
    }

    fn embedding_settings() -> ModelSettings {
        ModelSettings::new("mock_embeddings_model", 200)
    }

    #[tokio::test]
    async fn test_order_preserved_under_out_of_order_completion() {
        let client = Arc::new(DelayedClient);
        let pipeline = EmbeddingsPipeline::new(client, embedding_settings()).unwrap();

        let messages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcome = pipeline
            .process(&messages, &ProcessingOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, Status::Success);
        let indices: Vec<usize> = outcome.embeddings.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(outcome.embeddings[0].message, "a");
        assert_eq!(
            outcome.embeddings[0].embedding.as_deref(),
            Some(&[1.0, 1.0][..])
        );
        assert_eq!(
            outcome.embeddings[2].embedding.as_deref(),
            Some(&[3.0, 3.0][..])
        );
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_items() {
        let client = Arc::new(DelayedClient);
        let pipeline = EmbeddingsPipeline::new(client, embedding_settings()).unwrap();

        let messages = vec!["a".to_string(), "unknown".to_string(), "c".to_string()];
        let outcome = pipeline
            .process(&messages, &ProcessingOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, Status::Error);
        assert_eq!(outcome.embeddings.len(), 3);
        assert!(outcome.embeddings[0].error.is_none());
        assert_eq!(outcome.embeddings[1].error.as_ref().unwrap().kind, "model");
        assert!(outcome.embeddings[1].embedding.is_none());
        assert!(outcome.embeddings[2].error.is_none());
    }

    #[tokio::test]
    async fn test_oversized_message_is_pooled() {
        let client = Arc::new(CountingClient::new());
        // Tiny budget so the message splits
        let settings = ModelSettings::new("mock_embeddings_model", 3);
        let pipeline = EmbeddingsPipeline::new(client, settings).unwrap();

        let message = "one two three four five six seven eight".to_string();
        let estimator = ApproxEstimator;
        let expected_chunks = split_text(&message, 3, &estimator).unwrap().len();
        assert!(expected_chunks > 1);

        let outcome = pipeline
            .process(
                std::slice::from_ref(&message),
                &ProcessingOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, Status::Success);
        let embedding = outcome.embeddings[0].embedding.as_ref().unwrap();
        // Vectors were [1.0], [2.0], ..., [n]; the pooled value is their mean
        let n = expected_chunks as f32;
        let expected_mean = (n * (n + 1.0) / 2.0) / n;
        assert_eq!(embedding, &vec![expected_mean]);
    }

    #[tokio::test]
    async fn test_cancellation_marks_unissued_messages() {
        let client = Arc::new(DelayedClient);
        let pipeline = EmbeddingsPipeline::new(client, embedding_settings()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let messages = vec!["a".to_string(), "b".to_string()];
        let outcome = pipeline
            .process_with_cancellation(&messages, &ProcessingOptions::default(), cancel)
            .await
            .unwrap();

        assert_eq!(outcome.status, Status::Error);
        assert_eq!(outcome.embeddings.len(), 2);
        for record in &outcome.embeddings {
            assert_eq!(record.error.as_ref().unwrap().kind, "cancelled");
        }
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_success() {
        let client = Arc::new(DelayedClient);
        let pipeline = EmbeddingsPipeline::new(client, embedding_settings()).unwrap();

        let outcome = pipeline
            .process(&[], &ProcessingOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, Status::Success);
        assert!(outcome.embeddings.is_empty());
    }

    #[test]
    fn test_ratio_rejected_at_construction() {
        let client = Arc::new(DelayedClient);
        let settings = ModelSettings::new("mock_embeddings_model", 200).with_response_ratio(0.3);
        let err = EmbeddingsPipeline::new(client, settings).unwrap_err();
        assert_eq!(err.kind(), "invalid_configuration");
    }

    #[test]
    fn test_mean_pool() {
        let pooled = mean_pool(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_dimension_mismatch() {
        let err = mean_pool(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(err.kind(), "model");
    }
}
