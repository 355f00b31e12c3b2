use std::sync::Arc;

use chunkflow_common::{ChunkflowError, ModelSettings, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::budget::{plan_chat, Budget};
use crate::chunking::split_text;
use crate::client::ModelClient;
use crate::continuation::{build_follow_up, validate_prompts};
use crate::outcome::{ChatOutcome, ChatRecord};
use crate::tokens::{ApproxEstimator, TokenEstimator};
use crate::types::{ProcessingOptions, PromptSet};

/// Placeholder substituted with the chunk text when present in a prompt
pub const CHUNK_TEXT_PLACEHOLDER: &str = "{chunk_text}";

/// Per-chunk processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    BuildingPrompt,
    AwaitingModel,
    Complete,
    Failed,
    Cancelled,
}

impl ChunkState {
    /// Whether the chunk can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }
}

/// Sequential chat pipeline over token-budgeted chunks
///
/// Remote calls are issued strictly in order: the follow-up prompt for chunk
/// i+1 depends on chunk i's response. Settings are immutable after
/// construction, so one pipeline may serve concurrent `process` calls.
pub struct ChatPipeline {
    client: Arc<dyn ModelClient>,
    settings: ModelSettings,
    budget: Budget,
    estimator: Arc<dyn TokenEstimator>,
}

impl std::fmt::Debug for ChatPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatPipeline")
            .field("settings", &self.settings)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl ChatPipeline {
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
        let budget = plan_chat(&settings)?;
        info!(
            "Chat pipeline initialized: model={}, input_budget={}, response_budget={}",
            settings.model_name, budget.input_budget, budget.response_budget
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

    /// Process a context into an ordered list of per-chunk results
    ///
    /// Configuration problems surface as `Err` before any remote call;
    /// per-chunk remote failures are recorded in the outcome instead.
    pub async fn process(
        &self,
        context: &str,
        prompts: &PromptSet,
        options: &ProcessingOptions,
    ) -> Result<ChatOutcome> {
        self.process_with_cancellation(context, prompts, options, CancellationToken::new())
            .await
    }

    /// Process a context; stops issuing requests once `cancel` fires
    ///
    /// Chunks that were not issued before cancellation are recorded with a
    /// `cancelled` error so indices stay contiguous.
    pub async fn process_with_cancellation(
        &self,
        context: &str,
        prompts: &PromptSet,
        options: &ProcessingOptions,
        cancel: CancellationToken,
    ) -> Result<ChatOutcome> {
        validate_prompts(prompts, options)?;

        let chunks = split_text(context, self.budget.input_budget, self.estimator.as_ref())?;
        if chunks.len() > 1 && prompts.follow_up_template.is_none() {
            return Err(ChunkflowError::invalid_configuration(
                "follow_up_template is required when the context spans multiple chunks",
            ));
        }

        let total = chunks.len();
        let mut states = vec![ChunkState::Pending; total];
        let mut records = Vec::with_capacity(total);
        let mut previous_response: Option<String> = None;

        for chunk in chunks {
            let i = chunk.index;

            if cancel.is_cancelled() {
                states[i] = ChunkState::Cancelled;
                records.push(ChatRecord::failed(
                    i + 1,
                    chunk.text,
                    &ChunkflowError::cancelled("Processing cancelled before this chunk was issued"),
                ));
                continue;
            }

            info!("Processing chunk {}/{}", i + 1, total);
            states[i] = ChunkState::BuildingPrompt;

            let prompt_text = match (i, prompts.follow_up_template.as_deref()) {
                (0, _) => prompts.initial.clone(),
                (_, Some(template)) => build_follow_up(
                    template,
                    previous_response.as_deref().unwrap_or(""),
                    options,
                    self.estimator.as_ref(),
                ),
                (_, None) => {
                    return Err(ChunkflowError::invalid_configuration(
                        "follow_up_template is required when the context spans multiple chunks",
                    ))
                }
            };
            let prompt = compose_prompt(&prompt_text, &chunk.text);

            debug!(
                "Token details for chunk {}: prompt_tokens={}, reserved_tokens={}",
                i + 1,
                self.estimator.estimate(&prompt),
                self.budget.response_budget
            );
            debug!("Prompt preview: {}", truncate_for_log(&prompt, 50));

            states[i] = ChunkState::AwaitingModel;
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(ChunkflowError::cancelled(
                    "Processing cancelled while awaiting the model",
                )),
                res = self.client.complete(&prompt, self.budget.response_budget) => res,
            };

            match result {
                Ok(response_text) => {
                    states[i] = ChunkState::Complete;
                    debug!(
                        "Response preview: {}",
                        truncate_for_log(&response_text, 50)
                    );
                    previous_response = Some(response_text.clone());
                    records.push(ChatRecord::completed(i + 1, chunk.text, response_text));
                }
                Err(e) => {
                    states[i] = if matches!(e, ChunkflowError::Cancelled(_)) {
                        ChunkState::Cancelled
                    } else {
                        ChunkState::Failed
                    };
                    warn!("Chunk {}/{} failed: {}", i + 1, total, e);
                    previous_response = None;
                    records.push(ChatRecord::failed(i + 1, chunk.text, &e));
                }
            }
        }

        debug_assert!(states.iter().all(ChunkState::is_terminal));

        Ok(ChatOutcome::from_records(records))
    }
}

/// Combine a prompt with a chunk's text
///
/// The chunk is substituted at `{chunk_text}` when the prompt contains the
/// placeholder; otherwise the prompt prefixes the chunk, blank-line joined.
fn compose_prompt(prompt: &str, chunk_text: &str) -> String {
    if prompt.contains(CHUNK_TEXT_PLACEHOLDER) {
        prompt.replace(CHUNK_TEXT_PLACEHOLDER, chunk_text)
    } else {
        format!("{}\n\n{}", prompt, chunk_text)
    }
}

/// Format text with truncation information
fn truncate_for_log(text: &str, max_length: usize) -> String {
    let length = text.chars().count();
    if length > max_length {
        let truncated: String = text.chars().take(max_length).collect();
        format!("{}...(+{} chars)", truncated, length - max_length)
    } else {
        text.to_string()
    }
}
