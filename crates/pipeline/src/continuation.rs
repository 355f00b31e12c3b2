use chunkflow_common::{ChunkflowError, Result};

use crate::tokens::TokenEstimator;
use crate::types::{ProcessingOptions, PromptSet};

/// Placeholder substituted with the tail of the previous response
pub const LAST_CHUNK_END_PLACEHOLDER: &str = "{last_chunk_end}";

/// Validate prompt templates before any chunking or remote call
///
/// A follow-up template without the placeholder would silently drop the
/// carried context, so it is rejected up front when continuation is enabled.
pub fn validate_prompts(prompts: &PromptSet, options: &ProcessingOptions) -> Result<()> {
    if options.include_last_chunk {
        if let Some(template) = &prompts.follow_up_template {
            if !template.contains(LAST_CHUNK_END_PLACEHOLDER) {
                return Err(ChunkflowError::invalid_configuration(format!(
                    "follow_up_template must contain the {} placeholder when include_last_chunk is enabled",
                    LAST_CHUNK_END_PLACEHOLDER
                )));
            }
        }
    }

    Ok(())
}

/// Build the follow-up prompt for a chunk after the first
///
/// Substitutes the tail of the previous response into the template, or the
/// empty string when continuation context is disabled or unavailable.
pub fn build_follow_up(
    template: &str,
    previous_response: &str,
    options: &ProcessingOptions,
    estimator: &dyn TokenEstimator,
) -> String {
    let tail = if options.include_last_chunk {
        extract_tail(previous_response, options.last_chunk_token_count, estimator)
    } else {
        String::new()
    };

    template.replace(LAST_CHUNK_END_PLACEHOLDER, &tail)
}

/// Trailing tokens of a response, walked word by word from the end
pub fn extract_tail(text: &str, token_count: u32, estimator: &dyn TokenEstimator) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut total = 0usize;

    for word in text.split_whitespace().rev() {
        let cost = estimator.estimate(word);
        if total + cost > token_count as usize {
            break;
        }
        kept.push(word);
        total += cost;
    }

    kept.reverse();
    kept.join(" ")
}
