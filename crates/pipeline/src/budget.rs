use chunkflow_common::{ChunkflowError, ModelSettings, Result};

/// Fraction of the window reserved for the response when no ratio is configured
pub const DEFAULT_RESPONSE_FRACTION: f64 = 0.1;

/// Below this window size the default chat plan reserves nothing
pub const MIN_TOKENS_FOR_RESERVE: u32 = 20;

/// Per-request token budgets
///
/// `input_budget + response_budget` never exceeds the model window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Tokens available for the prompt and chunk text
    pub input_budget: u32,

    /// Tokens reserved for the model response
    pub response_budget: u32,
}

/// Plan per-request budgets for chat processing
///
/// The input budget is the floor of `max_tokens * (1 - ratio)`; the remainder
/// is reserved for the response. Without a configured ratio a small default
/// fraction is reserved, or nothing at all for very small windows.
pub fn plan_chat(settings: &ModelSettings) -> Result<Budget> {
    settings.validate()?;

    let ratio = match settings.response_ratio {
        Some(ratio) => ratio,
        None if settings.max_tokens < MIN_TOKENS_FOR_RESERVE => {
            return Ok(Budget {
                input_budget: settings.max_tokens,
                response_budget: 0,
            });
        }
        None => DEFAULT_RESPONSE_FRACTION,
    };

    let input_budget = (settings.max_tokens as f64 * (1.0 - ratio)).floor() as u32;
    let response_budget = settings.max_tokens - input_budget;

    if input_budget == 0 {
        return Err(ChunkflowError::invalid_configuration(format!(
            "response_ratio {} leaves no input budget for max_tokens {}",
            ratio, settings.max_tokens
        )));
    }

    Ok(Budget {
        input_budget,
        response_budget,
    })
}

/// Plan per-request budgets for embeddings processing
///
/// Embeddings never reserve response tokens; the whole window is input.
pub fn plan_embeddings(settings: &ModelSettings) -> Result<Budget> {
    settings.validate()?;

    if settings.response_ratio.is_some() {
        return Err(ChunkflowError::invalid_configuration(
            "response_ratio does not apply to embeddings",
        ));
    }

    Ok(Budget {
        input_budget: settings.max_tokens,
        response_budget: 0,
    })
}
