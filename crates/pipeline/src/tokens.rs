/// Characters per token in the approximation
const CHARS_PER_TOKEN: usize = 5;

/// Approximate token counting
///
/// Counts are estimates, not tokenizer-exact. Budget checks stay safe under
/// the approximation because every issued request is bounded by the planned
/// input budget measured with the same estimator.
pub trait TokenEstimator: Send + Sync {
    /// Approximate token count of a string
    fn estimate(&self, text: &str) -> usize;
}

/// Default heuristic estimator
///
/// A unit is a maximal alphanumeric run or a single non-whitespace symbol;
/// each unit costs max(1, chars / 5).
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxEstimator;

impl TokenEstimator for ApproxEstimator {
    fn estimate(&self, text: &str) -> usize {
        units(text).iter().map(|unit| unit_cost(unit)).sum()
    }
}

fn unit_cost(unit: &str) -> usize {
    std::cmp::max(1, unit.chars().count() / CHARS_PER_TOKEN)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split text into estimator units: alphanumeric runs and single symbols
pub(crate) fn units(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut run_start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        if is_word_char(c) {
            if run_start.is_none() {
                run_start = Some(idx);
            }
        } else {
            if let Some(start) = run_start.take() {
                out.push(&text[start..idx]);
            }
            if !c.is_whitespace() {
                out.push(&text[idx..idx + c.len_utf8()]);
            }
        }
    }

    if let Some(start) = run_start {
        out.push(&text[start..]);
    }

    out
}
