use chunkflow_common::{ChunkflowError, Result};
use tracing::{debug, info};

use crate::tokens::TokenEstimator;

/// A bounded piece of the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the original text, starting at 0
    pub index: usize,

    /// Chunk text
    pub text: String,

    /// Whether this is the final chunk
    pub is_last: bool,
}

/// Split text into chunks within a token budget
///
/// Walks natural boundaries from coarse to fine: paragraphs, then sentences,
/// then whitespace-delimited words. Units are accumulated greedily while the
/// estimate of the growing chunk stays within the budget. A single word
/// larger than the whole budget is split at character boundaries so the
/// budget holds and progress is always made.
///
/// Same input, budget and estimator always produce the same chunk sequence.
pub fn split_text(
    text: &str,
    token_budget: u32,
    estimator: &dyn TokenEstimator,
) -> Result<Vec<Chunk>> {
    if token_budget == 0 {
        return Err(ChunkflowError::chunking(
            "Token budget must be greater than 0",
        ));
    }

    let budget = token_budget as usize;
    let mut acc = Accumulator::new(budget, estimator);

    for paragraph in split_paragraphs(text) {
        if estimator.estimate(paragraph) <= budget {
            acc.push(paragraph, "\n\n");
            continue;
        }

        for sentence in split_sentences(paragraph) {
            if estimator.estimate(sentence) <= budget {
                acc.push(sentence, " ");
                continue;
            }

            for word in sentence.split_whitespace() {
                if estimator.estimate(word) <= budget {
                    acc.push(word, " ");
                } else {
                    for piece in split_word(word, budget, estimator) {
                        acc.push(piece, " ");
                    }
                }
            }
        }
    }

    let texts = acc.finish();
    log_chunk_details(&texts, estimator);

    let count = texts.len();
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            index,
            text,
            is_last: index + 1 == count,
        })
        .collect())
}

/// Greedy chunk accumulator
struct Accumulator<'a> {
    budget: usize,
    estimator: &'a dyn TokenEstimator,
    chunks: Vec<String>,
    current: String,
}

impl<'a> Accumulator<'a> {
    fn new(budget: usize, estimator: &'a dyn TokenEstimator) -> Self {
        Self {
            budget,
            estimator,
            chunks: Vec::new(),
            current: String::new(),
        }
    }

    /// Append a unit to the current chunk, or close it and start a new one
    fn push(&mut self, unit: &str, separator: &str) {
        if self.current.is_empty() {
            self.current.push_str(unit);
            return;
        }

        let mut candidate =
            String::with_capacity(self.current.len() + separator.len() + unit.len());
        candidate.push_str(&self.current);
        candidate.push_str(separator);
        candidate.push_str(unit);

        if self.estimator.estimate(&candidate) <= self.budget {
            self.current = candidate;
        } else {
            self.chunks
                .push(std::mem::replace(&mut self.current, unit.to_string()));
        }
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() {
            self.chunks.push(self.current);
        }
        self.chunks
    }
}

/// Split text by paragraphs
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a paragraph into sentences, keeping terminators
///
/// A `.`, `!` or `?` followed by whitespace (or end of text) ends a
/// sentence, as does a line break.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        let end = idx + c.len_utf8();
        let boundary = match c {
            '\n' => true,
            '.' | '!' | '?' => iter.peek().map_or(true, |&(_, next)| next.is_whitespace()),
            _ => false,
        };

        if boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }

    out
}

/// Split a single oversized word at character boundaries
///
/// Each piece is the longest prefix whose estimate fits the budget. The
/// fallback of one character per piece guarantees progress even under a
/// degenerate estimator.
fn split_word<'w>(word: &'w str, budget: usize, estimator: &dyn TokenEstimator) -> Vec<&'w str> {
    let mut pieces = Vec::new();
    let mut rest = word;

    while !rest.is_empty() {
        let mut fit = 0;
        for (idx, c) in rest.char_indices() {
            let end = idx + c.len_utf8();
            if estimator.estimate(&rest[..end]) <= budget {
                fit = end;
            } else {
                break;
            }
        }

        if fit == 0 {
            fit = rest
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(rest.len());
        }

        pieces.push(&rest[..fit]);
        rest = &rest[fit..];
    }

    pieces
}

fn log_chunk_details(chunks: &[String], estimator: &dyn TokenEstimator) {
    let total_tokens: usize = chunks.iter().map(|c| estimator.estimate(c)).sum();
    info!(
        "Context split into {} chunks with a total of {} tokens",
        chunks.len(),
        total_tokens
    );
    for (i, chunk) in chunks.iter().take(5).enumerate() {
        debug!(
            chunk_index = i + 1,
            token_count = estimator.estimate(chunk),
            "chunk"
        );
    }
    if chunks.len() > 5 {
        debug!("... {} more chunks omitted", chunks.len() - 5);
    }
}
