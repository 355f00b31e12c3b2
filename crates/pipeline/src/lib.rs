//! Chunkflow core pipelines
//!
//! Token-budgeted chunking and continuation over remote chat/embedding models

mod budget;
mod chat;
mod chunking;
mod client;
mod continuation;
mod embeddings;
mod http;
mod outcome;
mod tokens;
mod types;

pub use budget::{
    plan_chat, plan_embeddings, Budget, DEFAULT_RESPONSE_FRACTION, MIN_TOKENS_FOR_RESERVE,
};
pub use chat::{ChatPipeline, ChunkState, CHUNK_TEXT_PLACEHOLDER};
pub use chunking::{split_paragraphs, split_sentences, split_text, Chunk};
pub use client::ModelClient;
pub use continuation::{
    build_follow_up, extract_tail, validate_prompts, LAST_CHUNK_END_PLACEHOLDER,
};
pub use embeddings::EmbeddingsPipeline;
pub use http::HttpModelClient;
pub use outcome::{
    ChatOutcome, ChatRecord, EmbeddingRecord, EmbeddingsOutcome, ErrorDetail, Status,
};
pub use tokens::{ApproxEstimator, TokenEstimator};
pub use types::{
    ProcessingOptions, PromptSet, DEFAULT_LAST_CHUNK_TOKEN_COUNT, DEFAULT_MAX_IN_FLIGHT,
};
