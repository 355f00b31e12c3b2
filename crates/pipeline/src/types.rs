use serde::{Deserialize, Serialize};

/// Default trailing tokens carried into follow-up prompts
pub const DEFAULT_LAST_CHUNK_TOKEN_COUNT: u32 = 50;

/// Default in-flight limit for embedding requests
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Prompt templates driving chat processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSet {
    /// Prompt for the first chunk
    pub initial: String,

    /// Template for later chunks, with a {last_chunk_end} placeholder
    ///
    /// Required whenever the context spans more than one chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_template: Option<String>,
}

impl PromptSet {
    /// Create a prompt set with only an initial prompt
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            initial: initial.into(),
            follow_up_template: None,
        }
    }

    /// Set the follow-up template
    pub fn with_follow_up(mut self, template: impl Into<String>) -> Self {
        self.follow_up_template = Some(template.into());
        self
    }
}

/// Options controlling continuation context and request concurrency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Inject the tail of the previous response into follow-up prompts
    #[serde(default)]
    pub include_last_chunk: bool,

    /// How many trailing tokens to carry over
    #[serde(default = "default_last_chunk_token_count")]
    pub last_chunk_token_count: u32,

    /// Maximum concurrent embedding requests
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_last_chunk_token_count() -> u32 {
    DEFAULT_LAST_CHUNK_TOKEN_COUNT
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            include_last_chunk: false,
            last_chunk_token_count: DEFAULT_LAST_CHUNK_TOKEN_COUNT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Chat completion request (OpenAI-compatible)
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model name
    pub model: String,

    /// Conversation messages
    pub messages: Vec<ChatMessage>,

    /// Tokens reserved for the response
    pub max_tokens: u32,
}

/// One conversation message
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

/// One completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: ResponseMessage,
}

/// Message body of a completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

/// Embedding request
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest {
    /// Model name
    pub model: String,

    /// Text to embed
    pub input: String,
}

/// Embedding response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
}

/// One embedding vector
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_shape() {
        let request = CompletionRequest {
            model: "mock_chat_model".to_string(),
            messages: vec![ChatMessage::user("Mock prompt")],
            max_tokens: 30,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "mock_chat_model");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "Mock prompt");
        assert_eq!(value["max_tokens"], 30);
    }

    #[test]
    fn test_completion_response_parse() {
        let body = r#"{"choices": [{"message": {"content": "Mock response"}}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "Mock response");
    }

    #[test]
    fn test_embedding_response_parse() {
        let body = r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#;
        let response: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_processing_options_defaults() {
        let options = ProcessingOptions::default();
        assert!(!options.include_last_chunk);
        assert_eq!(options.last_chunk_token_count, 50);
        assert_eq!(options.max_in_flight, 4);
    }
}
