use chunkflow_common::ChunkflowError;
use serde::{Deserialize, Serialize};

/// Aggregate processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Per-item error descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error kind name
    pub kind: String,

    /// Human-readable message
    pub message: String,
}

impl From<&ChunkflowError> for ErrorDetail {
    fn from(err: &ChunkflowError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of one chat chunk
///
/// Exactly one of `response_text` / `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    /// 1-based chunk position
    pub index: usize,

    /// Original chunk text
    pub input_text: String,

    /// Model response, present when the chunk completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,

    /// Failure detail, present when the chunk failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl ChatRecord {
    /// Record a completed chunk
    pub fn completed(index: usize, input_text: String, response_text: String) -> Self {
        Self {
            index,
            input_text,
            response_text: Some(response_text),
            error: None,
        }
    }

    /// Record a failed chunk
    pub fn failed(index: usize, input_text: String, err: &ChunkflowError) -> Self {
        Self {
            index,
            input_text,
            response_text: None,
            error: Some(ErrorDetail::from(err)),
        }
    }
}

/// Result of one embedding input
///
/// Exactly one of `embedding` / `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// 0-based input position
    pub index: usize,

    /// Original message text
    pub message: String,

    /// Embedding vector, present when the message was embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Failure detail, present when the message failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl EmbeddingRecord {
    /// Record an embedded message
    pub fn completed(index: usize, message: String, embedding: Vec<f32>) -> Self {
        Self {
            index,
            message,
            embedding: Some(embedding),
            error: None,
        }
    }

    /// Record a failed message
    pub fn failed(index: usize, message: String, err: &ChunkflowError) -> Self {
        Self {
            index,
            message,
            embedding: None,
            error: Some(ErrorDetail::from(err)),
        }
    }
}

/// Outcome of a chat processing run
///
/// The serialized field names and order are the stable caller contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    /// "success" when every chunk completed
    pub status: Status,

    /// Per-chunk results in original order
    pub chunks: Vec<ChatRecord>,
}

impl ChatOutcome {
    /// Build an outcome, deriving the status from the records
    pub fn from_records(chunks: Vec<ChatRecord>) -> Self {
        let status = if chunks.iter().all(|r| r.error.is_none()) {
            Status::Success
        } else {
            Status::Error
        };
        Self { status, chunks }
    }
}

/// Outcome of an embeddings processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsOutcome {
    /// "success" when every message was embedded
    pub status: Status,

    /// Per-message results in input order
    pub embeddings: Vec<EmbeddingRecord>,
}

impl EmbeddingsOutcome {
    /// Build an outcome, deriving the status from the records
    pub fn from_records(embeddings: Vec<EmbeddingRecord>) -> Self {
        let status = if embeddings.iter().all(|r| r.error.is_none()) {
            Status::Success
        } else {
            Status::Error
        };
        Self { status, embeddings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Success).unwrap(), "\"success\"");
        assert_eq!(serde_json::to_string(&Status::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn test_chat_record_omits_absent_fields() {
        let record = ChatRecord::completed(1, "input".to_string(), "response".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["index"], 1);
        assert_eq!(value["input_text"], "input");
        assert_eq!(value["response_text"], "response");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failed_record_carries_error_detail() {
        let err = ChunkflowError::rate_limit("throttled");
        let record = ChatRecord::failed(3, "input".to_string(), &err);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("response_text").is_none());
        assert_eq!(value["error"]["kind"], "rate_limit");
    }

    #[test]
    fn test_chat_outcome_status_derived() {
        let ok = ChatRecord::completed(1, "a".to_string(), "r".to_string());
        let outcome = ChatOutcome::from_records(vec![ok.clone()]);
        assert_eq!(outcome.status, Status::Success);

        let failed = ChatRecord::failed(2, "b".to_string(), &ChunkflowError::model("rejected"));
        let outcome = ChatOutcome::from_records(vec![ok, failed]);
        assert_eq!(outcome.status, Status::Error);
    }

    #[test]
    fn test_outcome_field_names() {
        let outcome = EmbeddingsOutcome::from_records(vec![EmbeddingRecord::completed(
            0,
            "message".to_string(),
            vec![0.1, 0.2],
        )]);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.starts_with("{\"status\":\"success\",\"embeddings\":"));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["embeddings"][0]["index"], 0);
        assert_eq!(value["embeddings"][0]["message"], "message");
    }
}
