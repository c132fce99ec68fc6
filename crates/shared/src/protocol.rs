use serde::{Deserialize, Serialize};

/// The only `status` value that enables querying.
pub const STATUS_READY: &str = "ready";

/// 2xx body of `POST /api/upload`. Rendering only needs `message`; the file
/// list and index size ride along for the notification and status line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub total_documents: usize,
}

/// Body of `GET /api/status`. `documents_loaded` holds the filenames the
/// backend currently has indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub documents_loaded: Vec<String>,
    pub message: String,
}

impl StatusResponse {
    pub fn is_ready(&self) -> bool {
        self.status == STATUS_READY
    }
}

/// JSON body of `POST /api/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

/// 2xx body of `POST /api/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

/// One retrieval hit backing an answer. `score` is a distance: lower means
/// more similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub filename: String,
    /// Zero-based fragment index within the source file.
    pub chunk: u32,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f64>,
}

/// 2xx body of `POST /api/reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    #[serde(default)]
    pub status: String,
    pub message: String,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub documents_loaded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_is_derived_from_the_exact_ready_status() {
        let ready = StatusResponse {
            status: "ready".to_string(),
            documents_loaded: vec!["contract.pdf".to_string()],
            message: "1 document(s) loaded".to_string(),
        };
        assert!(ready.is_ready());

        let waiting = StatusResponse {
            status: "waiting_for_documents".to_string(),
            documents_loaded: Vec::new(),
            message: "No documents loaded".to_string(),
        };
        assert!(!waiting.is_ready());
    }

    #[test]
    fn query_response_tolerates_missing_confidence_and_keyword_score() {
        let payload = r#"{
            "answer": "See section 2.",
            "sources": [
                {"filename": "notes.txt", "chunk": 0, "content": "Section 2 says...", "score": 0.41}
            ]
        }"#;

        let response: QueryResponse = serde_json::from_str(payload).expect("decode");
        assert!(response.confidence.is_none());
        assert!(response.sources[0].keyword_score.is_none());
    }
}
