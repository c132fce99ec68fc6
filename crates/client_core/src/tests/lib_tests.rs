use super::*;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::protocol::SourceRef;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq)]
struct ReceivedPart {
    field: String,
    filename: String,
    content_type: Option<String>,
    len: usize,
}

#[derive(Clone, Default)]
struct MockBackendState {
    received_parts: Arc<Mutex<Vec<ReceivedPart>>>,
    ready: Arc<Mutex<bool>>,
    documents: Arc<Mutex<Vec<String>>>,
    reject_upload: Arc<Mutex<Option<String>>>,
    reject_query: Arc<Mutex<Option<String>>>,
    reset_calls: Arc<Mutex<u32>>,
}

async fn handle_upload(
    State(state): State<MockBackendState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<ApiErrorBody>)> {
    if let Some(detail) = state.reject_upload.lock().await.clone() {
        return Err((StatusCode::BAD_REQUEST, Json(ApiErrorBody { detail })));
    }

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let part = ReceivedPart {
            field: field.name().unwrap_or_default().to_string(),
            filename: field.file_name().unwrap_or_default().to_string(),
            content_type: field.content_type().map(|value| value.to_string()),
            len: field.bytes().await.expect("field bytes").len(),
        };
        files.push(part.filename.clone());
        state.received_parts.lock().await.push(part);
    }

    let mut documents = state.documents.lock().await;
    documents.extend(files.iter().cloned());
    *state.ready.lock().await = true;

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        message: format!("Loaded {} document(s)", files.len()),
        files,
        total_documents: documents.len(),
    }))
}

async fn handle_status(State(state): State<MockBackendState>) -> Json<StatusResponse> {
    let ready = *state.ready.lock().await;
    let documents = state.documents.lock().await.clone();
    Json(StatusResponse {
        status: if ready { "ready" } else { "waiting_for_documents" }.to_string(),
        message: if ready {
            format!("{} document(s) loaded", documents.len())
        } else {
            "No documents loaded".to_string()
        },
        documents_loaded: documents,
    })
}

async fn handle_query(
    State(state): State<MockBackendState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ApiErrorBody>)> {
    if let Some(detail) = state.reject_query.lock().await.clone() {
        return Err((StatusCode::BAD_REQUEST, Json(ApiErrorBody { detail })));
    }

    Ok(Json(QueryResponse {
        answer: format!("**Answer**\n\nAbout: {}", request.question),
        sources: vec![SourceRef {
            filename: "contract.pdf".to_string(),
            chunk: 2,
            content: "The term is twelve months.".to_string(),
            score: 0.12,
            keyword_score: Some(3.7),
        }],
        confidence: Some("High".to_string()),
    }))
}

async fn handle_reset(State(state): State<MockBackendState>) -> Json<ResetResponse> {
    *state.reset_calls.lock().await += 1;
    *state.ready.lock().await = false;
    state.documents.lock().await.clear();
    Json(ResetResponse {
        status: "success".to_string(),
        message: "System reset successfully".to_string(),
    })
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model: "huggingface".to_string(),
        documents_loaded: 0,
    })
}

async fn spawn_mock_backend() -> (String, MockBackendState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = MockBackendState::default();
    let app = Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/status", get(handle_status))
        .route("/api/query", post(handle_query))
        .route("/api/reset", post(handle_reset))
        .route("/api/health", get(handle_health))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn doc(filename: &str, mime: &str, bytes: &[u8]) -> DocumentUpload {
    DocumentUpload {
        filename: filename.to_string(),
        mime_type: Some(mime.to_string()),
        bytes: bytes.to_vec(),
    }
}

#[tokio::test]
async fn upload_sends_one_files_part_per_document() {
    let (server_url, state) = spawn_mock_backend().await;
    let client = DocQaClient::new(server_url);

    let response = client
        .upload_documents(vec![
            doc("a.pdf", "application/pdf", b"%PDF-1.4 fake"),
            doc("b.txt", "text/plain", b"hello"),
        ])
        .await
        .expect("upload");

    assert_eq!(response.message, "Loaded 2 document(s)");
    assert_eq!(response.files, ["a.pdf", "b.txt"]);
    assert_eq!(response.total_documents, 2);

    let parts = state.received_parts.lock().await.clone();
    assert_eq!(
        parts,
        [
            ReceivedPart {
                field: "files".to_string(),
                filename: "a.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                len: 13,
            },
            ReceivedPart {
                field: "files".to_string(),
                filename: "b.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                len: 5,
            },
        ]
    );
}

#[tokio::test]
async fn upload_failure_reports_the_backend_detail() {
    let (server_url, state) = spawn_mock_backend().await;
    *state.reject_upload.lock().await = Some("Unsupported format: .png. Use PDF, DOCX or TXT".to_string());
    let client = DocQaClient::new(server_url);

    let err = client
        .upload_documents(vec![doc("image.png", "image/png", b"\x89PNG")])
        .await
        .expect_err("must fail");

    match err {
        ClientError::Api { status, detail } => {
            assert_eq!(status, 400);
            assert_eq!(detail, "Unsupported format: .png. Use PDF, DOCX or TXT");
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
}

#[tokio::test]
async fn status_reports_readiness_and_loaded_documents() {
    let (server_url, _state) = spawn_mock_backend().await;
    let client = DocQaClient::new(server_url);

    let before = client.status().await.expect("status");
    assert!(!before.is_ready());
    assert!(before.documents_loaded.is_empty());

    client
        .upload_documents(vec![doc("a.pdf", "application/pdf", b"%PDF")])
        .await
        .expect("upload");

    let after = client.status().await.expect("status");
    assert!(after.is_ready());
    assert_eq!(after.documents_loaded, ["a.pdf"]);
    assert_eq!(after.message, "1 document(s) loaded");
}

#[tokio::test]
async fn query_round_trips_answer_sources_and_confidence() {
    let (server_url, _state) = spawn_mock_backend().await;
    let client = DocQaClient::new(server_url);

    let response = client
        .query("How long is the term?")
        .await
        .expect("query");

    assert!(response.answer.contains("How long is the term?"));
    assert_eq!(response.confidence.as_deref(), Some("High"));
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].chunk, 2);
    assert_eq!(response.sources[0].score, 0.12);
    assert_eq!(response.sources[0].keyword_score, Some(3.7));
}

#[tokio::test]
async fn query_failure_reports_the_backend_detail() {
    let (server_url, state) = spawn_mock_backend().await;
    *state.reject_query.lock().await =
        Some("No documents loaded. Please upload documents first.".to_string());
    let client = DocQaClient::new(server_url);

    let err = client.query("anything").await.expect_err("must fail");
    match err {
        ClientError::Api { detail, .. } => {
            assert_eq!(detail, "No documents loaded. Please upload documents first.");
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
}

#[tokio::test]
async fn reset_clears_backend_state() {
    let (server_url, state) = spawn_mock_backend().await;
    let client = DocQaClient::new(server_url);

    client
        .upload_documents(vec![doc("a.pdf", "application/pdf", b"%PDF")])
        .await
        .expect("upload");

    let response = client.reset().await.expect("reset");
    assert_eq!(response.message, "System reset successfully");
    assert_eq!(*state.reset_calls.lock().await, 1);

    let status = client.status().await.expect("status");
    assert!(!status.is_ready());
    assert!(status.documents_loaded.is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Bind then drop to get a port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = DocQaClient::new(format!("http://{addr}"));
    let err = client.status().await.expect_err("must fail");
    assert!(err.is_transport(), "unexpected error kind: {err:?}");
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_http_status_text() {
    async fn plain_error() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "backend offline")
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route("/api/reset", post(plain_error));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = DocQaClient::new(format!("http://{addr}"));
    let err = client.reset().await.expect_err("must fail");
    match err {
        ClientError::Api { status, detail } => {
            assert_eq!(status, 503);
            assert_eq!(detail, "Service Unavailable");
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
}

#[tokio::test]
async fn trailing_slash_in_server_url_is_tolerated() {
    let (server_url, _state) = spawn_mock_backend().await;
    let client = DocQaClient::new(format!("{server_url}/"));

    let health = client.health().await.expect("health");
    assert_eq!(health.status, "healthy");
    assert_eq!(health.model, "huggingface");
}
