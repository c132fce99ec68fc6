//! HTTP client for the document question-answering backend, plus the
//! client-side selection state that feeds the upload flow.
//!
//! Every operation is a single request/response exchange: no retries, no
//! timeouts, no caching. Failures map onto the two-kind error model in
//! [`shared::error::ClientError`] and are reported to the caller once.

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    error::{ApiErrorBody, ClientError},
    protocol::{
        HealthResponse, QueryRequest, QueryResponse, ResetResponse, StatusResponse, UploadResponse,
    },
};
use tracing::info;

pub mod selection;

pub use selection::{SelectedFile, SelectionQueue, ALLOWED_EXTENSIONS};

/// A document read into memory and ready to ship to the backend.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// The backend surface the UI worker programs against. Tests substitute a
/// local mock server; the worker uses [`DocQaClient`].
#[async_trait]
pub trait DocQaApi: Send + Sync {
    /// `POST /api/upload`, multipart, one `files` part per document.
    async fn upload_documents(
        &self,
        documents: Vec<DocumentUpload>,
    ) -> Result<UploadResponse, ClientError>;

    /// `GET /api/status`.
    async fn status(&self) -> Result<StatusResponse, ClientError>;

    /// `POST /api/query` with `{question}`.
    async fn query(&self, question: &str) -> Result<QueryResponse, ClientError>;

    /// `POST /api/reset`, no body. Discards all server-side documents.
    async fn reset(&self) -> Result<ResetResponse, ClientError>;

    /// `GET /api/health`.
    async fn health(&self) -> Result<HealthResponse, ClientError>;
}

pub struct DocQaClient {
    http: Client,
    server_url: String,
}

impl DocQaClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into();
        Self {
            http: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }
}

/// Decodes a 2xx body, or turns a non-2xx response into `ClientError::Api`
/// by reading the backend's `{detail}` payload.
async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        response.json::<T>().await.map_err(ClientError::transport)
    } else {
        Err(api_error(status, response).await)
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> ClientError {
    let detail = match response.json::<ApiErrorBody>().await {
        Ok(body) => body.detail,
        // Not the expected error shape; fall back to the HTTP status text.
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected backend response")
            .to_string(),
    };
    ClientError::Api {
        status: status.as_u16(),
        detail,
    }
}

#[async_trait]
impl DocQaApi for DocQaClient {
    async fn upload_documents(
        &self,
        documents: Vec<DocumentUpload>,
    ) -> Result<UploadResponse, ClientError> {
        info!(count = documents.len(), "uploading documents");
        let mut form = multipart::Form::new();
        for document in documents {
            let mut part = multipart::Part::bytes(document.bytes).file_name(document.filename);
            if let Some(mime_type) = &document.mime_type {
                part = part.mime_str(mime_type).map_err(ClientError::transport)?;
            }
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(self.endpoint("/api/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::transport)?;
        decode_response(response).await
    }

    async fn status(&self) -> Result<StatusResponse, ClientError> {
        let response = self
            .http
            .get(self.endpoint("/api/status"))
            .send()
            .await
            .map_err(ClientError::transport)?;
        decode_response(response).await
    }

    async fn query(&self, question: &str) -> Result<QueryResponse, ClientError> {
        info!("sending question");
        let response = self
            .http
            .post(self.endpoint("/api/query"))
            .json(&QueryRequest {
                question: question.to_string(),
            })
            .send()
            .await
            .map_err(ClientError::transport)?;
        decode_response(response).await
    }

    async fn reset(&self) -> Result<ResetResponse, ClientError> {
        info!("resetting the system");
        let response = self
            .http
            .post(self.endpoint("/api/reset"))
            .send()
            .await
            .map_err(ClientError::transport)?;
        decode_response(response).await
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self
            .http
            .get(self.endpoint("/api/health"))
            .send()
            .await
            .map_err(ClientError::transport)?;
        decode_response(response).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
