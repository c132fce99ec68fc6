//! UI/backend events and error modeling for the desktop controller.

use shared::error::ClientError;
use shared::protocol::{QueryResponse, StatusResponse};

pub enum UiEvent {
    /// Fresh `/api/status` snapshot; drives the readiness gate.
    StatusUpdated(StatusResponse),
    UploadFinished {
        message: String,
        total_documents: usize,
    },
    UploadFailed(UiError),
    AnswerReceived {
        response: QueryResponse,
    },
    /// Query failures land in the chat as an assistant turn, not as a
    /// notification.
    QueryFailed {
        message: String,
    },
    ResetFinished {
        message: String,
    },
    ResetFailed(UiError),
    HealthChecked {
        model: String,
        documents_loaded: usize,
    },
    Info(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Api,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Upload,
    Reset,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_client(context: UiErrorContext, err: &ClientError) -> Self {
        let category = match err {
            ClientError::Transport(_) => UiErrorCategory::Transport,
            ClientError::Api { .. } => UiErrorCategory::Api,
        };
        Self {
            category,
            context,
            message: user_facing_text(err),
        }
    }

    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            category: UiErrorCategory::Unknown,
            context,
            message: message.into(),
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What the user reads for a failed exchange, whether it lands in a
/// notification or as an inline chat turn: the backend's own `detail` for
/// API rejections, a fixed line when the server could not be reached.
pub fn user_facing_text(err: &ClientError) -> String {
    match err {
        ClientError::Transport(_) => "Could not reach the server".to_string(),
        ClientError::Api { detail, .. } => format!("Error: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_rejections_surface_the_backend_detail() {
        let err = ClientError::Api {
            status: 400,
            detail: "No documents loaded. Please upload documents first.".to_string(),
        };
        let ui_err = UiError::from_client(UiErrorContext::Upload, &err);

        assert_eq!(ui_err.category(), UiErrorCategory::Api);
        assert_eq!(
            ui_err.message(),
            "Error: No documents loaded. Please upload documents first."
        );
    }

    #[test]
    fn transport_failures_use_the_fixed_connection_line() {
        let err = ClientError::transport("connection refused");
        let ui_err = UiError::from_client(UiErrorContext::Upload, &err);

        assert_eq!(ui_err.category(), UiErrorCategory::Transport);
        assert_eq!(ui_err.message(), "Could not reach the server");
    }
}
