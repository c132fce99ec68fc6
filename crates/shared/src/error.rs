use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body shape the backend uses for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

/// The two failure kinds a backend exchange can produce. Both are terminal
/// for that one attempt; the caller reports them and waits for the user to
/// retry manually.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network unreachable, connection dropped, or a malformed response body.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Non-2xx response carrying a `detail` string.
    #[error("backend rejected the request ({status}): {detail}")]
    Api { status: u16, detail: String },
}

impl ClientError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
