//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

pub enum BackendCommand {
    UploadDocuments { paths: Vec<PathBuf> },
    RefreshStatus,
    SendQuestion { question: String },
    ResetSystem,
    CheckHealth,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::UploadDocuments { .. } => "upload_documents",
            BackendCommand::RefreshStatus => "refresh_status",
            BackendCommand::SendQuestion { .. } => "send_question",
            BackendCommand::ResetSystem => "reset_system",
            BackendCommand::CheckHealth => "check_health",
        }
    }
}
