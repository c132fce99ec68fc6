//! Backend worker: owns the HTTP client and serializes every backend call.
//!
//! Commands are handled one at a time, so two exchanges of the same kind can
//! never overlap. Each user-initiated command emits exactly one terminal
//! event on every path, which is what lets the UI clear its busy indicator
//! unconditionally.

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use client_core::{DocQaApi, DocQaClient, DocumentUpload};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, warn};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::ui::app::StartupConfig;

pub fn launch(startup: StartupConfig, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = DocQaClient::new(&startup.server_url);
            info!(server_url = %client.server_url(), "backend worker ready");

            while let Ok(cmd) = cmd_rx.recv() {
                handle_command(&client, &ui_tx, cmd).await;
            }
        });
    });
}

async fn handle_command(client: &DocQaClient, ui_tx: &Sender<UiEvent>, cmd: BackendCommand) {
    match cmd {
        BackendCommand::UploadDocuments { paths } => {
            info!(count = paths.len(), "backend: upload_documents");
            let documents = match read_documents(&paths).await {
                Ok(documents) => documents,
                Err(err) => {
                    error!("backend: reading selected files failed: {err:#}");
                    let _ = ui_tx.try_send(UiEvent::UploadFailed(UiError::from_message(
                        UiErrorContext::Upload,
                        format!("{err:#}"),
                    )));
                    return;
                }
            };

            match client.upload_documents(documents).await {
                Ok(response) => {
                    refresh_status(client, ui_tx).await;
                    let _ = ui_tx.try_send(UiEvent::UploadFinished {
                        message: response.message,
                        total_documents: response.total_documents,
                    });
                }
                Err(err) => {
                    error!("backend: upload failed: {err}");
                    let _ = ui_tx.try_send(UiEvent::UploadFailed(UiError::from_client(
                        UiErrorContext::Upload,
                        &err,
                    )));
                }
            }
        }
        BackendCommand::RefreshStatus => {
            refresh_status(client, ui_tx).await;
        }
        BackendCommand::SendQuestion { question } => {
            info!("backend: send_question");
            let event = match client.query(&question).await {
                Ok(response) => UiEvent::AnswerReceived { response },
                Err(err) => {
                    error!("backend: query failed: {err}");
                    UiEvent::QueryFailed {
                        message: crate::controller::events::user_facing_text(&err),
                    }
                }
            };
            let _ = ui_tx.try_send(event);
        }
        BackendCommand::ResetSystem => {
            info!("backend: reset_system");
            match client.reset().await {
                Ok(response) => {
                    refresh_status(client, ui_tx).await;
                    let _ = ui_tx.try_send(UiEvent::ResetFinished {
                        message: response.message,
                    });
                }
                Err(err) => {
                    error!("backend: reset failed: {err}");
                    let _ = ui_tx.try_send(UiEvent::ResetFailed(UiError::from_client(
                        UiErrorContext::Reset,
                        &err,
                    )));
                }
            }
        }
        BackendCommand::CheckHealth => match client.health().await {
            Ok(health) => {
                let _ = ui_tx.try_send(UiEvent::HealthChecked {
                    model: health.model,
                    documents_loaded: health.documents_loaded,
                });
            }
            Err(err) => {
                // Informational probe only; readiness comes from /api/status.
                warn!("backend: health check failed: {err}");
            }
        },
    }
}

/// A failed status probe is logged, not surfaced: readiness simply stays at
/// its last known value until the next probe succeeds.
async fn refresh_status(client: &DocQaClient, ui_tx: &Sender<UiEvent>) {
    match client.status().await {
        Ok(status) => {
            let _ = ui_tx.try_send(UiEvent::StatusUpdated(status));
        }
        Err(err) => {
            warn!("backend: status check failed: {err}");
        }
    }
}

async fn read_documents(paths: &[PathBuf]) -> Result<Vec<DocumentUpload>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(read_document(path).await?);
    }
    Ok(documents)
}

async fn read_document(path: &Path) -> Result<DocumentUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read '{}'", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    Ok(DocumentUpload {
        filename,
        mime_type,
        bytes,
    })
}
