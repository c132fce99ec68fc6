use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::app::{DocChatApp, StartupConfig};

/// Desktop client for the document question-answering backend.
#[derive(Parser, Debug)]
#[command(name = "docchat")]
struct Args {
    /// Base URL of the backend serving /api/upload, /api/status, /api/query
    /// and /api/reset.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server_url: String,

    /// Tracing filter, e.g. "info" or "desktop_gui=debug".
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter)
        .init();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    let startup = StartupConfig {
        server_url: args.server_url,
    };
    backend_bridge::runtime::launch(startup.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("DocChat")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([860.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "DocChat",
        options,
        Box::new(|_cc| Ok(Box::new(DocChatApp::bootstrap(cmd_tx, ui_rx, startup)))),
    )
}
