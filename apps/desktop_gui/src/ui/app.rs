use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use client_core::{SelectionQueue, ALLOWED_EXTENSIONS};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::protocol::SourceRef;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiErrorCategory, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::ui::message_view::{
    self, ConfidenceLevel, Inline, MessageBlock, MAX_RENDERED_SOURCES,
};

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub server_url: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// One command of each kind may be in flight at a time; the label feeds the
/// busy overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusyAction {
    Upload,
    Query,
    Reset,
}

impl BusyAction {
    fn label(self) -> &'static str {
        match self {
            Self::Upload => "Processing documents...",
            Self::Query => "Looking for an answer...",
            Self::Reset => "Resetting the system...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
struct Notification {
    kind: NotificationKind,
    message: String,
    raised_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageAuthor {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
struct ChatMessage {
    author: MessageAuthor,
    text: String,
    sources: Vec<SourceRef>,
    confidence: Option<String>,
    sent_at: DateTime<Local>,
}

impl ChatMessage {
    fn user(text: String) -> Self {
        Self {
            author: MessageAuthor::User,
            text,
            sources: Vec::new(),
            confidence: None,
            sent_at: Local::now(),
        }
    }

    fn assistant(text: String, sources: Vec<SourceRef>, confidence: Option<String>) -> Self {
        Self {
            author: MessageAuthor::Assistant,
            text,
            sources,
            confidence,
            sent_at: Local::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WelcomeState {
    Initial,
    AfterReset,
    Dismissed,
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Api => "Backend",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

pub struct DocChatApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    server_url: String,

    selection: SelectionQueue,
    documents_loaded: bool,
    loaded_documents: Vec<String>,
    status_text: String,

    chat: Vec<ChatMessage>,
    welcome: WelcomeState,
    question_input: String,
    focus_question_input: bool,

    busy: Option<BusyAction>,
    notification: Option<Notification>,
    status_line: String,
    confirm_reset_open: bool,
}

impl DocChatApp {
    pub fn bootstrap(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        startup: StartupConfig,
    ) -> Self {
        let mut app = Self::new(cmd_tx, ui_rx, startup);
        // Parity with the web client: probe the backend once at startup.
        dispatch_backend_command(
            &app.cmd_tx,
            BackendCommand::CheckHealth,
            &mut app.status_line,
        );
        dispatch_backend_command(
            &app.cmd_tx,
            BackendCommand::RefreshStatus,
            &mut app.status_line,
        );
        app
    }

    fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        startup: StartupConfig,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            server_url: startup.server_url,
            selection: SelectionQueue::new(),
            documents_loaded: false,
            loaded_documents: Vec::new(),
            status_text: "Checking system status...".to_string(),
            chat: Vec::new(),
            welcome: WelcomeState::Initial,
            question_input: String::new(),
            focus_question_input: false,
            busy: None,
            notification: None,
            status_line: String::new(),
            confirm_reset_open: false,
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: String) {
        self.notification = Some(Notification {
            kind,
            message,
            raised_at: Instant::now(),
        });
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::StatusUpdated(status) => {
                    self.documents_loaded = status.is_ready();
                    self.loaded_documents = status.documents_loaded;
                    self.status_text = status.message;
                }
                UiEvent::UploadFinished {
                    message,
                    total_documents,
                } => {
                    self.busy = None;
                    self.selection.clear();
                    self.welcome = WelcomeState::Dismissed;
                    self.status_line = format!("{total_documents} document(s) in the index");
                    self.notify(NotificationKind::Success, message);
                }
                UiEvent::UploadFailed(err) => {
                    // The queue is left untouched so the user can retry.
                    self.busy = None;
                    self.notify(NotificationKind::Error, err.message().to_string());
                }
                UiEvent::AnswerReceived { response } => {
                    self.busy = None;
                    self.focus_question_input = true;
                    self.chat.push(ChatMessage::assistant(
                        response.answer,
                        response.sources,
                        response.confidence,
                    ));
                }
                UiEvent::QueryFailed { message } => {
                    self.busy = None;
                    self.focus_question_input = true;
                    self.chat
                        .push(ChatMessage::assistant(message, Vec::new(), None));
                }
                UiEvent::ResetFinished { message } => {
                    self.busy = None;
                    self.chat.clear();
                    self.welcome = WelcomeState::AfterReset;
                    self.selection.clear();
                    self.question_input.clear();
                    self.notify(NotificationKind::Success, message);
                }
                UiEvent::ResetFailed(err) => {
                    self.busy = None;
                    self.notify(NotificationKind::Error, err.message().to_string());
                }
                UiEvent::HealthChecked {
                    model,
                    documents_loaded,
                } => {
                    self.status_line = format!(
                        "Backend healthy (model '{model}', {documents_loaded} document(s) indexed)"
                    );
                }
                UiEvent::Info(message) => {
                    self.status_line = message;
                }
                UiEvent::Error(err) => {
                    self.busy = None;
                    self.status_line = if err.context() == UiErrorContext::BackendStartup {
                        err.message().to_string()
                    } else {
                        format!("{} error: {}", err_label(err.category()), err.message())
                    };
                    self.notify(NotificationKind::Error, err.message().to_string());
                }
            }
        }
    }

    fn expire_notification(&mut self) {
        if let Some(notification) = &self.notification {
            if notification.raised_at.elapsed() > NOTIFICATION_TTL {
                self.notification = None;
            }
        }
    }

    fn pick_files(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Documents", &ALLOWED_EXTENSIONS)
            .pick_files();
        if let Some(paths) = picked {
            self.selection.add_files(paths);
        }
    }

    fn submit_upload(&mut self) {
        if self.busy.is_some() || self.selection.is_empty() {
            return;
        }
        let paths = self.selection.paths();
        if dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::UploadDocuments { paths },
            &mut self.status_line,
        ) {
            self.busy = Some(BusyAction::Upload);
        }
    }

    fn submit_question(&mut self) {
        let question = self.question_input.trim().to_string();
        if question.is_empty() || !self.documents_loaded || self.busy.is_some() {
            return;
        }
        if dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::SendQuestion {
                question: question.clone(),
            },
            &mut self.status_line,
        ) {
            self.chat.push(ChatMessage::user(question));
            self.question_input.clear();
            self.busy = Some(BusyAction::Query);
        }
    }

    fn request_reset(&mut self) {
        self.confirm_reset_open = true;
    }

    fn confirm_reset(&mut self) {
        self.confirm_reset_open = false;
        if self.busy.is_some() {
            return;
        }
        if dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::ResetSystem,
            &mut self.status_line,
        ) {
            self.busy = Some(BusyAction::Reset);
        }
    }

    fn refresh_status(&mut self) {
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::RefreshStatus,
            &mut self.status_line,
        );
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("app_header")
            .exact_height(44.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(egui::RichText::new("DocChat").size(18.0).strong());
                    ui.label(
                        egui::RichText::new("ask questions about your documents")
                            .size(12.0)
                            .weak(),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button("Reset system")
                            .on_hover_text("Remove every document loaded on the server")
                            .clicked()
                        {
                            self.request_reset();
                        }
                        if ui
                            .button("\u{21BB}")
                            .on_hover_text("Refresh backend status")
                            .clicked()
                        {
                            self.refresh_status();
                        }
                        ui.label(egui::RichText::new(&self.status_text).size(12.0));
                        self.show_status_dot(ui);
                    });
                });
            });
    }

    fn show_status_dot(&self, ui: &mut egui::Ui) {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
        let color = if self.documents_loaded {
            egui::Color32::from_rgb(46, 204, 113)
        } else {
            egui::Color32::from_gray(110)
        };
        ui.painter().circle_filled(rect.center(), 5.0, color);
    }

    fn show_status_strip(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_strip")
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(egui::RichText::new(&self.status_line).size(11.0).weak());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(egui::RichText::new(&self.server_url).size(11.0).weak());
                    });
                });
            });
    }

    fn show_documents_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("documents_panel")
            .resizable(true)
            .default_width(300.0)
            .min_width(240.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.label(egui::RichText::new("Documents").size(15.0).strong());
                ui.label(
                    egui::RichText::new("PDF, DOCX or TXT")
                        .size(11.0)
                        .weak(),
                );
                ui.add_space(6.0);

                if ui.button("\u{1F4C2} Add documents...").clicked() {
                    self.pick_files();
                }

                ui.add_space(6.0);
                let mut removed = None;
                for (index, file) in self.selection.iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(format!("\u{1F4C4} {}", file.filename)).size(12.0),
                        );
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui
                                .small_button("\u{00D7}")
                                .on_hover_text("Remove from the upload list")
                                .clicked()
                            {
                                removed = Some(index);
                            }
                        });
                    });
                }
                if let Some(index) = removed {
                    self.selection.remove(index);
                }

                ui.add_space(6.0);
                let can_upload = !self.selection.is_empty() && self.busy.is_none();
                if ui
                    .add_enabled(
                        can_upload,
                        egui::Button::new(format!(
                            "\u{2B06} Upload {} file(s)",
                            self.selection.len()
                        )),
                    )
                    .clicked()
                {
                    self.submit_upload();
                }

                ui.add_space(12.0);
                ui.separator();
                ui.add_space(4.0);
                ui.label(
                    egui::RichText::new(format!(
                        "Loaded documents ({})",
                        self.loaded_documents.len()
                    ))
                    .size(13.0)
                    .strong(),
                );
                if self.loaded_documents.is_empty() {
                    ui.label(egui::RichText::new("Nothing indexed yet").size(11.0).weak());
                } else {
                    egui::ScrollArea::vertical()
                        .id_salt("loaded_documents_scroll")
                        .max_height(200.0)
                        .show(ui, |ui| {
                            for name in &self.loaded_documents {
                                ui.label(
                                    egui::RichText::new(format!("\u{1F4DA} {name}")).size(12.0),
                                );
                            }
                        });
                }
            });
    }

    fn show_chat_area(&mut self, ui: &mut egui::Ui) {
        egui::TopBottomPanel::bottom("composer")
            .exact_height(52.0)
            .show_inside(ui, |ui| {
                self.show_composer(ui);
            });
        egui::CentralPanel::default().show_inside(ui, |ui| {
            self.show_chat_history(ui);
        });
    }

    fn show_composer(&mut self, ui: &mut egui::Ui) {
        let enabled = self.documents_loaded && self.busy.is_none();
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let send_width = 72.0;
            let text_width = (ui.available_width() - send_width - 12.0).max(120.0);
            let hint = if self.documents_loaded {
                "Ask a question about your documents"
            } else {
                "Upload documents to enable questions"
            };

            let response = ui.add_enabled(
                enabled,
                egui::TextEdit::singleline(&mut self.question_input)
                    .id_salt("question_input")
                    .hint_text(hint)
                    .desired_width(text_width),
            );
            if self.focus_question_input && enabled {
                response.request_focus();
                self.focus_question_input = false;
            }

            let submitted = response.lost_focus()
                && ui.input(|input| input.key_pressed(egui::Key::Enter));
            let clicked = ui
                .add_enabled(enabled, egui::Button::new("Send"))
                .clicked();
            if submitted || clicked {
                self.submit_question();
            }
        });
    }

    fn show_chat_history(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .id_salt("chat_scroll")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.add_space(8.0);
                match self.welcome {
                    WelcomeState::Initial => self.show_welcome(
                        ui,
                        "\u{1F44B} Welcome",
                        "Upload documents on the left, then ask questions about their content.",
                    ),
                    WelcomeState::AfterReset => self.show_welcome(
                        ui,
                        "\u{1F44B} System reset",
                        "Upload new documents to get started.",
                    ),
                    WelcomeState::Dismissed => {}
                }
                for message in &self.chat {
                    render_chat_message(ui, message);
                    ui.add_space(8.0);
                }
            });
    }

    fn show_welcome(&self, ui: &mut egui::Ui, title: &str, body: &str) {
        ui.vertical_centered(|ui| {
            ui.add_space(24.0);
            ui.label(egui::RichText::new(title).size(17.0).strong());
            ui.label(egui::RichText::new(body).size(13.0).weak());
        });
    }

    fn show_confirm_reset(&mut self, ctx: &egui::Context) {
        if !self.confirm_reset_open {
            return;
        }
        egui::Window::new("Reset system?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("This removes every document loaded on the server.");
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        self.confirm_reset_open = false;
                    }
                    let reset_button = egui::Button::new(
                        egui::RichText::new("Reset").color(egui::Color32::WHITE),
                    )
                    .fill(egui::Color32::from_rgb(190, 60, 60));
                    if ui.add(reset_button).clicked() {
                        self.confirm_reset();
                    }
                });
            });
    }

    fn show_busy_overlay(&self, ctx: &egui::Context) {
        let Some(action) = self.busy else {
            return;
        };
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("busy_dim"),
        ));
        painter.rect_filled(
            ctx.screen_rect(),
            egui::CornerRadius::ZERO,
            egui::Color32::from_black_alpha(110),
        );

        egui::Area::new(egui::Id::new("busy_overlay"))
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .inner_margin(egui::Margin::symmetric(18, 14))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.add(egui::Spinner::new().size(22.0));
                            ui.label(egui::RichText::new(action.label()).size(14.0));
                        });
                    });
            });
    }

    fn show_notification(&self, ctx: &egui::Context) {
        let Some(notification) = &self.notification else {
            return;
        };
        let (fill, icon) = match notification.kind {
            NotificationKind::Success => (egui::Color32::from_rgb(22, 101, 52), "\u{2705}"),
            NotificationKind::Error => (egui::Color32::from_rgb(136, 32, 32), "\u{274C}"),
        };
        egui::Area::new(egui::Id::new("notification"))
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 52.0))
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(fill)
                    .corner_radius(egui::CornerRadius::same(6))
                    .inner_margin(egui::Margin::symmetric(12, 8))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(format!("{icon} {}", notification.message))
                                .color(egui::Color32::WHITE)
                                .size(13.0),
                        );
                    });
            });
    }
}

fn render_chat_message(ui: &mut egui::Ui, message: &ChatMessage) {
    let (fill, author_label) = match message.author {
        MessageAuthor::User => (egui::Color32::from_rgb(43, 57, 82), "You"),
        MessageAuthor::Assistant => (egui::Color32::from_gray(40), "Assistant"),
    };

    egui::Frame::new()
        .fill(fill)
        .corner_radius(egui::CornerRadius::same(6))
        .inner_margin(egui::Margin::symmetric(10, 8))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(author_label).size(11.0).strong());
                ui.label(
                    egui::RichText::new(message.sent_at.format("%H:%M").to_string())
                        .size(10.0)
                        .weak(),
                );
            });
            ui.add_space(2.0);
            render_message_blocks(ui, &message.text);
            if !message.sources.is_empty() {
                render_sources(ui, &message.sources, message.confidence.as_deref());
            }
        });
}

fn render_message_blocks(ui: &mut egui::Ui, text: &str) {
    for block in message_view::parse_markdown(text) {
        match block {
            MessageBlock::Separator => {
                ui.separator();
            }
            MessageBlock::Paragraph(lines) => {
                for line in &lines {
                    render_line(ui, line);
                }
                ui.add_space(6.0);
            }
        }
    }
}

fn render_line(ui: &mut egui::Ui, line: &[Inline]) {
    if line.is_empty() {
        ui.label("");
        return;
    }
    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 0.0;
        for span in line {
            match span {
                Inline::Text(text) => {
                    ui.label(egui::RichText::new(text).size(13.0));
                }
                Inline::Bold(text) => {
                    ui.label(egui::RichText::new(text).size(13.0).strong());
                }
            }
        }
    });
}

fn render_sources(ui: &mut egui::Ui, sources: &[SourceRef], confidence: Option<&str>) {
    ui.add_space(4.0);
    ui.label(
        egui::RichText::new(format!(
            "\u{1F4DA} Sources ({} fragment(s))",
            sources.len()
        ))
        .size(12.0)
        .strong(),
    );
    for source in sources.iter().take(MAX_RENDERED_SOURCES) {
        egui::Frame::new()
            .fill(egui::Color32::from_gray(30))
            .corner_radius(egui::CornerRadius::same(4))
            .inner_margin(egui::Margin::symmetric(8, 6))
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        egui::RichText::new(format!(
                            "\u{1F4C4} {} \u{2013} fragment {}",
                            source.filename,
                            source.chunk + 1
                        ))
                        .size(11.0)
                        .strong(),
                    );
                    ui.label(
                        egui::RichText::new(message_view::source_score_label(
                            source.score,
                            source.keyword_score,
                        ))
                        .size(11.0)
                        .weak(),
                    );
                });
                ui.label(
                    egui::RichText::new(format!(
                        "\"{}\"",
                        message_view::truncate_excerpt(&source.content)
                    ))
                    .size(11.0)
                    .italics(),
                );
            });
    }
    if let Some(confidence) = confidence {
        let fill = match message_view::confidence_level(confidence) {
            ConfidenceLevel::High => egui::Color32::from_rgb(22, 101, 52),
            ConfidenceLevel::Medium => egui::Color32::from_rgb(146, 101, 21),
            ConfidenceLevel::Low => egui::Color32::from_rgb(136, 32, 32),
            ConfidenceLevel::Other => egui::Color32::from_gray(70),
        };
        ui.add_space(2.0);
        egui::Frame::new()
            .fill(fill)
            .corner_radius(egui::CornerRadius::same(10))
            .inner_margin(egui::Margin::symmetric(8, 3))
            .show(ui, |ui| {
                ui.label(
                    egui::RichText::new(format!("Confidence: {confidence}"))
                        .color(egui::Color32::WHITE)
                        .size(11.0),
                );
            });
    }
}

impl eframe::App for DocChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.expire_notification();

        self.show_header(ctx);
        self.show_status_strip(ctx);
        self.show_documents_panel(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_chat_area(ui);
        });

        self.show_confirm_reset(ctx);
        self.show_busy_overlay(ctx);
        self.show_notification(ctx);

        // Keep draining worker events even when the user is idle.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
