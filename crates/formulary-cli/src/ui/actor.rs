//! UI Actor - Single-threaded event processing
//!
//! Reporter calls arrive from the async runtime and from blocking tasks.
//! Each becomes an event on a channel; one thread owns stdout and renders
//! the events in order, so lines never interleave.

use super::theme::{Theme, format_size};
use crossterm::style::{Color, Stylize};
use formulary_schema::{PackageName, Version};
use std::collections::HashMap;
use std::io::Write;
use std::sync::mpsc;
use std::thread;

/// Pipeline stages shown while a package is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Verifying,
    Extracting,
    Installing,
    Testing,
    Removing,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Verifying => "verifying",
            Self::Extracting => "extracting",
            Self::Installing => "installing",
            Self::Testing => "testing",
            Self::Removing => "removing",
        }
    }
}

/// Events that can be sent to the UI actor
#[derive(Debug)]
pub enum UiEvent {
    /// Print a section header
    PrintHeader { title: String },
    /// Download progress
    Downloading {
        name: PackageName,
        version: Version,
        current: u64,
        total: Option<u64>,
    },
    /// A package entered a new stage
    Stage {
        name: PackageName,
        version: Version,
        stage: Stage,
        detail: Option<String>,
    },
    Done {
        name: PackageName,
        version: Version,
        detail: String,
    },
    Failed {
        name: PackageName,
        version: Version,
        reason: String,
    },
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
    /// Synchronize UI state (wait for all pending renders)
    Sync(mpsc::Sender<()>),
    /// Shutdown the actor
    Shutdown,
}

/// Handle to the UI actor thread
#[derive(Debug)]
pub struct UiActor {
    sender: mpsc::Sender<UiEvent>,
    _handle: thread::JoinHandle<()>,
}

impl UiActor {
    /// Spawn a new UI actor thread
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || run_event_loop(&receiver));
        Self {
            sender,
            _handle: handle,
        }
    }

    /// Get a cloneable sender for this actor
    pub fn sender(&self) -> mpsc::Sender<UiEvent> {
        self.sender.clone()
    }
}

impl Drop for UiActor {
    fn drop(&mut self) {
        let _ = self.sender.send(UiEvent::Shutdown);
    }
}

/// Renders events as lines.
struct Renderer<W: Write> {
    out: W,
    theme: Theme,
    /// Artifact size per package, once the download has finished.
    fetched: HashMap<PackageName, u64>,
}

impl<W: Write> Renderer<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            theme: Theme::default(),
            fetched: HashMap::new(),
        }
    }

    fn row(&mut self, icon: &str, color: Color, name: &PackageName, version: &Version, status: &str) {
        let layout = &self.theme.layout;
        let name_part = format!("{:<width$}", name.as_str(), width = layout.name_width);
        let version_part = format!("{:<width$}", version.as_str(), width = layout.version_width);
        let _ = writeln!(
            self.out,
            "  {} {} {} {}",
            icon.with(color),
            name_part.with(self.theme.colors.package_name),
            version_part.with(self.theme.colors.version),
            status
        );
    }

    fn message(&mut self, icon: &str, color: Color, msg: &str) {
        let _ = writeln!(self.out, "  {} {}", icon.with(color), msg);
    }

    fn handle(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::PrintHeader { title } => {
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "{} {}", title.bold(), "─".repeat(40).dark_grey());
            }
            UiEvent::Downloading {
                name,
                version,
                current,
                total,
            } => {
                // First event announces the fetch; later ones only record size.
                if current == 0 && !self.fetched.contains_key(&name) {
                    let size = total.map(format_size).unwrap_or_default();
                    let status = format!("{:<w$}{}", Stage::Fetching.label(), size.dark_grey(), w = self.theme.layout.stage_width);
                    let (icon, color) = (self.theme.icons.active, self.theme.colors.active);
                    self.row(icon, color, &name, &version, &status);
                }
                self.fetched.insert(name, current);
            }
            UiEvent::Stage {
                name,
                version,
                stage,
                detail,
            } => {
                let mut status = format!("{:<w$}", stage.label(), w = self.theme.layout.stage_width);
                if stage == Stage::Verifying {
                    if let Some(bytes) = self.fetched.get(&name) {
                        status.push_str(&format_size(*bytes).dark_grey().to_string());
                    }
                }
                if let Some(detail) = detail {
                    status.push_str(&detail.dark_grey().to_string());
                }
                let (icon, color) = (self.theme.icons.active, self.theme.colors.active);
                self.row(icon, color, &name, &version, &status);
            }
            UiEvent::Done {
                name,
                version,
                detail,
            } => {
                let (icon, color) = (self.theme.icons.success, self.theme.colors.success);
                let status = detail.with(color).to_string();
                self.row(icon, color, &name, &version, &status);
            }
            UiEvent::Failed {
                name,
                version,
                reason,
            } => {
                let (icon, color) = (self.theme.icons.error, self.theme.colors.error);
                let status = reason.with(color).to_string();
                self.row(icon, color, &name, &version, &status);
            }
            UiEvent::Info(msg) => {
                let (icon, color) = (self.theme.icons.info, self.theme.colors.secondary);
                self.message(icon, color, &msg);
            }
            UiEvent::Success(msg) => {
                let (icon, color) = (self.theme.icons.success, self.theme.colors.success);
                self.message(icon, color, &msg);
            }
            UiEvent::Warning(msg) => {
                let (icon, color) = (self.theme.icons.warning, self.theme.colors.warning);
                self.message(icon, color, &msg);
            }
            UiEvent::Error(msg) => {
                let (icon, color) = (self.theme.icons.error, self.theme.colors.error);
                self.message(icon, color, &msg);
            }
            UiEvent::Sync(tx) => {
                let _ = self.out.flush();
                let _ = tx.send(());
            }
            UiEvent::Shutdown => return false,
        }
        let _ = self.out.flush();
        true
    }
}

/// Main event loop for the UI actor
fn run_event_loop(receiver: &mpsc::Receiver<UiEvent>) {
    let mut renderer = Renderer::new(std::io::stdout());
    while let Ok(event) = receiver.recv() {
        if !renderer.handle(event) {
            break;
        }
    }
}
