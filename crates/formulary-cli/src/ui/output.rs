//! Unified UI output interface.
//!
//! Commands talk to the terminal only through [`Output`]; every call is
//! forwarded to the UI actor for sequential rendering.

use super::actor::{Stage, UiActor, UiEvent};
use formulary_core::Reporter;
use formulary_schema::{PackageName, Version};
use std::sync::{OnceLock, mpsc};

/// Singleton instance of the UI actor channel.
static UI_ACTOR: OnceLock<mpsc::Sender<UiEvent>> = OnceLock::new();

/// Lazily initializes the UI actor and returns a sender handle.
fn get_actor_sender() -> mpsc::Sender<UiEvent> {
    UI_ACTOR
        .get_or_init(|| {
            let actor = UiActor::spawn();
            let sender = actor.sender();

            // Keep actor alive for program duration
            std::mem::forget(actor);

            sender
        })
        .clone()
}

/// A cloneable handle for sending UI events to the terminal actor.
#[derive(Debug, Clone)]
pub struct Output {
    sender: mpsc::Sender<UiEvent>,
    quiet: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            sender: get_actor_sender(),
            quiet: false,
        }
    }

    /// An output that only shows warnings and errors.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::new()
        }
    }

    fn send(&self, event: UiEvent) {
        let _ = self.sender.send(event);
    }

    fn stage(&self, name: &PackageName, version: &Version, stage: Stage, detail: Option<String>) {
        if !self.quiet {
            self.send(UiEvent::Stage {
                name: name.clone(),
                version: version.clone(),
                stage,
                detail,
            });
        }
    }

    /// Prints a visual section header for an operation phase.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            self.send(UiEvent::PrintHeader {
                title: title.to_string(),
            });
        }
    }

    /// Prints an informational message to the console.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            self.send(UiEvent::Info(msg.to_string()));
        }
    }

    /// Prints a success message to the console.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            self.send(UiEvent::Success(msg.to_string()));
        }
    }

    /// Prints a warning message to the console.
    pub fn warning(&self, msg: &str) {
        self.send(UiEvent::Warning(msg.to_string()));
    }

    /// Prints an error message to the console.
    pub fn error(&self, msg: &str) {
        self.send(UiEvent::Error(msg.to_string()));
    }

    /// Block until all pending UI events are processed.
    pub fn wait(&self) {
        let (tx, rx) = mpsc::channel();
        self.send(UiEvent::Sync(tx));
        let _ = rx.recv();
    }
}

impl Reporter for Output {
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        if !self.quiet {
            self.send(UiEvent::Downloading {
                name: name.clone(),
                version: version.clone(),
                current,
                total,
            });
        }
    }

    fn verifying(&self, name: &PackageName, version: &Version) {
        self.stage(name, version, Stage::Verifying, None);
    }

    fn extracting(&self, name: &PackageName, version: &Version) {
        self.stage(name, version, Stage::Extracting, None);
    }

    fn installing(&self, name: &PackageName, version: &Version) {
        self.stage(name, version, Stage::Installing, None);
    }

    fn testing(&self, name: &PackageName, version: &Version, command: &str) {
        self.stage(name, version, Stage::Testing, Some(command.to_string()));
    }

    fn removing(&self, name: &PackageName, version: &Version) {
        self.stage(name, version, Stage::Removing, None);
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        if !self.quiet {
            self.send(UiEvent::Done {
                name: name.clone(),
                version: version.clone(),
                detail: detail.to_string(),
            });
        }
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        self.send(UiEvent::Failed {
            name: name.clone(),
            version: version.clone(),
            reason: reason.to_string(),
        });
    }

    fn warning(&self, msg: &str) {
        self.warning(msg);
    }
}

