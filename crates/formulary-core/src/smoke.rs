//! Post-install smoke tests.
//!
//! Test commands are shell strings with `{bin}`, `{lib}`, `{share}` and
//! `{prefix}` placeholders, e.g. `{bin}/ecsfgrun -v`. Each runs under
//! `sh -c` with a deadline.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::paths::Prefix;
use formulary_schema::Destination;

#[derive(Error, Debug)]
pub enum SmokeTestError {
    #[error("`{command}` failed to start: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Substitute install directories into a test command.
pub fn expand(command: &str, prefix: &Prefix) -> String {
    let mut out = command.replace("{prefix}", &prefix.root().to_string_lossy());
    for destination in Destination::ALL {
        let placeholder = format!("{{{}}}", destination.dir_name());
        out = out.replace(&placeholder, &prefix.dir(destination).to_string_lossy());
    }
    out
}

/// Run one expanded command, returning its stdout on success.
pub fn run(command: &str, timeout: Duration) -> Result<String, SmokeTestError> {
    debug!(command, "running smoke test");

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SmokeTestError::Spawn {
            command: command.to_string(),
            source,
        })?;

    // Drain pipes on their own threads so a chatty command cannot block on
    // a full pipe while we wait for it.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            child.kill().ok();
            child.wait().ok();
            return Err(SmokeTestError::TimedOut {
                command: command.to_string(),
                timeout,
            });
        }
        Err(source) => {
            return Err(SmokeTestError::Spawn {
                command: command.to_string(),
                source,
            });
        }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    if status.success() {
        Ok(stdout)
    } else {
        Err(SmokeTestError::Failed {
            command: command.to_string(),
            status,
            stderr,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_string(&mut buf).ok();
        }
        buf
    })
}
