//! Text completion collaborators.
//!
//! The editor only knows how to build a [`CompletionRequest`] from the
//! selection and the document settings; producing the completion is up to a
//! [`CompletionService`].

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::settings::DocumentSettings;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(settings: &DocumentSettings, prompt: impl Into<String>) -> Self {
        Self {
            model: settings.model().to_string(),
            prompt: prompt.into(),
            temperature: settings.temperature(),
            max_tokens: settings.max_tokens(),
        }
    }
}

pub trait CompletionService {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("The text is not selected.")]
    NoSelection,
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

/// Runs an external command, writing the request as JSON to its stdin and
/// reading the completion from its stdout.
#[derive(Debug, Clone)]
pub struct CommandCompletion {
    program: String,
    args: Vec<String>,
}

impl CommandCompletion {
    /// Split a command line on whitespace. Returns `None` if it is blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(ToOwned::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl CompletionService for CommandCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start completion command {}", self.program))?;
        if let Some(mut stdin) = child.stdin.take() {
            let body = serde_json::to_vec(request)?;
            stdin
                .write_all(&body)
                .context("Failed to send completion request")?;
        }
        let output = child
            .wait_with_output()
            .context("Completion command did not finish")?;
        if !output.status.success() {
            anyhow::bail!("completion command exited with {}", output.status);
        }
        let text = String::from_utf8(output.stdout).context("Completion is not UTF-8")?;
        Ok(text.trim_end_matches(['\n', '\r']).to_string())
    }
}
