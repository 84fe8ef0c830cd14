//! Edit scripts: a line-oriented way to drive a [`Session`].
//!
//! One command per line; blank lines and lines starting with `#` are
//! skipped. Positions are zero-based `ROW COLUMN` pairs.
//!
//! ```text
//! goto 0 5
//! type , world\n
//! select 0 0 0 5
//! erase
//! external 2 0 generated text
//! undo
//! redo
//! save
//! ```

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use crate::completion::{CompletionError, CompletionService};
use crate::editor::Session;
use crate::store::DocumentStore;
use crate::undo::{Delta, Position};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command: {name}")]
    UnknownCommand { line: usize, name: String },

    #[error("line {line}: invalid syntax: {message}")]
    InvalidSyntax { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move the cursor, dropping any selection.
    Goto(Position),
    /// Type text at the cursor, replacing the selection.
    Type(String),
    Enter,
    Backspace,
    Delete,
    Select { anchor: Position, head: Position },
    /// Delete the selection.
    Erase,
    /// Insert text that did not come from the user.
    External { at: Position, text: String },
    Undo,
    Redo,
    /// Mark the current state as saved without writing.
    Bookmark,
    Save,
    /// Forget undo history.
    Reset,
    /// Insert a completion for the selected text.
    Complete,
}

/// Collaborators a script may need while running.
#[derive(Clone, Copy)]
pub struct ScriptEnv<'a> {
    pub store: &'a dyn DocumentStore,
    pub completion: Option<&'a dyn CompletionService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<(usize, Command)>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut steps = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim_start();
            if trimmed.trim_end().is_empty() || trimmed.starts_with('#') {
                continue;
            }
            steps.push((line, parse_command(line, trimmed)?));
        }
        Ok(Self { steps })
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.steps.iter().map(|(_, command)| command)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every command against `session`, stopping at the first failure.
    pub fn run(&self, session: &mut Session, env: ScriptEnv<'_>) -> Result<()> {
        for (line, command) in &self.steps {
            debug!(line, ?command, "script step");
            execute(session, command, env)
                .with_context(|| format!("Script line {line} failed"))?;
        }
        Ok(())
    }
}

/// Apply a single command.
pub fn execute(session: &mut Session, command: &Command, env: ScriptEnv<'_>) -> Result<()> {
    match command {
        Command::Goto(pos) => session.move_to(*pos),
        Command::Type(text) => session.type_text(text),
        Command::Enter => session.enter(),
        Command::Backspace => session.backspace(),
        Command::Delete => session.delete_forward(),
        Command::Select { anchor, head } => session.select(*anchor, *head),
        Command::Erase => session.erase_selection(),
        Command::External { at, text } => session.apply_external(Delta::insert(*at, text))?,
        Command::Undo => {
            if session.undo().is_none() {
                debug!("nothing to undo");
            }
        }
        Command::Redo => {
            if session.redo().is_none() {
                debug!("nothing to redo");
            }
        }
        Command::Bookmark => session.bookmark(),
        Command::Save => session.save(env.store)?,
        Command::Reset => session.reset_history(),
        Command::Complete => {
            let Some(service) = env.completion else {
                anyhow::bail!("no completion command configured");
            };
            match session.complete(service) {
                Ok(()) => {}
                Err(CompletionError::NoSelection) => warn!("{}", CompletionError::NoSelection),
                Err(CompletionError::Service(err)) => return Err(err),
            }
        }
    }
    Ok(())
}

fn parse_command(line: usize, text: &str) -> Result<Command, ScriptError> {
    let (name, rest) = text
        .split_once(char::is_whitespace)
        .unwrap_or((text.trim_end(), ""));
    let invalid = |message: &str| ScriptError::InvalidSyntax {
        line,
        message: format!("{name}: {message}"),
    };
    let no_args = |command: Command| {
        if rest.trim().is_empty() {
            Ok(command)
        } else {
            Err(invalid("takes no arguments"))
        }
    };

    match name {
        "goto" => {
            let nums = parse_numbers(rest).ok_or_else(|| invalid("expected ROW COLUMN"))?;
            match nums[..] {
                [row, column] => Ok(Command::Goto(Position::new(row, column))),
                _ => Err(invalid("expected ROW COLUMN")),
            }
        }
        "select" => {
            let nums = parse_numbers(rest)
                .ok_or_else(|| invalid("expected ROW COLUMN ROW COLUMN"))?;
            match nums[..] {
                [r1, c1, r2, c2] => Ok(Command::Select {
                    anchor: Position::new(r1, c1),
                    head: Position::new(r2, c2),
                }),
                _ => Err(invalid("expected ROW COLUMN ROW COLUMN")),
            }
        }
        "type" => {
            let text = unescape(rest);
            if text.is_empty() {
                Err(invalid("expected text"))
            } else {
                Ok(Command::Type(text))
            }
        }
        "external" => {
            let mut parts = rest.trim_start().splitn(3, ' ');
            let row = parts.next().and_then(|s| s.parse().ok());
            let column = parts.next().and_then(|s| s.parse().ok());
            let text = parts.next().map(unescape).unwrap_or_default();
            match (row, column) {
                (Some(row), Some(column)) if !text.is_empty() => Ok(Command::External {
                    at: Position::new(row, column),
                    text,
                }),
                _ => Err(invalid("expected ROW COLUMN TEXT")),
            }
        }
        "enter" => no_args(Command::Enter),
        "backspace" => no_args(Command::Backspace),
        "delete" => no_args(Command::Delete),
        "erase" => no_args(Command::Erase),
        "undo" => no_args(Command::Undo),
        "redo" => no_args(Command::Redo),
        "bookmark" => no_args(Command::Bookmark),
        "save" => no_args(Command::Save),
        "reset" => no_args(Command::Reset),
        "complete" => no_args(Command::Complete),
        _ => Err(ScriptError::UnknownCommand {
            line,
            name: name.to_string(),
        }),
    }
}

fn parse_numbers(text: &str) -> Option<Vec<usize>> {
    text.split_whitespace().map(|s| s.parse().ok()).collect()
}

/// Expand `\n`, `\t` and `\\`. Other backslashes are kept as written.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
