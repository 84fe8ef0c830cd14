//! mdrewind - replay edit scripts against a markdown file with OT undo/redo.
//!
//! # Usage
//!
//! ```bash
//! mdrewind notes.md --script edits.txt
//! mdrewind notes.md --script edits.txt --write
//! mdrewind notes.md --script edits.txt --history --keep-redo
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use mdrewind::completion::{CommandCompletion, CompletionService};
use mdrewind::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use mdrewind::editor::Session;
use mdrewind::script::{Script, ScriptEnv};
use mdrewind::store::{DocumentStore, FileStore};
use mdrewind::undo::{DeltaSet, Revision};

/// Replay edit scripts against a markdown file with OT undo/redo
#[derive(Parser, Debug)]
#[command(name = "mdrewind", version, about, long_about = None)]
struct Cli {
    /// Markdown file to edit
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Edit script to run against the file
    #[arg(short, long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Write the result back to FILE instead of printing it
    #[arg(short, long)]
    write: bool,

    /// Print the undo and redo stacks as JSON
    #[arg(long)]
    history: bool,

    /// Keep at most N undo steps
    #[arg(long, value_name = "N")]
    undo_depth: Option<usize>,

    /// Keep the redo stack when typing after an undo
    #[arg(long)]
    keep_redo: bool,

    /// Do not select the affected text after undo/redo
    #[arg(long)]
    no_select: bool,

    /// Command that answers completion requests (JSON on stdin)
    #[arg(long, value_name = "CMD")]
    completion_cmd: Option<String>,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

impl Cli {
    fn config_flags(&self) -> ConfigFlags {
        ConfigFlags {
            undo_depth: self.undo_depth,
            keep_redo: self.keep_redo,
            no_select: self.no_select,
            log_file: self.log_file.clone(),
            completion_cmd: self.completion_cmd.clone(),
        }
    }
}

#[derive(Serialize)]
struct HistoryDump<'a> {
    revision: Revision,
    saved: bool,
    undo: &'a [DeltaSet],
    redo: &'a [DeltaSet],
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.with_writer(Mutex::new(file)).with_ansi(false).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.config_flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    init_logging(cli.verbose, effective.log_file.as_deref())?;

    let store = FileStore::new(&cli.file);
    if !cli.file.exists() {
        if !cli.write {
            anyhow::bail!("File not found: {}", cli.file.display());
        }
        store.create()?;
    }

    let mut session = Session::open(&store)?
        .with_undo_depth(effective.undo_depth)
        .with_keep_redo(effective.keep_redo)
        .with_select_on_replay(!effective.no_select);

    let completion = effective
        .completion_cmd
        .as_deref()
        .and_then(CommandCompletion::from_command_line);

    if let Some(path) = &cli.script {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let script = Script::parse(&text)?;
        let env = ScriptEnv {
            store: &store,
            completion: completion.as_ref().map(|c| c as &dyn CompletionService),
        };
        script.run(&mut session, env)?;
    }

    if cli.write {
        session.save(&store)?;
    } else {
        print!("{}", session.text());
    }

    let buttons = session.button_state();
    eprintln!(
        "revision {} | {} | undo {} | redo {}",
        session.history().revision(),
        if buttons.save { "modified" } else { "saved" },
        session.history().undo_stack().len(),
        session.history().redo_stack().len(),
    );

    if cli.history {
        let dump = HistoryDump {
            revision: session.history().revision(),
            saved: session.is_saved(),
            undo: session.history().undo_stack(),
            redo: session.history().redo_stack(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&dump).context("Failed to serialize history")?
        );
    }

    Ok(())
}
