use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub undo_depth: Option<usize>,
    pub keep_redo: bool,
    pub no_select: bool,
    pub log_file: Option<PathBuf>,
    pub completion_cmd: Option<String>,
}

impl ConfigFlags {
    /// Merge two flag sets. Switches are or-ed; for options `other` wins.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            undo_depth: other.undo_depth.or(self.undo_depth),
            keep_redo: self.keep_redo || other.keep_redo,
            no_select: self.no_select || other.no_select,
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
            completion_cmd: other
                .completion_cmd
                .clone()
                .or_else(|| self.completion_cmd.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("mdrewind").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("mdrewind")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("mdrewind").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("mdrewind")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".mdrewindrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let mut tokens = Vec::new();
    let mut completion_cmd = None;
    for line in content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
    {
        // A command line keeps its spaces: the rest of the line is the value.
        if let Some(rest) = line.strip_prefix("--completion-cmd") {
            let cmd = rest.trim_start_matches('=').trim();
            if !cmd.is_empty() {
                completion_cmd = Some(cmd.to_string());
            }
            continue;
        }
        tokens.extend(line.split_whitespace().map(ToOwned::to_owned));
    }
    let mut flags = parse_flag_tokens(&tokens);
    flags.completion_cmd = completion_cmd;
    Ok(flags)
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# mdrewind defaults (saved with --save)".to_string()];
    if let Some(depth) = flags.undo_depth {
        lines.push(format!("--undo-depth {depth}"));
    }
    if flags.keep_redo {
        lines.push("--keep-redo".to_string());
    }
    if flags.no_select {
        lines.push("--no-select".to_string());
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(cmd) = &flags.completion_cmd {
        lines.push(format!("--completion-cmd {cmd}"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the flags this module knows about out of a token list.
///
/// Unknown tokens are skipped, so raw `argv` can be passed in directly.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--keep-redo" => flags.keep_redo = true,
            "--no-select" => flags.no_select = true,
            "--undo-depth" | "--log-file" | "--completion-cmd" => {
                if let Some(next) = tokens.get(i + 1) {
                    apply_option(&mut flags, token, next);
                    i += 1;
                }
            }
            _ => {
                if let Some((name, value)) = token.split_once('=') {
                    apply_option(&mut flags, name, value);
                }
            }
        }
        i += 1;
    }
    flags
}

fn apply_option(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--undo-depth" => flags.undo_depth = value.parse().ok(),
        "--log-file" => flags.log_file = Some(PathBuf::from(value)),
        "--completion-cmd" => flags.completion_cmd = Some(value.to_string()),
        _ => {}
    }
}
