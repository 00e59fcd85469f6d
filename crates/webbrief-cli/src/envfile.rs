//! `.env` loading at startup.
//!
//! Reads `WEBBRIEF_ENV_FILE` if set, otherwise `./.env` when present.
//! Variables already in the process environment always win, and values are
//! never logged. `WEBBRIEF_DOTENV=0` turns the whole thing off.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub path: PathBuf,
    /// Keys that were set from the file.
    pub set: Vec<String>,
    /// Keys present in the file but already set in the environment.
    pub skipped_existing: usize,
}

fn dotenv_disabled() -> bool {
    matches!(
        std::env::var("WEBBRIEF_DOTENV")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn strip_quotes(v: &str) -> &str {
    for q in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

/// `KEY=VALUE` pairs in file order. Blank lines, `#` comments, an optional
/// `export ` prefix and matching surrounding quotes are handled; malformed
/// lines are skipped.
pub fn parse(txt: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let s = s.strip_prefix("export ").unwrap_or(s);
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() || k.chars().any(char::is_whitespace) {
            continue;
        }
        out.push((k.to_string(), strip_quotes(v.trim()).to_string()));
    }
    out
}

/// Apply one file's pairs without overriding the existing environment.
pub fn load_from(path: &Path) -> std::io::Result<LoadReport> {
    let txt = std::fs::read_to_string(path)?;
    let mut report = LoadReport {
        path: path.to_path_buf(),
        set: Vec::new(),
        skipped_existing: 0,
    };
    for (k, v) in parse(&txt) {
        if std::env::var_os(&k).is_some() {
            report.skipped_existing += 1;
            continue;
        }
        std::env::set_var(&k, v);
        report.set.push(k);
    }
    Ok(report)
}

/// Startup entry point; `None` when disabled, absent or unreadable.
pub fn load() -> Option<LoadReport> {
    if dotenv_disabled() {
        return None;
    }
    let explicit = std::env::var("WEBBRIEF_ENV_FILE")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let path = PathBuf::from(explicit.as_deref().unwrap_or(".env"));
    if explicit.is_none() && !path.exists() {
        return None;
    }
    match load_from(&path) {
        Ok(report) => Some(report),
        Err(e) => {
            // Logging is not initialised yet; this is the one place we write directly.
            eprintln!("webbrief: could not read env file {}: {e}", path.display());
            None
        }
    }
}
