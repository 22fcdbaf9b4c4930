use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Folder layout of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunPaths {
    pub base: PathBuf,
    pub raw_input: PathBuf,
    pub percentiles: PathBuf,
    pub outputs: PathBuf,
    pub logs: PathBuf,
}

impl RunPaths {
    /// Folder name of the run, used to prefix output documents.
    pub fn name(&self) -> String {
        self.base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".into())
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`, collapsing repeats.
pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.trim().chars() {
        let keep = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-');
        let next = if keep { ch } else { '_' };
        if next == '_' && out.ends_with('_') {
            continue;
        }
        out.push(next);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "output".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn run_folder_name(title: Option<&str>, default_title: &str, today: NaiveDate) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => sanitize_filename(title),
        None => format!(
            "{}__{}",
            today.format("%m-%d-%y"),
            sanitize_filename(default_title)
        ),
    }
}

pub fn create_run_folder(
    base_dir: &Path,
    title: Option<&str>,
    default_title: &str,
    today: NaiveDate,
) -> io::Result<RunPaths> {
    let base = base_dir.join(run_folder_name(title, default_title, today));
    let paths = RunPaths {
        raw_input: base.join("01_raw_input"),
        percentiles: base.join("02_percentiles"),
        outputs: base.join("03_outputs"),
        logs: base.join("logs"),
        base,
    };
    for dir in [&paths.raw_input, &paths.percentiles, &paths.outputs, &paths.logs] {
        fs::create_dir_all(dir)?;
    }
    Ok(paths)
}
