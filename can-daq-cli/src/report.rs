//! Match reporting: status CSV next to the selection file and the summary line

use anyhow::{Context, Result};
use can_daq_compiler::{Selected, Selection};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const STATUS_HEADER: &str = "Signal Name;Event Channel;Match Status";

/// Requested / available / matched signal counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSummary {
    pub requested: usize,
    pub available: usize,
    pub matched: usize,
}

impl MatchSummary {
    /// Matched share of the requested signals, rounded down
    pub fn percent(&self) -> usize {
        if self.requested == 0 {
            0
        } else {
            self.matched * 100 / self.requested
        }
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Requested signals: {} | Available signals: {} | Matched signals: {} ({}%)",
            self.requested,
            self.available,
            self.matched,
            self.percent()
        )
    }
}

/// `<dir>/<stem>_status.csv` for a selection file
pub fn status_path(signal_file: &Path) -> PathBuf {
    let stem = signal_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("signals");
    signal_file.with_file_name(format!("{}_status.csv", stem))
}

/// Status CSV text: unmatched rows first, then matched rows
pub fn status_csv(selection: &Selection, selected: &Selected) -> String {
    let (matched, unmatched): (Vec<_>, Vec<_>) = selection
        .entries()
        .iter()
        .partition(|entry| selected.is_matched(&entry.name));

    let mut lines = vec![STATUS_HEADER.to_string()];
    for entry in &unmatched {
        lines.push(format!("{};{};Not Matched", entry.name, entry.event));
    }
    for entry in &matched {
        lines.push(format!("{};{};Matched", entry.name, entry.event));
    }
    lines.push(String::new());
    lines.join("\n")
}

/// Write the status CSV next to the selection file
pub fn write_status_csv(
    signal_file: &Path,
    selection: &Selection,
    selected: &Selected,
) -> Result<PathBuf> {
    let path = status_path(signal_file);
    fs::write(&path, status_csv(selection, selected))
        .with_context(|| format!("Failed to write status file: {:?}", path))?;
    log::info!("Created status CSV file: {:?}", path);
    Ok(path)
}
