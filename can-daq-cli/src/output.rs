//! Output writers: CANedge transmit list JSON and DBC file

use anyhow::{Context, Result};
use can_daq_compiler::{FrameFormat, IdFormat, TransmitEntry, TransmitPlan};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One transmit list entry as the CANedge configuration expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransmitRecord {
    pub name: String,
    pub state: u8,
    pub id_format: u8,
    pub frame_format: u8,
    pub brs: u8,
    pub log: u8,
    pub period: u32,
    pub delay: u32,
    /// Upper-case hex without prefix
    pub id: String,
    pub data: String,
}

impl From<&TransmitEntry> for TransmitRecord {
    fn from(entry: &TransmitEntry) -> Self {
        Self {
            name: entry.name.clone(),
            state: 1,
            id_format: match entry.id_format {
                IdFormat::Standard => 0,
                IdFormat::Extended => 1,
            },
            frame_format: match entry.frame_format {
                FrameFormat::Classic => 0,
                FrameFormat::Fd => 1,
            },
            brs: u8::from(entry.bit_rate_switch),
            log: 1,
            period: 0,
            delay: entry.delay,
            id: format!("{:X}", entry.can_id),
            data: entry.payload_hex(),
        }
    }
}

#[derive(Serialize)]
struct TransmitDocument {
    can_1: TransmitSection,
}

#[derive(Serialize)]
struct TransmitSection {
    transmit: Vec<TransmitRecord>,
}

/// Render a transmit plan as the `can_1.transmit` JSON document
pub fn transmit_json(plan: &TransmitPlan) -> Result<String> {
    let document = TransmitDocument {
        can_1: TransmitSection {
            transmit: plan.entries.iter().map(TransmitRecord::from).collect(),
        },
    };
    serde_json::to_string_pretty(&document).context("Failed to serialize transmit list")
}

/// Write the transmit list; the extension is forced to `.json`
pub fn write_transmit_list(path: &Path, plan: &TransmitPlan) -> Result<PathBuf> {
    let path = path.with_extension("json");
    let json = transmit_json(plan)?;
    write_file(&path, &json)?;
    log::info!(
        "Created transmit list JSON with {} frames: {:?}",
        plan.len(),
        path
    );
    Ok(path)
}

/// Write DBC text; the extension is forced to `.dbc`
pub fn write_dbc(path: &Path, dbc: &str) -> Result<PathBuf> {
    let path = path.with_extension("dbc");
    write_file(&path, dbc)?;
    log::info!("Created DBC file: {:?}", path);
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write output file: {:?}", path))
}
