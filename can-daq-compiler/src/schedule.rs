//! Transmit schedule builder
//!
//! Wraps command frames into a timed transmit list and enforces the device's
//! frame and byte budgets. A plan over budget is never returned.

use crate::catalog::ProtocolParams;
use crate::config::ScheduleConfig;
use crate::encoder::{to_hex, CommandFrame};
use crate::types::{Capacity, CanId, DaqError, Result};
use serde::Serialize;

/// Payloads longer than this require a CAN FD frame
const CLASSIC_MAX_DLC: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdFormat {
    Standard,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    Classic,
    Fd,
}

/// A command frame with its transmission metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransmitEntry {
    pub name: String,
    pub can_id: u32,
    pub id_format: IdFormat,
    pub frame_format: FrameFormat,
    pub bit_rate_switch: bool,
    /// Delay from logger start (ms)
    pub delay: u32,
    pub payload: Vec<u8>,
}

impl TransmitEntry {
    pub fn payload_hex(&self) -> String {
        to_hex(&self.payload)
    }
}

/// The complete transmit list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransmitPlan {
    pub entries: Vec<TransmitEntry>,
    pub total_bytes: usize,
}

impl TransmitPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Assign delays, identifiers and frame formats to command frames
pub fn schedule(
    frames: &[CommandFrame],
    params: &ProtocolParams,
    config: &ScheduleConfig,
) -> Result<TransmitPlan> {
    let master: CanId = params.can_id_master;
    let id_format = if master.extended {
        IdFormat::Extended
    } else {
        IdFormat::Standard
    };
    let brs = params.bit_rate_switch();

    let mut entries = Vec::with_capacity(frames.len());
    let mut total_bytes = 0usize;
    let mut delay = config.start_delay_ms;

    for frame in frames {
        let frame_format = if frame.len() > CLASSIC_MAX_DLC || brs {
            FrameFormat::Fd
        } else {
            FrameFormat::Classic
        };
        total_bytes += frame.len();

        entries.push(TransmitEntry {
            name: frame.name.clone(),
            can_id: master.id,
            id_format,
            frame_format,
            bit_rate_switch: brs,
            delay,
            payload: frame.payload.clone(),
        });
        delay = delay.saturating_add(config.frame_spacing_ms);
    }

    if entries.len() > config.max_frames {
        log::error!(
            "Transmit list contains {} frames, exceeding the limit of {} frames",
            entries.len(),
            config.max_frames
        );
        return Err(DaqError::capacity(
            Capacity::TransmitFrames,
            entries.len(),
            config.max_frames,
        ));
    }
    if total_bytes > config.max_data_bytes {
        log::error!(
            "Transmit list uses {} data bytes, exceeding the limit of {} bytes",
            total_bytes,
            config.max_data_bytes
        );
        return Err(DaqError::capacity(
            Capacity::TransmitBytes,
            total_bytes,
            config.max_data_bytes,
        ));
    }

    log::info!(
        "Scheduled {} frames ({} data bytes) on {}",
        entries.len(),
        total_bytes,
        master
    );
    Ok(TransmitPlan {
        entries,
        total_bytes,
    })
}
