//! Decode layout generator
//!
//! Derives the multiplexed decode table of the DTO frame from the same
//! [`Grouping`] the encoders consume. Byte 0 of every DTO carries the PID,
//! which acts as the multiplexor; ODT entries follow back to back from byte 1
//! in the order they were written to the ECU.

use crate::catalog::{ProtocolParams, Signedness};
use crate::grouping::{DaqListView, Grouping};
use crate::types::{ByteOrder, CanId, Capacity, DaqError, Protocol, Result};
use serde::Serialize;

pub mod dbc;

pub use dbc::format_number;

/// First bit after the PID byte
const PAYLOAD_START_BIT: u16 = 8;
const MAX_PID: u16 = 0xFF;

/// Decode information for one signal of the DTO frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeRow {
    pub name: String,
    pub long_identifier: Option<String>,
    pub daq_list_id: u16,
    pub odt_id: u16,
    /// PID of the ODT carrying this signal
    pub multiplexor_value: u8,
    /// DBC start bit (MSB for big endian, LSB for little endian)
    pub start_bit: u16,
    pub bit_length: u16,
    pub byte_order: ByteOrder,
    pub signedness: Signedness,
    pub scale: f64,
    pub offset: f64,
    pub unit: String,
    pub lower_limit: f64,
    pub upper_limit: f64,
}

impl DecodeRow {
    /// First payload bit occupied by the row, counted LSB-first from bit 0
    pub fn first_bit(&self) -> u16 {
        match self.byte_order {
            ByteOrder::Little => self.start_bit,
            ByteOrder::Big => self.start_bit - 7,
        }
    }
}

/// Multiplexed decode table of the DTO frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeTable {
    pub protocol: Protocol,
    /// Identifier of the DTO frame
    pub can_id: CanId,
    /// True if the DTO is a 64-byte CAN FD frame
    pub fd: bool,
    pub byte_order: ByteOrder,
    pub rows: Vec<DecodeRow>,
}

impl DecodeTable {
    /// Frame length declared for the DTO
    pub fn dlc(&self) -> u8 {
        if self.fd {
            64
        } else {
            8
        }
    }
}

/// Build the decode table for a grouping
///
/// XCP PIDs count ODTs globally from 0. CCP PIDs restart at each DAQ list's
/// declared first PID.
pub fn layout(grouping: &Grouping, params: &ProtocolParams) -> Result<DecodeTable> {
    let protocol = grouping.protocol();
    let mut rows = Vec::with_capacity(grouping.len());
    let mut pid: u16 = 0;

    for list in grouping.daq_lists() {
        if protocol == Protocol::Ccp {
            match params.daq_list_info(list.id) {
                Some(info) => pid = u16::from(info.first_pid),
                None => log::warn!(
                    "No first PID declared for CCP DAQ list {}, continuing at PID {}",
                    list.id,
                    pid
                ),
            }
        }
        pid = layout_daq_list(&list, pid, params.byte_order, &mut rows)?;
    }

    log::info!("Generated {} decode rows", rows.len());
    Ok(DecodeTable {
        protocol,
        can_id: params.dto_id(),
        fd: params.uses_fd_frames(),
        byte_order: params.byte_order,
        rows,
    })
}

/// Lay out one DAQ list starting at `pid`; returns the next PID
fn layout_daq_list(
    list: &DaqListView<'_>,
    mut pid: u16,
    byte_order: ByteOrder,
    rows: &mut Vec<DecodeRow>,
) -> Result<u16> {
    for odt in &list.odts {
        if pid > MAX_PID {
            return Err(DaqError::capacity(
                Capacity::PidRange,
                usize::from(pid),
                usize::from(MAX_PID),
            ));
        }
        let multiplexor_value = pid as u8;

        let mut cursor = PAYLOAD_START_BIT;
        for entry in odt.iter() {
            let signal = &entry.signal;
            let bit_length = u16::from(signal.length_bytes) * 8;
            let start_bit = match byte_order {
                ByteOrder::Little => cursor,
                ByteOrder::Big => cursor + 7,
            };

            rows.push(DecodeRow {
                name: signal.name.clone(),
                long_identifier: signal.long_identifier.clone(),
                daq_list_id: entry.daq_list_id,
                odt_id: entry.odt_id,
                multiplexor_value,
                start_bit,
                bit_length,
                byte_order,
                signedness: signal.signedness,
                scale: signal.scale,
                offset: signal.offset,
                unit: signal.unit.clone(),
                lower_limit: signal.lower_limit,
                upper_limit: signal.upper_limit,
            });
            cursor += bit_length;
        }
        pid += 1;
    }
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Signal;
    use crate::grouping::group;

    fn params() -> ProtocolParams {
        ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1))
    }

    fn sig(name: &str, length: u8, channel: u16) -> Signal {
        Signal::new(name, 0x1000, Signedness::Unsigned, length, channel)
    }

    #[test]
    fn test_xcp_global_pids() {
        let signals = vec![sig("a", 4, 1), sig("b", 4, 1), sig("c", 2, 2), sig("d", 1, 2)];
        let grouping = group(&signals, &params(), Protocol::Xcp).unwrap();
        let table = layout(&grouping, &params()).unwrap();

        let pids: Vec<(&str, u8)> = table
            .rows
            .iter()
            .map(|r| (r.name.as_str(), r.multiplexor_value))
            .collect();
        assert_eq!(pids, vec![("a", 0), ("b", 1), ("c", 2), ("d", 2)]);
        assert_eq!(table.rows[3].start_bit, 24);
        assert_eq!(table.can_id, CanId::standard(0x7E1));
        assert_eq!(table.dlc(), 8);
    }

    #[test]
    fn test_ccp_pids_restart_per_list() {
        let params = params().add_daq_list(0, 3, 0x00).add_daq_list(1, 3, 0x10);
        let signals = vec![sig("a", 4, 1), sig("b", 4, 1), sig("c", 4, 2)];
        let grouping = group(&signals, &params, Protocol::Ccp).unwrap();
        let table = layout(&grouping, &params).unwrap();

        let pids: Vec<u8> = table.rows.iter().map(|r| r.multiplexor_value).collect();
        assert_eq!(pids, vec![0x00, 0x01, 0x10]);
    }

    #[test]
    fn test_ccp_without_metadata_continues() {
        let params = params().add_daq_list(0, 3, 0x04);
        let signals = vec![sig("a", 4, 1), sig("b", 4, 2)];
        let grouping = group(&signals, &params, Protocol::Ccp).unwrap();
        let table = layout(&grouping, &params).unwrap();

        let pids: Vec<u8> = table.rows.iter().map(|r| r.multiplexor_value).collect();
        assert_eq!(pids, vec![0x04, 0x05]);
    }

    #[test]
    fn test_big_endian_start_bits() {
        let params = params().with_byte_order(ByteOrder::Big);
        let signals = vec![sig("a", 1, 1), sig("b", 2, 1), sig("c", 4, 1)];
        let grouping = group(&signals, &params, Protocol::Xcp).unwrap();
        let table = layout(&grouping, &params).unwrap();

        let bits: Vec<(u16, u16)> = table.rows.iter().map(|r| (r.start_bit, r.bit_length)).collect();
        assert_eq!(bits, vec![(15, 8), (23, 16), (39, 32)]);
        assert_eq!(table.rows[2].first_bit(), 32);
    }

    #[test]
    fn test_pid_overflow() {
        // 257 single-byte ODTs in one list
        let params = params().with_transfer_sizes(8, 2);
        let signals: Vec<Signal> = (0..257).map(|i| sig(&format!("s{}", i), 1, 1)).collect();
        let grouping = group(&signals, &params, Protocol::Xcp).unwrap();
        assert!(matches!(
            layout(&grouping, &params),
            Err(DaqError::CapacityExceeded {
                resource: Capacity::PidRange,
                ..
            })
        ));
    }
}
