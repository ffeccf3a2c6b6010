//! Protocol parameters extracted from the CCP/XCP section of an A2L file

use crate::catalog::numeric;
use crate::types::{ByteOrder, CanId, DaqError, Result};
use serde::{Deserialize, Serialize};

/// Transport and DAQ parameters of the target ECU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Protocol version string from the A2L (informational)
    #[serde(default)]
    pub version: Option<String>,

    /// Byte order of multi-byte command fields and ECU values
    #[serde(default)]
    pub byte_order: ByteOrder,

    /// True if the ECU communicates using CAN FD
    #[serde(default)]
    pub can_fd: bool,

    /// Maximum command transfer object size (bytes)
    #[serde(default = "default_max_to", deserialize_with = "numeric::hex_or_int")]
    pub max_cto: u16,

    /// Maximum data transfer object size (bytes)
    #[serde(default = "default_max_to", deserialize_with = "numeric::hex_or_int")]
    pub max_dto: u16,

    /// XCP: ECU supports WRITE_DAQ_MULTIPLE
    #[serde(default)]
    pub write_daq_multiple: bool,

    /// CCP: ECU can only address single-byte ODT entries
    #[serde(default)]
    pub bytes_only: bool,

    /// Identifier of command frames sent to the ECU
    #[serde(deserialize_with = "numeric::can_id")]
    pub can_id_master: CanId,

    /// Identifier of response frames sent by the ECU
    #[serde(deserialize_with = "numeric::can_id")]
    pub can_id_slave: CanId,

    /// Identifier of DAQ data frames (defaults to `can_id_slave`)
    #[serde(default, deserialize_with = "numeric::can_id_opt")]
    pub can_id_dto: Option<CanId>,

    /// CCP: station address used by CONNECT
    #[serde(default, deserialize_with = "numeric::hex_or_int")]
    pub ecu_station_address: u16,

    /// Arbitration phase bit rate
    #[serde(default = "default_baudrate", deserialize_with = "numeric::hex_or_int")]
    pub baudrate: u32,

    /// CAN FD data phase bit rate, if the ECU uses CAN FD
    #[serde(default, deserialize_with = "numeric::hex_or_int_opt")]
    pub can_fd_data_baudrate: Option<u32>,

    /// Event channels declared by the ECU
    #[serde(default)]
    pub events: Vec<EventChannel>,

    /// CCP: static DAQ lists with their ODT capacity and first PID
    #[serde(default)]
    pub daq_list_capacities: Vec<DaqListInfo>,
}

/// Transfer object limit of a classic CAN frame
const CLASSIC_FRAME_LEN: u16 = 8;
/// Transfer object limit of a CAN FD frame
const FD_FRAME_LEN: u16 = 64;

fn default_max_to() -> u16 {
    8
}

fn default_baudrate() -> u32 {
    500_000
}

/// An ECU event channel (XCP `EVENT`, CCP `RASTER`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChannel {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(deserialize_with = "numeric::hex_or_int")]
    pub channel: u16,

    /// XCP event priority; for CCP the raster scaler
    #[serde(default, alias = "scaler", deserialize_with = "numeric::hex_or_int")]
    pub priority: u8,
}

/// A CCP DAQ list as declared by the ECU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaqListInfo {
    #[serde(deserialize_with = "numeric::hex_or_int")]
    pub id: u16,

    /// Number of ODTs the list can hold
    #[serde(alias = "length", deserialize_with = "numeric::hex_or_int")]
    pub max_odts: u16,

    /// PID of the list's first ODT
    #[serde(deserialize_with = "numeric::hex_or_int")]
    pub first_pid: u8,
}

impl EventChannel {
    pub fn new(channel: u16, priority: u8) -> Self {
        Self {
            name: None,
            channel,
            priority,
        }
    }
}

impl DaqListInfo {
    pub fn new(id: u16, max_odts: u16, first_pid: u8) -> Self {
        Self {
            id,
            max_odts,
            first_pid,
        }
    }
}

impl ProtocolParams {
    /// Classic CAN parameters with 8-byte transfer objects
    pub fn new(can_id_master: CanId, can_id_slave: CanId) -> Self {
        Self {
            version: None,
            byte_order: ByteOrder::Little,
            can_fd: false,
            max_cto: default_max_to(),
            max_dto: default_max_to(),
            write_daq_multiple: false,
            bytes_only: false,
            can_id_master,
            can_id_slave,
            can_id_dto: None,
            ecu_station_address: 0,
            baudrate: default_baudrate(),
            can_fd_data_baudrate: None,
            events: Vec::new(),
            daq_list_capacities: Vec::new(),
        }
    }

    /// Builder method: set the byte order
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Builder method: switch to CAN FD with 64-byte transfer objects
    pub fn with_can_fd(mut self, data_baudrate: u32) -> Self {
        self.can_fd = true;
        self.max_cto = 64;
        self.max_dto = 64;
        self.write_daq_multiple = true;
        self.can_fd_data_baudrate = Some(data_baudrate);
        self
    }

    /// Builder method: set MAX_CTO and MAX_DTO
    pub fn with_transfer_sizes(mut self, max_cto: u16, max_dto: u16) -> Self {
        self.max_cto = max_cto;
        self.max_dto = max_dto;
        self
    }

    /// Builder method: add an event channel
    pub fn add_event(mut self, channel: u16, priority: u8) -> Self {
        self.events.push(EventChannel::new(channel, priority));
        self
    }

    /// Builder method: add a CCP DAQ list declaration
    pub fn add_daq_list(mut self, id: u16, max_odts: u16, first_pid: u8) -> Self {
        self.daq_list_capacities
            .push(DaqListInfo::new(id, max_odts, first_pid));
        self
    }

    /// Builder method: set the CCP station address
    pub fn with_station_address(mut self, address: u16) -> Self {
        self.ecu_station_address = address;
        self
    }

    /// Builder method: restrict CCP ODT entries to single bytes
    pub fn with_bytes_only(mut self, enabled: bool) -> Self {
        self.bytes_only = enabled;
        self
    }

    /// Check transfer object sizes against the CAN frame format
    ///
    /// MAX_CTO and MAX_DTO may not exceed 64 bytes, or 8 bytes without CAN FD.
    /// Commands need at least 8 bytes and a DTO must hold the PID plus one byte.
    pub fn validate(&self) -> Result<()> {
        let frame_len = if self.can_fd {
            FD_FRAME_LEN
        } else {
            CLASSIC_FRAME_LEN
        };

        for (field, value) in [("MAX_CTO", self.max_cto), ("MAX_DTO", self.max_dto)] {
            if value > frame_len {
                return Err(DaqError::InvalidParams(format!(
                    "{} of {} exceeds the {}-byte {} frame",
                    field,
                    value,
                    frame_len,
                    if self.can_fd { "CAN FD" } else { "classic CAN" }
                )));
            }
        }
        if self.max_cto < CLASSIC_FRAME_LEN {
            return Err(DaqError::InvalidParams(format!(
                "MAX_CTO of {} is shorter than an 8-byte command",
                self.max_cto
            )));
        }
        if self.max_dto < 2 {
            return Err(DaqError::InvalidParams(format!(
                "MAX_DTO of {} leaves no room after the PID",
                self.max_dto
            )));
        }
        Ok(())
    }

    /// MAX_CTO capped at the CAN FD frame size
    pub fn effective_max_cto(&self) -> u16 {
        self.max_cto.min(FD_FRAME_LEN)
    }

    /// MAX_DTO capped at the CAN FD frame size
    pub fn effective_max_dto(&self) -> u16 {
        self.max_dto.min(FD_FRAME_LEN)
    }

    /// True if XCP ODT entries are written with WRITE_DAQ_MULTIPLE
    pub fn uses_write_daq_multiple(&self) -> bool {
        self.can_fd && self.write_daq_multiple && self.effective_max_cto() == FD_FRAME_LEN
    }

    /// Bytes available for ODT entries after the 1-byte PID
    pub fn max_odt_payload(&self) -> usize {
        usize::from(self.effective_max_dto()).saturating_sub(1)
    }

    /// Identifier of DAQ data frames
    pub fn dto_id(&self) -> CanId {
        self.can_id_dto.unwrap_or(self.can_id_slave)
    }

    /// True if command or data frames exceed classic CAN length
    pub fn uses_fd_frames(&self) -> bool {
        self.max_cto > 8 || self.max_dto > 8
    }

    /// True if the data phase runs at a different bit rate than arbitration
    pub fn bit_rate_switch(&self) -> bool {
        matches!(self.can_fd_data_baudrate, Some(rate) if rate != self.baudrate)
    }

    pub fn event(&self, channel: u16) -> Option<&EventChannel> {
        self.events.iter().find(|e| e.channel == channel)
    }

    pub fn daq_list_info(&self, id: u16) -> Option<&DaqListInfo> {
        self.daq_list_capacities.iter().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_a2l_style_json() {
        let json = r#"{
            "byte_order": "big",
            "max_cto": "0x08",
            "max_dto": "0x0008",
            "can_id_master": "0x80000700",
            "can_id_slave": "0x701",
            "ecu_station_address": "0x0039",
            "bytes_only": true,
            "events": [{ "name": "10ms", "channel": "0x02", "scaler": "0x01" }],
            "daq_list_capacities": [{ "id": "0x0000", "length": "0x03", "first_pid": "0x00" }]
        }"#;

        let params: ProtocolParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.byte_order, ByteOrder::Big);
        assert_eq!(params.max_cto, 8);
        assert_eq!(params.can_id_master, CanId::extended(0x700));
        assert_eq!(params.can_id_slave, CanId::standard(0x701));
        assert_eq!(params.dto_id(), CanId::standard(0x701));
        assert_eq!(params.ecu_station_address, 0x39);
        assert_eq!(params.event(2).map(|e| e.priority), Some(1));
        assert_eq!(params.daq_list_info(0).map(|d| d.max_odts), Some(3));
        assert_eq!(params.baudrate, 500_000);
    }

    #[test]
    fn test_payload_and_fd_flags() {
        let classic = ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1));
        assert_eq!(classic.max_odt_payload(), 7);
        assert!(!classic.uses_fd_frames());
        assert!(!classic.bit_rate_switch());

        let fd = classic.clone().with_can_fd(2_000_000);
        assert_eq!(fd.max_odt_payload(), 63);
        assert!(fd.uses_fd_frames());
        assert!(fd.bit_rate_switch());

        let oversized = classic.with_transfer_sizes(8, 0x100);
        assert_eq!(oversized.max_odt_payload(), 63);
    }

    #[test]
    fn test_validate_transfer_sizes() {
        let classic = ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1));
        assert!(classic.validate().is_ok());
        assert!(classic.clone().with_can_fd(2_000_000).validate().is_ok());

        // 64-byte objects without CAN FD
        let wide = classic.clone().with_transfer_sizes(0x40, 0x40);
        assert!(matches!(wide.validate(), Err(DaqError::InvalidParams(_))));
        assert!(!wide.uses_write_daq_multiple());

        let mut fd = classic.clone().with_can_fd(2_000_000);
        fd.max_dto = 0x100;
        assert!(matches!(fd.validate(), Err(DaqError::InvalidParams(_))));

        assert!(classic.clone().with_transfer_sizes(4, 8).validate().is_err());
        assert!(classic.clone().with_transfer_sizes(8, 1).validate().is_err());
        assert!(classic.with_transfer_sizes(8, 2).validate().is_ok());
    }

    #[test]
    fn test_write_daq_multiple_needs_fd_and_support() {
        let fd = ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1))
            .with_can_fd(2_000_000);
        assert!(fd.uses_write_daq_multiple());

        let mut unsupported = fd.clone();
        unsupported.write_daq_multiple = false;
        assert!(!unsupported.uses_write_daq_multiple());

        let small_cto = fd.with_transfer_sizes(8, 64);
        assert!(!small_cto.uses_write_daq_multiple());
    }
}
