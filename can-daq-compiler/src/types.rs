//! Core types for the DAQ configuration compiler
//!
//! This module defines the protocol tags, CAN identifier handling and the error
//! type shared by every stage of the compiler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, DaqError>;

/// Measurement protocol spoken by the ECU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// CAN Calibration Protocol (CCP 2.1)
    Ccp,
    /// Universal Measurement and Calibration Protocol on CAN (XCP)
    Xcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ccp => write!(f, "CCP"),
            Protocol::Xcp => write!(f, "XCP"),
        }
    }
}

/// Byte order used by the ECU for multi-byte command fields and measurement values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Intel format (least significant byte first)
    #[default]
    Little,
    /// Motorola format (most significant byte first)
    Big,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
        }
    }
}

/// A CAN identifier together with its frame format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanId {
    /// 11-bit or 29-bit identifier (no flag bits)
    pub id: u32,
    /// True if this is an extended (29-bit) identifier
    #[serde(default)]
    pub extended: bool,
}

impl CanId {
    /// Flag used by A2L and DBC files to mark extended identifiers
    pub const EXTENDED_FLAG: u32 = 0x8000_0000;

    pub fn standard(id: u32) -> Self {
        Self {
            id: id & 0x7FF,
            extended: false,
        }
    }

    pub fn extended(id: u32) -> Self {
        Self {
            id: id & 0x1FFF_FFFF,
            extended: true,
        }
    }

    /// Interpret a raw 32-bit identifier where bit 31 marks an extended id
    pub fn from_raw(raw: u32) -> Self {
        if raw & Self::EXTENDED_FLAG != 0 {
            Self::extended(raw)
        } else {
            Self::standard(raw)
        }
    }

    /// Identifier with bit 31 set for extended ids (CCP DTO field, DBC message id)
    pub fn to_raw(&self) -> u32 {
        if self.extended {
            self.id | Self::EXTENDED_FLAG
        } else {
            self.id
        }
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "0x{:08X}x", self.id)
        } else {
            write!(f, "0x{:03X}", self.id)
        }
    }
}

/// The resource whose limit was breached by a `CapacityExceeded` error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capacity {
    /// ODTs assigned to one CCP DAQ list versus its declared length
    OdtsPerDaqList { daq_list: u16 },
    /// Frames in the transmit list versus the device limit
    TransmitFrames,
    /// Cumulative payload bytes in the transmit list versus the device limit
    TransmitBytes,
    /// PID values versus the 1-byte multiplexor
    PidRange,
    /// A command field too narrow for the value it must carry
    CommandField { field: &'static str },
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::OdtsPerDaqList { daq_list } => {
                write!(f, "ODT count of DAQ list 0x{:04X}", daq_list)
            }
            Capacity::TransmitFrames => write!(f, "transmit list frame count"),
            Capacity::TransmitBytes => write!(f, "transmit list data bytes"),
            Capacity::PidRange => write!(f, "PID range"),
            Capacity::CommandField { field } => write!(f, "command field '{}'", field),
        }
    }
}

/// Errors that can occur while compiling a DAQ configuration
#[derive(Debug, thiserror::Error)]
pub enum DaqError {
    #[error("No matched signals to group")]
    EmptyInput,

    #[error("{resource} exceeded: {used} used, limit is {limit}")]
    CapacityExceeded {
        resource: Capacity,
        used: usize,
        limit: usize,
    },

    #[error("Invalid signal '{name}': {reason}")]
    InvalidSignal { name: String, reason: String },

    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("Invalid protocol parameters: {0}")]
    InvalidParams(String),
}

impl DaqError {
    pub(crate) fn capacity(resource: Capacity, used: usize, limit: usize) -> Self {
        DaqError::CapacityExceeded {
            resource,
            used,
            limit,
        }
    }
}

/// Narrow a value into a single command byte
pub(crate) fn command_byte(value: usize, field: &'static str) -> Result<u8> {
    u8::try_from(value).map_err(|_| DaqError::capacity(Capacity::CommandField { field }, value, 0xFF))
}

/// Narrow a value into a 16-bit command word
pub(crate) fn command_word(value: usize, field: &'static str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| DaqError::capacity(Capacity::CommandField { field }, value, 0xFFFF))
}
