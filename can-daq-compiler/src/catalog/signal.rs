//! Measurement signals ready for grouping

use crate::catalog::params::ProtocolParams;
use crate::types::{DaqError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric interpretation of a signal's raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signedness {
    Unsigned,
    Signed,
    /// IEEE 754 single precision
    Float,
    /// IEEE 754 double precision
    Double,
    Unknown,
}

impl Signedness {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, Signedness::Unsigned)
    }
}

impl fmt::Display for Signedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signedness::Unsigned => write!(f, "unsigned"),
            Signedness::Signed => write!(f, "signed"),
            Signedness::Float => write!(f, "float"),
            Signedness::Double => write!(f, "double"),
            Signedness::Unknown => write!(f, "unknown"),
        }
    }
}

/// Map an A2L datatype keyword to its signedness and byte length
///
/// Unknown keywords map to `(Unknown, 0)` so that validation drops them.
pub fn datatype_info(keyword: &str) -> (Signedness, u8) {
    match keyword.trim().to_ascii_lowercase().as_str() {
        "uchar" | "ubyte" => (Signedness::Unsigned, 1),
        "schar" | "sbyte" | "char" => (Signedness::Signed, 1),
        "uword" | "uint" => (Signedness::Unsigned, 2),
        "sword" | "int" => (Signedness::Signed, 2),
        "ulong" => (Signedness::Unsigned, 4),
        "slong" | "long" => (Signedness::Signed, 4),
        "a_uint64" => (Signedness::Unsigned, 8),
        "a_int64" => (Signedness::Signed, 8),
        "float" | "float32_ieee" => (Signedness::Float, 4),
        "float64_ieee" => (Signedness::Double, 8),
        _ => (Signedness::Unknown, 0),
    }
}

/// A measurement signal with the event channel the user requested for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    /// A2L long identifier (used for the DBC comment)
    #[serde(default)]
    pub long_identifier: Option<String>,
    /// ECU address, written to the ECU in the configured byte order
    pub ecu_address: u32,
    /// Size in bytes (1, 2, 4 or 8)
    pub length_bytes: u8,
    pub signedness: Signedness,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub lower_limit: f64,
    #[serde(default)]
    pub upper_limit: f64,
    /// Requested event channel number
    pub event_channel: u16,
}

fn default_scale() -> f64 {
    1.0
}

impl Signal {
    /// Create a signal with identity scaling, no unit and zero limits
    pub fn new(
        name: impl Into<String>,
        ecu_address: u32,
        signedness: Signedness,
        length_bytes: u8,
        event_channel: u16,
    ) -> Self {
        Self {
            name: name.into(),
            long_identifier: None,
            ecu_address,
            length_bytes,
            signedness,
            scale: default_scale(),
            offset: 0.0,
            unit: String::new(),
            lower_limit: 0.0,
            upper_limit: 0.0,
            event_channel,
        }
    }

    /// Builder method: set scale, offset and unit
    pub fn with_scaling(mut self, scale: f64, offset: f64, unit: impl Into<String>) -> Self {
        self.scale = scale;
        self.offset = offset;
        self.unit = unit.into();
        self
    }

    /// Builder method: set physical limits
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.lower_limit = lower;
        self.upper_limit = upper;
        self
    }

    /// Builder method: set the long identifier
    pub fn with_long_identifier(mut self, text: impl Into<String>) -> Self {
        self.long_identifier = Some(text.into());
        self
    }

    /// Check that the signal fits an ODT behind the 1-byte PID
    ///
    /// With MAX_DTO 8 only 7 bytes follow the PID, so 8-byte signals are
    /// rejected.
    pub fn validate(&self, params: &ProtocolParams) -> Result<()> {
        if self.length_bytes == 0 {
            return Err(DaqError::InvalidSignal {
                name: self.name.clone(),
                reason: "length of 0".to_string(),
            });
        }
        let max_payload = params.max_odt_payload();
        if usize::from(self.length_bytes) > max_payload {
            return Err(DaqError::InvalidSignal {
                name: self.name.clone(),
                reason: format!(
                    "length of {} with MAX_DTO {} (MAX_ODT_ENTRY_SIZE_DAQ is {})",
                    self.length_bytes,
                    params.effective_max_dto(),
                    max_payload
                ),
            });
        }
        Ok(())
    }
}
