//! Catalog measurements as extracted from A2L `MEASUREMENT` blocks
//!
//! A measurement becomes a [`Signal`] once the user has selected it and
//! assigned an event channel. Matrix measurements are expanded into scalar
//! measurements first.

use crate::catalog::numeric;
use crate::catalog::signal::{datatype_info, Signal, Signedness};
use crate::types::{DaqError, Result};
use serde::{Deserialize, Serialize};

/// Computation method attached to a measurement (A2L `COMPU_METHOD`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conversion {
    /// `phys = a * raw + b`
    Linear { a: f64, b: f64 },
    /// `raw = (a*phys^2 + b*phys + c) / (d*phys^2 + e*phys + f)`
    RatFunc {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    },
    /// No conversion
    Identical,
}

impl Conversion {
    /// Scale and offset of the linear form, if the method has one
    pub fn scale_offset(&self) -> Option<(f64, f64)> {
        let (scale, offset) = match *self {
            Conversion::Linear { a, b } => (a, b),
            Conversion::RatFunc { a, b, c, d, e, f } => {
                if a != 0.0 || d != 0.0 || e != 0.0 {
                    return None;
                }
                if b == 0.0 {
                    (0.0, 0.0)
                } else {
                    (f / b, -c / b)
                }
            }
            Conversion::Identical => (1.0, 0.0),
        };
        // -0.0 would otherwise be rendered as "-0"
        let offset = if offset == 0.0 { 0.0 } else { offset };
        Some((scale, offset))
    }
}

/// A measurement from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    #[serde(default)]
    pub long_identifier: Option<String>,
    /// A2L datatype keyword (`UWORD`, `FLOAT32_IEEE`, ...)
    pub datatype: String,
    #[serde(default, deserialize_with = "numeric::hex_or_int_opt")]
    pub ecu_address: Option<u32>,
    #[serde(default)]
    pub lower_limit: f64,
    #[serde(default)]
    pub upper_limit: f64,
    #[serde(default)]
    pub conversion: Option<Conversion>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Number of elements for array measurements (0 for scalars)
    #[serde(default, deserialize_with = "numeric::hex_or_int")]
    pub matrix_dim: u32,
}

impl Measurement {
    pub fn new(name: impl Into<String>, datatype: impl Into<String>, ecu_address: u32) -> Self {
        Self {
            name: name.into(),
            long_identifier: None,
            datatype: datatype.into(),
            ecu_address: Some(ecu_address),
            lower_limit: 0.0,
            upper_limit: 0.0,
            conversion: None,
            unit: None,
            matrix_dim: 0,
        }
    }

    /// Signedness and byte length of a single element
    pub fn element_type(&self) -> (Signedness, u8) {
        datatype_info(&self.datatype)
    }

    /// Expand an array measurement into `{name}_MX_{i}` scalar measurements
    pub fn expand_matrix(&self) -> Vec<Measurement> {
        if self.matrix_dim == 0 {
            return vec![self.clone()];
        }
        let Some(base_address) = self.ecu_address else {
            log::warn!(
                "Matrix signal {} has no ECU_ADDRESS, skipping expansion",
                self.name
            );
            return vec![self.clone()];
        };
        let (_, length) = self.element_type();

        (0..self.matrix_dim)
            .map(|index| {
                let mut element = self.clone();
                element.name = format!("{}_MX_{}", self.name, index);
                element.ecu_address =
                    Some(base_address.wrapping_add(index * u32::from(length)));
                element.matrix_dim = 0;
                element
            })
            .collect()
    }

    /// Build a signal assigned to the given event channel
    ///
    /// Scale/offset/unit default to 1/0/"" when no linear conversion exists.
    pub fn to_signal(&self, event_channel: u16) -> Result<Signal> {
        let ecu_address = self.ecu_address.ok_or_else(|| DaqError::InvalidSignal {
            name: self.name.clone(),
            reason: "no ECU address".to_string(),
        })?;
        let (signedness, length_bytes) = self.element_type();
        let (scale, offset) = self
            .conversion
            .as_ref()
            .and_then(Conversion::scale_offset)
            .unwrap_or((1.0, 0.0));

        Ok(Signal {
            name: self.name.clone(),
            long_identifier: self.long_identifier.clone(),
            ecu_address,
            length_bytes,
            signedness,
            scale,
            offset,
            unit: self.unit.clone().unwrap_or_default(),
            lower_limit: self.lower_limit,
            upper_limit: self.upper_limit,
            event_channel,
        })
    }
}
