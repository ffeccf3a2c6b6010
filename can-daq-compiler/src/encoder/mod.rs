//! Command encoders
//!
//! Each protocol turns a [`Grouping`] into the ordered list of command frames
//! that set up dynamic DAQ lists in the ECU. The encoder is chosen once from
//! the protocol tag; both implement [`CommandEncoder`].

use crate::catalog::ProtocolParams;
use crate::grouping::Grouping;
use crate::types::{ByteOrder, DaqError, Protocol, Result};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use std::fmt;

pub mod ccp;
pub mod xcp;

pub use ccp::{CcpEncoder, CommandCounter};
pub use xcp::XcpEncoder;

/// A named command frame payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Diagnostic label (not transmitted)
    pub name: String,
    /// Command bytes, starting with the opcode
    pub payload: Vec<u8>,
}

impl CommandFrame {
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn opcode(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload as upper-case hex
    pub fn hex(&self) -> String {
        to_hex(&self.payload)
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.hex())
    }
}

/// Upper-case hex rendering of a byte slice
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Common interface of the protocol encoders
pub trait CommandEncoder {
    /// Protocol implemented by this encoder
    fn protocol(&self) -> Protocol;

    /// Encode the DAQ setup sequence for a grouping
    fn encode(&self, grouping: &Grouping, params: &ProtocolParams) -> Result<Vec<CommandFrame>>;
}

/// Select the encoder for a protocol
pub fn encoder_for(protocol: Protocol) -> Box<dyn CommandEncoder> {
    match protocol {
        Protocol::Ccp => Box::new(CcpEncoder),
        Protocol::Xcp => Box::new(XcpEncoder),
    }
}

/// Reject a grouping made for another protocol (capacity checks differ)
pub(crate) fn ensure_protocol(grouping: &Grouping, protocol: Protocol) -> Result<()> {
    if grouping.protocol() != protocol {
        return Err(DaqError::ProtocolMismatch(format!(
            "grouping was built for {} but encoded as {}",
            grouping.protocol(),
            protocol
        )));
    }
    Ok(())
}

/// Incremental payload builder
///
/// Multi-byte fields use the ECU byte order unless the method says otherwise.
pub(crate) struct Payload {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl Payload {
    pub(crate) fn new(order: ByteOrder, opcode: u8) -> Self {
        Self {
            order,
            bytes: vec![opcode],
        }
    }

    pub(crate) fn u8(mut self, value: u8) -> Self {
        self.bytes.push(value);
        self
    }

    pub(crate) fn bytes(mut self, values: &[u8]) -> Self {
        self.bytes.extend_from_slice(values);
        self
    }

    pub(crate) fn u16(self, value: u16) -> Self {
        let mut buf = [0u8; 2];
        match self.order {
            ByteOrder::Little => LittleEndian::write_u16(&mut buf, value),
            ByteOrder::Big => BigEndian::write_u16(&mut buf, value),
        }
        self.bytes(&buf)
    }

    pub(crate) fn u16_le(self, value: u16) -> Self {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.bytes(&buf)
    }

    pub(crate) fn u32(self, value: u32) -> Self {
        let mut buf = [0u8; 4];
        match self.order {
            ByteOrder::Little => LittleEndian::write_u32(&mut buf, value),
            ByteOrder::Big => BigEndian::write_u32(&mut buf, value),
        }
        self.bytes(&buf)
    }

    pub(crate) fn u32_be(self, value: u32) -> Self {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.bytes(&buf)
    }

    /// Fill with `byte` up to `len` bytes
    pub(crate) fn pad_to(mut self, len: usize, byte: u8) -> Self {
        if self.bytes.len() < len {
            self.bytes.resize(len, byte);
        }
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
