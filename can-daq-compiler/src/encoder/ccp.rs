//! CCP command encoder
//!
//! Every CCP command frame is 8 bytes: opcode, command counter, parameters,
//! padded with `0xAA`. The command counter is threaded through the section
//! functions as a value.

use crate::catalog::ProtocolParams;
use crate::encoder::{ensure_protocol, CommandEncoder, CommandFrame, Payload};
use crate::grouping::{DaqListView, GroupedSignal, Grouping};
use crate::types::{command_byte, DaqError, Protocol, Result};

/// CCP command codes
pub mod opcode {
    pub const CONNECT: u8 = 0x01;
    pub const EXCHANGE_ID: u8 = 0x17;
    pub const GET_DAQ_SIZE: u8 = 0x14;
    pub const SET_DAQ_PTR: u8 = 0x15;
    pub const WRITE_DAQ: u8 = 0x16;
    pub const START_STOP: u8 = 0x06;
    pub const START_STOP_ALL: u8 = 0x08;
}

const FRAME_LEN: usize = 8;
const PAD: u8 = 0xAA;
const ADDRESS_EXTENSION: u8 = 0x00;
const MODE_PREPARE: u8 = 0x02;
const MODE_START: u8 = 0x01;
const PRESCALER: u16 = 0x0001;

/// CCP command counter (CTR byte)
///
/// Starts at 1 and wraps from 0xFF to 0x00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCounter(u8);

impl CommandCounter {
    pub fn start() -> Self {
        Self(1)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Self {
        if self.0 == u8::MAX {
            log::warn!("CCP command counter wrapped past 0xFF");
        }
        Self(self.0.wrapping_add(1))
    }
}

/// Encoder for CCP 2.1 dynamic DAQ setup
#[derive(Debug, Clone, Copy, Default)]
pub struct CcpEncoder;

impl CommandEncoder for CcpEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Ccp
    }

    fn encode(&self, grouping: &Grouping, params: &ProtocolParams) -> Result<Vec<CommandFrame>> {
        ensure_protocol(grouping, Protocol::Ccp)?;

        let lists = grouping.daq_lists();
        let mut frames = Vec::new();

        let mut ctr = connect(&mut frames, CommandCounter::start(), params);
        ctr = exchange_id(&mut frames, ctr, params);
        for list in &lists {
            ctr = write_daq_list(&mut frames, ctr, list, params)?;
        }
        for list in &lists {
            ctr = start_stop(&mut frames, ctr, list, params)?;
        }
        start_stop_all(&mut frames, ctr, params);

        log::info!("Encoded {} CCP command frames", frames.len());
        Ok(frames)
    }
}

/// Push one frame built from the current counter value
fn emit(
    frames: &mut Vec<CommandFrame>,
    ctr: CommandCounter,
    name: String,
    payload: Payload,
) -> CommandCounter {
    frames.push(CommandFrame::new(name, payload.pad_to(FRAME_LEN, PAD).finish()));
    ctr.next()
}

fn command(params: &ProtocolParams, opcode: u8, ctr: CommandCounter) -> Payload {
    Payload::new(params.byte_order, opcode).u8(ctr.value())
}

fn connect(frames: &mut Vec<CommandFrame>, ctr: CommandCounter, params: &ProtocolParams) -> CommandCounter {
    // Station address is always Intel byte order
    let payload = command(params, opcode::CONNECT, ctr).u16_le(params.ecu_station_address);
    emit(frames, ctr, "CONNECT".to_string(), payload)
}

fn exchange_id(frames: &mut Vec<CommandFrame>, ctr: CommandCounter, params: &ProtocolParams) -> CommandCounter {
    let payload = command(params, opcode::EXCHANGE_ID, ctr);
    emit(frames, ctr, "EXCHANGE_ID".to_string(), payload)
}

/// GET_DAQ_SIZE (clears the list) followed by SET_DAQ_PTR/WRITE_DAQ per entry
fn write_daq_list(
    frames: &mut Vec<CommandFrame>,
    mut ctr: CommandCounter,
    list: &DaqListView<'_>,
    params: &ProtocolParams,
) -> Result<CommandCounter> {
    let daq = command_byte(usize::from(list.id), "daq_list")?;

    let payload = command(params, opcode::GET_DAQ_SIZE, ctr)
        .u8(daq)
        .u8(PAD)
        .u32_be(params.dto_id().to_raw());
    ctr = emit(frames, ctr, format!("GET_DAQ_SIZE_{:02X}", daq), payload);

    for odt in &list.odts {
        ctr = if params.bytes_only {
            write_odt_bytewise(frames, ctr, daq, odt, params)?
        } else {
            write_odt(frames, ctr, daq, odt, params)?
        };
    }
    Ok(ctr)
}

fn write_odt(
    frames: &mut Vec<CommandFrame>,
    mut ctr: CommandCounter,
    daq: u8,
    odt: &[GroupedSignal],
    params: &ProtocolParams,
) -> Result<CommandCounter> {
    for entry in odt {
        let odt_id = command_byte(usize::from(entry.odt_id), "odt")?;
        let entry_id = command_byte(usize::from(entry.odt_entry_id), "odt_entry")?;
        ctr = set_daq_ptr(frames, ctr, daq, odt_id, entry_id, params);
        ctr = write_daq(
            frames,
            ctr,
            entry.signal.length_bytes,
            entry.signal.ecu_address,
            params,
        );
    }
    Ok(ctr)
}

/// One single-byte entry per signal byte, entries renumbered across the ODT
fn write_odt_bytewise(
    frames: &mut Vec<CommandFrame>,
    mut ctr: CommandCounter,
    daq: u8,
    odt: &[GroupedSignal],
    params: &ProtocolParams,
) -> Result<CommandCounter> {
    let mut entry_index: usize = 0;
    for entry in odt {
        let odt_id = command_byte(usize::from(entry.odt_id), "odt")?;
        for byte in 0..u32::from(entry.signal.length_bytes) {
            let entry_id = command_byte(entry_index, "odt_entry")?;
            ctr = set_daq_ptr(frames, ctr, daq, odt_id, entry_id, params);
            ctr = write_daq(
                frames,
                ctr,
                1,
                entry.signal.ecu_address.wrapping_add(byte),
                params,
            );
            entry_index += 1;
        }
    }
    Ok(ctr)
}

fn set_daq_ptr(
    frames: &mut Vec<CommandFrame>,
    ctr: CommandCounter,
    daq: u8,
    odt: u8,
    entry: u8,
    params: &ProtocolParams,
) -> CommandCounter {
    let payload = command(params, opcode::SET_DAQ_PTR, ctr)
        .u8(daq)
        .u8(odt)
        .u8(entry);
    emit(
        frames,
        ctr,
        format!("PTR_D{:02X}_O{:02X}_E{:02X}", daq, odt, entry),
        payload,
    )
}

fn write_daq(
    frames: &mut Vec<CommandFrame>,
    ctr: CommandCounter,
    length: u8,
    address: u32,
    params: &ProtocolParams,
) -> CommandCounter {
    let payload = command(params, opcode::WRITE_DAQ, ctr)
        .u8(length)
        .u8(ADDRESS_EXTENSION)
        .u32(address);
    emit(frames, ctr, "WRITE_DAQ".to_string(), payload)
}

/// Prepare a list, addressed to its last ODT
fn start_stop(
    frames: &mut Vec<CommandFrame>,
    ctr: CommandCounter,
    list: &DaqListView<'_>,
    params: &ProtocolParams,
) -> Result<CommandCounter> {
    let daq = command_byte(usize::from(list.id), "daq_list")?;
    let last_odt = command_byte(usize::from(list.last_odt_id()), "odt")?;
    let event = u8::try_from(list.event_channel).map_err(|_| {
        DaqError::ProtocolMismatch(format!(
            "CCP event channel {} of DAQ list {} does not fit one byte",
            list.event_channel, list.id
        ))
    })?;

    let payload = command(params, opcode::START_STOP, ctr)
        .u8(MODE_PREPARE)
        .u8(daq)
        .u8(last_odt)
        .u8(event)
        .bytes(&PRESCALER.to_be_bytes());
    Ok(emit(frames, ctr, format!("START_STOP_D{:02X}", daq), payload))
}

fn start_stop_all(frames: &mut Vec<CommandFrame>, ctr: CommandCounter, params: &ProtocolParams) -> CommandCounter {
    let payload = command(params, opcode::START_STOP_ALL, ctr).u8(MODE_START);
    emit(frames, ctr, "START_STOP_ALL".to_string(), payload)
}
