//! XCP on CAN command encoder
//!
//! Frames are as short as the command allows, except WRITE_DAQ_MULTIPLE which
//! is always a full 64-byte CAN FD payload.

use crate::catalog::ProtocolParams;
use crate::encoder::{ensure_protocol, CommandEncoder, CommandFrame, Payload};
use crate::grouping::{DaqListView, GroupedSignal, Grouping};
use crate::types::{command_byte, command_word, Protocol, Result};

/// XCP command codes
pub mod opcode {
    pub const CONNECT: u8 = 0xFF;
    pub const GET_STATUS: u8 = 0xFD;
    pub const FREE_DAQ: u8 = 0xD6;
    pub const ALLOC_DAQ: u8 = 0xD5;
    pub const ALLOC_ODT: u8 = 0xD4;
    pub const ALLOC_ODT_ENTRY: u8 = 0xD3;
    pub const SET_DAQ_PTR: u8 = 0xE2;
    pub const WRITE_DAQ: u8 = 0xE1;
    pub const WRITE_DAQ_MULTIPLE: u8 = 0xC7;
    pub const SET_DAQ_LIST_MODE: u8 = 0xE0;
    pub const START_STOP_DAQ_LIST: u8 = 0xDE;
    pub const START_STOP_SYNCH: u8 = 0xDD;
}

const RESERVED: u8 = 0x00;
const BIT_OFFSET_NONE: u8 = 0xFF;
const ADDRESS_EXTENSION: u8 = 0x00;
const PRESCALER: u8 = 0x01;
const MODE_PREPARE: u8 = 0x02;
const SYNCH_START_SELECTED: u8 = 0x01;

/// WRITE_DAQ_MULTIPLE frame length
const FD_CTO: u16 = 64;
/// Descriptor bytes per WRITE_DAQ_MULTIPLE frame (64 minus the opcode)
const MULTIPLE_MAX_PAYLOAD: usize = 63;
const MULTIPLE_DESCRIPTOR_LEN: usize = 8;

/// Encoder for XCP dynamic DAQ setup
#[derive(Debug, Clone, Copy, Default)]
pub struct XcpEncoder;

impl CommandEncoder for XcpEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Xcp
    }

    fn encode(&self, grouping: &Grouping, params: &ProtocolParams) -> Result<Vec<CommandFrame>> {
        ensure_protocol(grouping, Protocol::Xcp)?;

        let lists = grouping.daq_lists();
        let cmd = |opcode| Payload::new(params.byte_order, opcode);
        let mut frames = Vec::new();

        // Stateless resets
        frames.push(CommandFrame::new("CONNECT", cmd(opcode::CONNECT).u8(0x00).finish()));
        frames.push(CommandFrame::new("GET_STATUS", cmd(opcode::GET_STATUS).finish()));
        frames.push(CommandFrame::new("FREE_DAQ", cmd(opcode::FREE_DAQ).finish()));

        let daq_count = command_word(lists.len(), "daq_count")?;
        frames.push(CommandFrame::new(
            "ALLOC_DAQ",
            cmd(opcode::ALLOC_DAQ).u8(RESERVED).u16(daq_count).finish(),
        ));

        for list in &lists {
            let odt_count = command_byte(list.odt_count(), "odt_count")?;
            frames.push(CommandFrame::new(
                format!("ALLOC_ODT_{:04X}", list.id),
                cmd(opcode::ALLOC_ODT)
                    .u8(RESERVED)
                    .u16(list.id)
                    .u8(odt_count)
                    .finish(),
            ));
        }

        for list in &lists {
            for (odt_index, odt) in list.odts.iter().enumerate() {
                let odt_id = command_byte(odt_index, "odt")?;
                let entry_count = command_byte(odt.len(), "odt_entry_count")?;
                frames.push(CommandFrame::new(
                    format!("ALLOC_ODT_ENTRY_{:04X}_{:02X}", list.id, odt_id),
                    cmd(opcode::ALLOC_ODT_ENTRY)
                        .u8(RESERVED)
                        .u16(list.id)
                        .u8(odt_id)
                        .u8(entry_count)
                        .finish(),
                ));
            }
        }

        for list in &lists {
            write_daq_list(&mut frames, list, params)?;
        }

        for list in &lists {
            frames.push(set_daq_list_mode(list, params));
        }

        for list in &lists {
            frames.push(CommandFrame::new(
                "START_STOP_DAQ_LIST",
                cmd(opcode::START_STOP_DAQ_LIST)
                    .u8(MODE_PREPARE)
                    .u16(list.id)
                    .finish(),
            ));
        }

        frames.push(CommandFrame::new(
            "START_STOP_SYNCH",
            cmd(opcode::START_STOP_SYNCH).u8(SYNCH_START_SELECTED).finish(),
        ));

        log::info!("Encoded {} XCP command frames", frames.len());
        Ok(frames)
    }
}

/// SET_DAQ_PTR once per ODT, then WRITE_DAQ or WRITE_DAQ_MULTIPLE
fn write_daq_list(
    frames: &mut Vec<CommandFrame>,
    list: &DaqListView<'_>,
    params: &ProtocolParams,
) -> Result<()> {
    let use_multiple = params.uses_write_daq_multiple();

    for (odt_index, odt) in list.odts.iter().enumerate() {
        let odt_id = command_byte(odt_index, "odt")?;
        frames.push(CommandFrame::new(
            "SET_DAQ_PTR",
            Payload::new(params.byte_order, opcode::SET_DAQ_PTR)
                .u8(RESERVED)
                .u16(list.id)
                .u8(odt_id)
                .u8(0x00)
                .finish(),
        ));

        if use_multiple {
            write_daq_multiple(frames, odt, params);
        } else {
            for (index, entry) in odt.iter().enumerate() {
                frames.push(CommandFrame::new(
                    format!("WRITE_DAQ_{:02X}", index),
                    Payload::new(params.byte_order, opcode::WRITE_DAQ)
                        .u8(BIT_OFFSET_NONE)
                        .u8(entry.signal.length_bytes)
                        .u8(ADDRESS_EXTENSION)
                        .u32(entry.signal.ecu_address)
                        .finish(),
                ));
            }
        }
    }
    Ok(())
}

/// Pack entry descriptors into as few 64-byte frames as possible
fn write_daq_multiple(frames: &mut Vec<CommandFrame>, odt: &[GroupedSignal], params: &ProtocolParams) {
    for chunk in odt.chunks(MULTIPLE_MAX_PAYLOAD / MULTIPLE_DESCRIPTOR_LEN) {
        // chunk.len() <= 7
        let mut payload =
            Payload::new(params.byte_order, opcode::WRITE_DAQ_MULTIPLE).u8(chunk.len() as u8);
        for entry in chunk {
            payload = payload
                .u8(BIT_OFFSET_NONE)
                .u8(entry.signal.length_bytes)
                .u32(entry.signal.ecu_address)
                .u8(ADDRESS_EXTENSION)
                .u8(0x00);
        }
        frames.push(CommandFrame::new(
            "WRITE_DAQ_MULTIPLE",
            payload.pad_to(usize::from(FD_CTO), 0x00).finish(),
        ));
    }
}

fn set_daq_list_mode(list: &DaqListView<'_>, params: &ProtocolParams) -> CommandFrame {
    let priority = match params.event(list.event_channel) {
        Some(event) => event.priority,
        None => {
            log::warn!(
                "No event priority found for channel {} (DAQ list {}), using 0",
                list.event_channel,
                list.id
            );
            0
        }
    };

    CommandFrame::new(
        "SET_DAQ_LIST_MODE",
        Payload::new(params.byte_order, opcode::SET_DAQ_LIST_MODE)
            .u8(RESERVED)
            .u16(list.id)
            .u16(list.event_channel)
            .u8(PRESCALER)
            .u8(priority)
            .finish(),
    )
}
