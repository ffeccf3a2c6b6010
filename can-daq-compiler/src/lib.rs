//! CAN DAQ Configuration Compiler Library
//!
//! A stateless library that compiles a set of ECU measurement signals into a
//! dynamic DAQ setup for CCP or XCP on CAN:
//! - groups signals into DAQ lists and ODTs that fit the DTO payload
//! - encodes the protocol commands that configure and start those lists
//! - schedules the commands as a timed transmit list for a CAN logger
//! - derives the multiplexed decode table (and its DBC rendering) for the DTOs
//!
//! The command frames and the decode table are produced from the same
//! [`Grouping`], so the PID sequence used on the wire always matches the
//! multiplexor values used for decoding.
//!
//! The library does NOT:
//! - Parse A2L files (signals arrive as a serialized catalog)
//! - Talk to an ECU or a CAN interface
//! - Write files
//!
//! File handling and the command line live in the application layer
//! (can-daq-cli).
//!
//! # Example Usage
//!
//! ```
//! use can_daq_compiler::{
//!     CanId, CompilerConfig, DaqCompiler, Protocol, ProtocolParams, Signal, Signedness,
//! };
//!
//! let params = ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1))
//!     .add_event(3, 0);
//! let signals = vec![
//!     Signal::new("EngineSpeed", 0x4000_1000, Signedness::Unsigned, 2, 3),
//!     Signal::new("CoolantTemp", 0x4000_1002, Signedness::Signed, 2, 3),
//! ];
//!
//! let compiler = DaqCompiler::with_config(CompilerConfig::new().with_start_delay(500));
//! let compiled = compiler.compile(&signals, &params, Protocol::Xcp).unwrap();
//!
//! for entry in &compiled.plan.entries {
//!     println!("{:>6} ms  {}  {}", entry.delay, entry.name, entry.payload_hex());
//! }
//! let dbc = compiler.render_dbc(&compiled);
//! assert!(dbc.contains("SG_ EngineSpeed m0"));
//! ```

// Public modules
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod encoder;
pub mod grouping;
pub mod layout;
pub mod schedule;
pub mod types;

// Re-export main types for convenience
pub use catalog::{
    select_signals, Conversion, DaqListInfo, EventChannel, Measurement, ProtocolParams,
    Selected, Selection, Signal, Signedness,
};
pub use compiler::{CompiledDaq, DaqCompiler};
pub use config::{CompilerConfig, ScheduleConfig};
pub use encoder::{encoder_for, CommandEncoder, CommandFrame};
pub use grouping::{group, GroupedSignal, Grouping};
pub use layout::{layout, DecodeRow, DecodeTable};
pub use schedule::{schedule, FrameFormat, IdFormat, TransmitEntry, TransmitPlan};
pub use types::{ByteOrder, CanId, Capacity, DaqError, Protocol, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: ensure we can create a compiler with default limits
        let compiler = DaqCompiler::new();
        assert_eq!(compiler.config().schedule.max_frames, 224);
        assert!(!VERSION.is_empty());
    }
}
