//! Signal catalog and protocol parameters
//!
//! This module contains the inputs of the compiler: measurements and protocol
//! parameters (as produced by an A2L extraction), the user's signal selection,
//! and the filtering step that turns them into validated signals.

pub mod filter;
pub mod measurement;
pub mod numeric;
pub mod params;
pub mod selection;
pub mod signal;

// Re-export key types for convenience
pub use filter::{matrix_base_name, select_signals, Selected};
pub use measurement::{Conversion, Measurement};
pub use params::{DaqListInfo, EventChannel, ProtocolParams};
pub use selection::{Selection, SelectionEntry};
pub use signal::{datatype_info, Signal, Signedness};
