//! Compiler configuration types
//!
//! Device limits and output options. Everything protocol-specific lives in
//! [`ProtocolParams`](crate::catalog::ProtocolParams); this module only holds
//! settings chosen by the user of the tool.

use serde::{Deserialize, Serialize};

/// Configuration for the DAQ compiler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Transmit list timing and device limits
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Shorten DBC signal names to 32 characters (29 + `_NN` suffix)
    #[serde(default = "default_true")]
    pub shorten_signal_names: bool,
}

/// Transmit list timing and the device limits it must respect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Delay before the first command frame (ms)
    #[serde(default = "default_start_delay")]
    pub start_delay_ms: u32,

    /// Delay between consecutive command frames (ms)
    #[serde(default = "default_frame_spacing")]
    pub frame_spacing_ms: u32,

    /// Maximum number of frames the device accepts in a transmit list
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,

    /// Maximum cumulative payload bytes the device accepts in a transmit list
    #[serde(default = "default_max_data_bytes")]
    pub max_data_bytes: usize,
}

fn default_true() -> bool {
    true
}

fn default_start_delay() -> u32 {
    1000
}

fn default_frame_spacing() -> u32 {
    10
}

// CANedge firmware 01.09.01+
fn default_max_frames() -> usize {
    224
}

fn default_max_data_bytes() -> usize {
    4096
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay(),
            frame_spacing_ms: default_frame_spacing(),
            max_frames: default_max_frames(),
            max_data_bytes: default_max_data_bytes(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            shorten_signal_names: default_true(),
        }
    }
}

impl CompilerConfig {
    /// Create a new compiler configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the delay before the first frame
    pub fn with_start_delay(mut self, delay_ms: u32) -> Self {
        self.schedule.start_delay_ms = delay_ms;
        self
    }

    /// Builder method: set the spacing between frames
    pub fn with_frame_spacing(mut self, spacing_ms: u32) -> Self {
        self.schedule.frame_spacing_ms = spacing_ms;
        self
    }

    /// Builder method: set the device frame limit
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.schedule.max_frames = max_frames;
        self
    }

    /// Builder method: set the device payload byte limit
    pub fn with_max_data_bytes(mut self, max_data_bytes: usize) -> Self {
        self.schedule.max_data_bytes = max_data_bytes;
        self
    }

    /// Builder method: enable or disable DBC signal name shortening
    pub fn with_shortened_names(mut self, enabled: bool) -> Self {
        self.shorten_signal_names = enabled;
        self
    }
}
