//! Main compiler API
//!
//! [`DaqCompiler`] runs grouping, command encoding, scheduling and layout over
//! one grouping snapshot. Either every output is produced or none is.

use crate::catalog::{ProtocolParams, Signal};
use crate::config::CompilerConfig;
use crate::encoder::{encoder_for, CommandFrame};
use crate::grouping::{group, Grouping};
use crate::layout::{layout, DecodeTable};
use crate::schedule::{schedule, TransmitPlan};
use crate::types::{Protocol, Result};

/// Everything produced by one compilation
#[derive(Debug, Clone)]
pub struct CompiledDaq {
    pub grouping: Grouping,
    pub frames: Vec<CommandFrame>,
    pub plan: TransmitPlan,
    pub table: DecodeTable,
}

impl CompiledDaq {
    pub fn protocol(&self) -> Protocol {
        self.grouping.protocol()
    }

    /// Number of DAQ lists in the grouping
    pub fn daq_list_count(&self) -> usize {
        self.grouping.daq_lists().len()
    }
}

/// The main compiler struct - entry point for turning signals into a DAQ setup
#[derive(Debug, Clone, Default)]
pub struct DaqCompiler {
    config: CompilerConfig,
}

impl DaqCompiler {
    /// Create a compiler with default device limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile signals into command frames, a transmit plan and a decode table
    ///
    /// # Example
    /// ```
    /// use can_daq_compiler::{CanId, DaqCompiler, Protocol, ProtocolParams, Signal, Signedness};
    ///
    /// let params = ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1));
    /// let signals = vec![Signal::new("EngineSpeed", 0x1000, Signedness::Unsigned, 2, 1)];
    ///
    /// let compiled = DaqCompiler::new()
    ///     .compile(&signals, &params, Protocol::Xcp)
    ///     .unwrap();
    /// assert_eq!(compiled.table.rows.len(), 1);
    /// ```
    pub fn compile(
        &self,
        signals: &[Signal],
        params: &ProtocolParams,
        protocol: Protocol,
    ) -> Result<CompiledDaq> {
        log::info!("Compiling {} signals for {}", signals.len(), protocol);

        params.validate()?;
        let grouping = group(signals, params, protocol)?;
        let frames = encoder_for(protocol).encode(&grouping, params)?;
        let plan = schedule(&frames, params, &self.config.schedule)?;
        let table = layout(&grouping, params)?;

        log::info!(
            "Compiled {} DAQ lists into {} command frames",
            grouping.daq_lists().len(),
            frames.len()
        );
        Ok(CompiledDaq {
            grouping,
            frames,
            plan,
            table,
        })
    }

    /// Render the decode table of a compilation as DBC text
    pub fn render_dbc(&self, compiled: &CompiledDaq) -> String {
        compiled.table.to_dbc(self.config.shorten_signal_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Signedness;
    use crate::types::{CanId, Capacity, DaqError};

    fn params() -> ProtocolParams {
        ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1))
            .add_event(1, 0)
            .add_daq_list(0, 4, 0)
    }

    fn signals() -> Vec<Signal> {
        vec![
            Signal::new("Speed", 0x1000, Signedness::Unsigned, 2, 1),
            Signal::new("Torque", 0x1002, Signedness::Signed, 2, 1),
        ]
    }

    #[test]
    fn test_compile_both_protocols() {
        let compiler = DaqCompiler::new();
        for protocol in [Protocol::Ccp, Protocol::Xcp] {
            let compiled = compiler.compile(&signals(), &params(), protocol).unwrap();
            assert_eq!(compiled.protocol(), protocol);
            assert_eq!(compiled.daq_list_count(), 1);
            assert_eq!(compiled.frames.len(), compiled.plan.len());
            assert_eq!(compiled.table.rows.len(), 2);
        }
    }

    #[test]
    fn test_budget_failure_returns_nothing() {
        let config = CompilerConfig::new().with_max_frames(3);
        let compiler = DaqCompiler::with_config(config);

        assert!(matches!(
            compiler.compile(&signals(), &params(), Protocol::Xcp),
            Err(DaqError::CapacityExceeded {
                resource: Capacity::TransmitFrames,
                ..
            })
        ));
    }

    #[test]
    fn test_classic_params_with_fd_sizes_rejected() {
        let params = params().with_transfer_sizes(0x40, 0x40);
        for protocol in [Protocol::Ccp, Protocol::Xcp] {
            assert!(matches!(
                DaqCompiler::new().compile(&signals(), &params, protocol),
                Err(DaqError::InvalidParams(_))
            ));
        }
    }

    #[test]
    fn test_render_dbc_uses_config() {
        let long = Signal::new("A".repeat(40), 0x2000, Signedness::Unsigned, 1, 1);
        let compiled = DaqCompiler::new()
            .compile(&[long], &params(), Protocol::Xcp)
            .unwrap();
        let short = DaqCompiler::new().render_dbc(&compiled);
        assert!(short.contains(&format!(" SG_ {} m0", "A".repeat(29))));

        let full = DaqCompiler::with_config(CompilerConfig::new().with_shortened_names(false));
        assert!(full.render_dbc(&compiled).contains(&format!(" SG_ {} m0", "A".repeat(40))));
    }
}
