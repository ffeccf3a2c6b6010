//! CAN DAQ Compiler CLI Application
//!
//! This is the command-line interface for the DAQ configuration compiler.
//! It uses the can-daq-compiler library and adds:
//! - Catalog, default parameter and selection file loading
//! - TOML settings
//! - Status CSV, transmit list JSON and DBC output files

use anyhow::{Context, Result};
use can_daq_compiler::{select_signals, DaqCompiler};
use clap::Parser;
use std::path::PathBuf;

mod catalog;
mod config;
mod output;
mod report;

use config::AppConfig;
use report::MatchSummary;

/// CAN DAQ Compiler - Generate CCP/XCP dynamic DAQ transmit lists and DBC files
#[derive(Parser, Debug)]
#[command(name = "can-daq-cli")]
#[command(
    about = "Generate a CANedge transmit list and DBC file for CCP/XCP dynamic DAQ lists",
    long_about = None
)]
#[command(version)]
struct Args {
    /// Path for the output DBC file (extension forced to .dbc)
    #[arg(value_name = "OUTPUT_DBC")]
    output_dbc: PathBuf,

    /// Path for the output transmit list (extension forced to .json)
    #[arg(value_name = "OUTPUT_TRANSMIT")]
    output_transmit: PathBuf,

    /// Selection file with `name;event` rows
    #[arg(value_name = "SIGNAL_FILE")]
    signal_file: PathBuf,

    /// Signal catalog JSON extracted from the ECU's A2L file
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// Protocol parameters used when the catalog has none
    #[arg(long, value_name = "FILE")]
    default_params: Option<PathBuf>,

    /// Path to settings file (settings.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN DAQ Compiler CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using compiler library v{}", can_daq_compiler::VERSION);

    run(&args)
}

/// Load inputs, compile everything in memory, then write the outputs
fn run(args: &Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };

    let catalog = catalog::load_catalog(&args.catalog)?;
    let params = catalog::resolve_params(&catalog, args.default_params.as_deref())?;
    let selection = catalog::load_selection(&args.signal_file)?;
    let selected = select_signals(&catalog.measurements, &selection, &params);

    let summary = MatchSummary {
        requested: selection.len(),
        available: catalog.measurements.len(),
        matched: selected.signals.len(),
    };
    log::info!("{}", summary);
    log::info!(
        "{} settings: MAX_CTO: {} | MAX_DTO: {} | BYTE_ORDER: {} | CAN_FD: {}",
        catalog.protocol,
        params.max_cto,
        params.max_dto,
        params.byte_order,
        params.can_fd
    );

    report::write_status_csv(&args.signal_file, &selection, &selected)?;

    let compiler = DaqCompiler::with_config(settings.compiler_config());
    let compiled = compiler
        .compile(&selected.signals, &params, catalog.protocol)
        .context("Failed to compile DAQ configuration")?;
    let dbc = compiler.render_dbc(&compiled);

    output::write_transmit_list(&args.output_transmit, &compiled.plan)?;
    output::write_dbc(&args.output_dbc, &dbc)?;

    log::info!(
        "Done: {} DAQ lists, {} frames, {} data bytes",
        compiled.daq_list_count(),
        compiled.plan.len(),
        compiled.plan.total_bytes
    );
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
