//! BOSSA Shim CLI
//!
//! Runs a command line through the same dispatch path the mobile host uses.

use anyhow::Result;
use bossa_shim::{Dispatcher, ShimConfig, logging};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// BOSSA Shim - dispatch a flashing command line
#[derive(Parser, Debug)]
#[command(name = "bossa-shim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Flashing tool executable (overrides the config file)
    #[arg(short, long)]
    program: Option<PathBuf>,

    /// Run in verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Command line, e.g. "bossac -e -w -v -b firmware.bin"
    command_line: String,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ShimConfig::load(path)?,
        None => ShimConfig::default(),
    };
    if args.program.is_some() {
        config.program = args.program;
    }
    if args.verbose {
        config.log_level = "debug".to_string();
    }

    logging::init(&config.log_level);
    info!("BOSSA Shim v{}", env!("CARGO_PKG_VERSION"));

    let dispatcher = Dispatcher::from_config(&config);
    let argc = bossa_shim::tokenizer::tokenize(&args.command_line).len() as i32;
    let status = dispatcher.dispatch(argc, &args.command_line)?;

    // Process exit codes are 8 bits wide.
    Ok(ExitCode::from(status as u8))
}
