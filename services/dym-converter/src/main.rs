//! `dymconvert`: convert a DYM2 file into a Zarr group.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dym_converter::{run, Args, ConvertConfig};

fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args)?;
    info!("Starting DYM converter");

    let config = ConvertConfig::from_args(&args)?;
    let report = run(&config)?;

    if !args.silent {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

/// Install a global subscriber writing to stderr, keeping stdout for the report.
fn init_tracing(args: &Args) -> Result<()> {
    let level = if args.silent {
        Level::ERROR
    } else {
        match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}
