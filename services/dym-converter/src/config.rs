//! Converter configuration.
//!
//! Command-line arguments are parsed with clap, with environment fallbacks
//! for the options most often set per deployment. [`ConvertConfig`] is the
//! resolved form handed to [`crate::convert::run`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use dym_common::TimeAxisMode;
use dym_parser::{ByteSource, DecodeOptions, FileFormat};
use grid_processor::{AssembleConfig, Attributes, ZarrWriterConfig, DEFAULT_NODATA};
use serde::{Deserialize, Serialize};

/// DYM to Zarr converter
#[derive(Parser, Debug, Clone)]
#[command(name = "dymconvert")]
#[command(about = "Convert DYM2 gridded time series into Zarr V3 groups")]
pub struct Args {
    /// Input DYM file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Variable name (default: input file stem)
    #[arg(short, long)]
    pub varname: Option<String>,

    /// Output Zarr directory
    #[arg(short, long, default_value = "./output.zarr")]
    pub output: PathBuf,

    /// Replace the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Units attribute of the variable
    #[arg(long)]
    pub units: Option<String>,

    /// Extra variable attribute (repeatable)
    #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,

    /// Keep longitudes as stored instead of mapping them to [-180, 180)
    #[arg(long)]
    pub no_normalize_lon: bool,

    /// Days between levels; 30 selects one date per month
    #[arg(short = 't', long, default_value_t = 30, env = "DYM_DELTA_TIME")]
    pub delta_time: u32,

    /// How the time coordinate is built
    #[arg(long, value_enum, default_value_t = TimeAxisArg::Header, env = "DYM_TIME_AXIS")]
    pub time_axis: TimeAxisArg,

    /// Missing-value marker, or "none"
    #[arg(long, default_value = "-999", env = "DYM_NODATA", allow_negative_numbers = true)]
    pub nodata: NoData,

    /// Fail unless the input sniffs as this format
    #[arg(long)]
    pub expect_format: Option<FileFormat>,

    /// Only report the detected format
    #[arg(long)]
    pub sniff_only: bool,

    /// Only log errors and do not print the report
    #[arg(short, long)]
    pub silent: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "DYM_LOG_LEVEL")]
    pub log_level: String,

    /// Log as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Time coordinate choices on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeAxisArg {
    /// Stored fractional-year values
    Raw,
    /// Dates generated from the header's first/last dates
    Header,
    /// Each level value converted on its own
    Levels,
}

/// A no-data value, or none at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoData(pub Option<f32>);

impl FromStr for NoData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(NoData(None));
        }
        s.parse::<f32>()
            .map(|v| NoData(Some(v)))
            .map_err(|e| format!("invalid no-data value '{}': {}", s, e))
    }
}

impl fmt::Display for NoData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => f.write_str("none"),
        }
    }
}

impl Default for NoData {
    fn default() -> Self {
        NoData(Some(DEFAULT_NODATA))
    }
}

/// Parse a `key=value` attribute. The value may itself contain `=`.
pub fn parse_attribute(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid attribute '{}': expected KEY=VALUE", s))?;
    if key.is_empty() {
        return Err(format!("invalid attribute '{}': empty key", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Fully resolved conversion settings.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub overwrite: bool,
    pub sniff_only: bool,
    pub decode: DecodeOptions,
    pub assemble: AssembleConfig,
    pub zarr: ZarrWriterConfig,
}

impl ConvertConfig {
    /// Resolve arguments, reading Zarr settings from the environment.
    pub fn from_args(args: &Args) -> Result<Self> {
        Self::with_zarr_config(args, ZarrWriterConfig::from_env())
    }

    pub fn with_zarr_config(args: &Args, zarr: ZarrWriterConfig) -> Result<Self> {
        if args.delta_time == 0 {
            bail!("delta time must be at least one day");
        }
        if let Err(e) = zarr.validate() {
            bail!("invalid Zarr configuration: {}", e);
        }

        let time_axis = match args.time_axis {
            TimeAxisArg::Raw => TimeAxisMode::Raw,
            TimeAxisArg::Header => TimeAxisMode::HeaderRange {
                delta_days: args.delta_time,
            },
            TimeAxisArg::Levels => TimeAxisMode::PerLevel,
        };

        let name = args
            .varname
            .clone()
            .unwrap_or_else(|| ByteSource::from_path(&args.input).default_variable_name());

        let attributes: Attributes = args.attributes.iter().cloned().collect();

        Ok(Self {
            input: args.input.clone(),
            output: args.output.clone(),
            overwrite: args.overwrite,
            sniff_only: args.sniff_only,
            decode: DecodeOptions {
                time_axis,
                expected_format: args.expect_format,
            },
            assemble: AssembleConfig {
                name,
                units: args.units.clone(),
                nodata_value: args.nodata.0,
                normalize_longitude: !args.no_normalize_lon,
                attributes,
            },
            zarr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attribute() {
        assert_eq!(
            parse_attribute("source=seapodym").unwrap(),
            ("source".to_string(), "seapodym".to_string())
        );
        assert_eq!(
            parse_attribute("formula=a=b").unwrap(),
            ("formula".to_string(), "a=b".to_string())
        );
        assert!(parse_attribute("novalue").is_err());
        assert!(parse_attribute("=x").is_err());
    }

    #[test]
    fn test_nodata_parse() {
        assert_eq!("none".parse::<NoData>().unwrap(), NoData(None));
        assert_eq!("0".parse::<NoData>().unwrap(), NoData(Some(0.0)));
        assert_eq!("-999".parse::<NoData>().unwrap(), NoData::default());
        assert!("abc".parse::<NoData>().is_err());
        assert_eq!(NoData(None).to_string(), "none");
    }
}
