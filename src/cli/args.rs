//! Command-line argument definitions for the NetCDF extractor
//!
//! This module defines the complete CLI interface using the clap derive API.
//! Subcommands map one-to-one onto the library engines: `scan` onto the
//! catalog builder, `extract` onto the batch text extractor and `render` onto
//! the raster renderer.

use crate::constants::{
    DEFAULT_IMAGE_UPSCALE, DEFAULT_MISSING_VALUE, DEFAULT_PERIOD_SIZE, DEFAULT_SEPARATOR,
    DEFAULT_START_DATE, DEFAULT_TIME_FORMAT, DEFAULT_TIME_VARIABLE,
};
use crate::timeaxis::PeriodUnit;
use crate::{Error, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for the NetCDF extractor
///
/// Decodes gridded NetCDF variables and streams them as delimited text, or
/// renders them as false-color raster images.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ncextract",
    version,
    about = "Extract gridded NetCDF variables to delimited text and raster images",
    long_about = "Decodes gridded (time, lat, lon) NetCDF variables by applying their \
                  fill/missing/valid-range/scale/offset metadata, reconstructs the time \
                  axis from the file's tick counts, and streams the result as delimited \
                  text rows or false-color raster images. Batches of files are processed \
                  with per-file error isolation, granular progress and Ctrl+C cancellation."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress bars and informational output
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

impl Args {
    /// Effective tracing level for the log filter
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands for the NetCDF extractor
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Scan a directory and list the extractable variables per file
    Scan(ScanArgs),
    /// Extract gridded variables from NetCDF files to delimited text
    Extract(ExtractArgs),
    /// Render gridded variables as false-color PNG images
    Render(RenderArgs),
}

/// Output format for the scan listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScanFormat {
    /// Human-readable table on stdout
    Table,
    /// Machine-readable JSON document
    Json,
}

/// Arguments for the scan command
#[derive(Debug, Clone, Parser)]
pub struct ScanArgs {
    /// Directory to scan (non-recursive) for .nc and .cdf files
    #[arg(value_name = "DIR")]
    pub source: PathBuf,

    /// Listing format
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ScanFormat,
}

/// Arguments for the extract command (main operation)
#[derive(Debug, Clone, Parser)]
pub struct ExtractArgs {
    /// NetCDF source files to extract
    #[arg(value_name = "FILE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Variables to export from every source (comma-separated list)
    ///
    /// A name may be repeated to emit the column twice. Names missing from a
    /// file are dropped for that file with a warning.
    #[arg(
        short = 'x',
        long = "variables",
        value_name = "LIST",
        required = true,
        help = "Comma-separated list of variables to export"
    )]
    pub variables: VariableList,

    /// Destination directory for the extracted text files
    ///
    /// Must already exist. If not specified, each output is written next to
    /// its source file.
    #[arg(short = 'o', long = "destination", value_name = "DIR")]
    pub destination: Option<PathBuf>,

    /// Field separator for the emitted rows
    #[arg(long = "separator", value_name = "SEP", default_value = DEFAULT_SEPARATOR)]
    pub separator: String,

    /// Token emitted for cells without a physical value
    ///
    /// Pass an empty string to leave the field blank (the separator is still
    /// written, so the column count stays stable).
    #[arg(long = "missing-value", value_name = "TOKEN", default_value = DEFAULT_MISSING_VALUE)]
    pub missing_value: String,

    /// Concatenate all sources into one document named after the first source
    #[arg(long = "single-document")]
    pub single_document: bool,

    /// Omit the header row
    #[arg(long = "no-header")]
    pub no_header: bool,

    /// Accepted for compatibility; cell buffers are always released per file
    #[arg(long = "keep-buffers")]
    pub keep_buffers: bool,

    /// Number of period units represented by one stored time tick
    #[arg(long = "period-size", value_name = "N", default_value_t = DEFAULT_PERIOD_SIZE)]
    pub period_size: u32,

    /// Calendar unit of the stored time ticks
    ///
    /// One of: millisecond, second, minute, hour, day, month, year.
    #[arg(long = "period-unit", value_name = "UNIT", default_value = "second")]
    pub period_unit: PeriodUnit,

    /// Reference epoch the time ticks count from (RFC 3339)
    #[arg(long = "start-date", value_name = "DATETIME", default_value = DEFAULT_START_DATE)]
    pub start_date: chrono::DateTime<chrono::FixedOffset>,

    /// chrono pattern for the emitted time column
    #[arg(long = "time-format", value_name = "PATTERN", default_value = DEFAULT_TIME_FORMAT)]
    pub time_format: String,

    /// Name of the variable holding the time ticks
    ///
    /// Falls back to the variable named after the first dimension when a file
    /// does not declare this one.
    #[arg(long = "time-variable", value_name = "NAME", default_value = DEFAULT_TIME_VARIABLE)]
    pub time_variable: String,
}

/// Arguments for the render command
#[derive(Debug, Clone, Parser)]
pub struct RenderArgs {
    /// NetCDF source file
    #[arg(value_name = "FILE")]
    pub source: PathBuf,

    /// Variables to render, one PNG per variable (comma-separated list)
    #[arg(
        short = 'x',
        long = "variables",
        value_name = "LIST",
        required = true,
        help = "Comma-separated list of variables to render"
    )]
    pub variables: VariableList,

    /// Output directory for the PNG files
    ///
    /// Must already exist. If not specified, images are written next to the
    /// source file.
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Edge length of the square pixel block painted per grid cell
    #[arg(long = "upscale", value_name = "N", default_value_t = DEFAULT_IMAGE_UPSCALE)]
    pub upscale: u32,

    /// Paint latitude top-down as stored instead of inverting the axis
    #[arg(long = "no-invert-lat")]
    pub no_invert_lat: bool,
}

/// Comma-separated list of variable names
#[derive(Debug, Clone)]
pub struct VariableList(pub Vec<String>);

impl FromStr for VariableList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let names: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(Error::configuration(
                "variable list must contain at least one name",
            ));
        }
        Ok(VariableList(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_list_parsing() {
        let list: VariableList = "sst, chla,sst".parse().unwrap();
        assert_eq!(list.0, vec!["sst", "chla", "sst"]);
        assert!(", ,".parse::<VariableList>().is_err());
    }

    #[test]
    fn test_extract_args_defaults() {
        let args = Args::parse_from(["ncextract", "extract", "-x", "sst", "data.nc"]);
        let Some(Commands::Extract(extract)) = args.command else {
            panic!("expected extract subcommand");
        };
        assert_eq!(extract.separator, ",");
        assert_eq!(extract.missing_value, "NaN");
        assert_eq!(extract.period_size, 1);
        assert_eq!(extract.period_unit, PeriodUnit::Second);
        assert_eq!(extract.time_variable, "time");
        assert!(!extract.single_document);
        assert!(!extract.no_header);
    }

    #[test]
    fn test_log_level_from_flags() {
        let args = Args::parse_from(["ncextract", "-v", "scan", "."]);
        assert_eq!(args.log_level(), "debug");
        let args = Args::parse_from(["ncextract", "--quiet", "scan", "."]);
        assert_eq!(args.log_level(), "warn");
    }
}
