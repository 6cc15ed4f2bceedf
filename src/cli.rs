//! CLI arguments and subcommands for sigscope.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for command reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "sigscope",
    about = "Time-series engine for signal recordings and realtime monitoring",
    long_about = "Time-series engine for signal recordings and realtime monitoring.\n\n\
                  Reads fixed-size binary recordings through a memory map, resolves time \
                  windows by binary search, keeps realtime samples under a memory budget \
                  and reduces series to plot-sized point counts.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides the config file; default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Realtime memory budget in MB, shared by all active parameters
    #[arg(long)]
    pub memory_budget_mb: Option<usize>,

    /// Realtime tick interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Maximum points per plotted series
    #[arg(long)]
    pub max_points: Option<usize>,

    /// Base time of recordings (RFC 3339); record timestamps are offsets from it
    #[arg(long)]
    pub base_time: Option<String>,

    /// Parallel processing threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show record count, time span and cycle transitions of a recording
    Inspect {
        /// Recording file
        file: PathBuf,

        /// Check that timestamps never decrease
        #[arg(long)]
        verify: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Resolve a time window of a recording and reduce its series
    Window {
        /// Recording file
        file: PathBuf,

        /// Window length
        #[arg(short = 'w', long, default_value_t = 60)]
        window: i64,

        /// Unit of --window and --scroll: 0 = seconds, 1 = minutes, 2 = hours
        #[arg(long, default_value_t = 0)]
        unit: usize,

        /// Scroll position from the first record, same unit as --window
        #[arg(short = 's', long, default_value_t = 0)]
        scroll: i64,

        /// Parameters to reduce (names, comma-separated); default: all
        #[arg(short = 'p', long)]
        parameters: Option<String>,

        /// Write the raw window as CSV to this path ("-" for stdout, replacing the report)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a realtime session on simulated data
    Simulate {
        /// Simulated session length in seconds
        #[arg(short = 'd', long, default_value_t = 600)]
        duration: u64,

        /// Pace ticks at wall-clock speed instead of running as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Scroll back by this many seconds before printing the visible window
        #[arg(long, default_value_t = 0)]
        scroll: i64,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate a synthetic recording file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.bin")]
        output: PathBuf,

        /// Number of records
        #[arg(short = 'n', long, default_value_t = 3600)]
        records: usize,

        /// Milliseconds between records
        #[arg(long, default_value_t = 1000)]
        step_ms: u64,

        /// Records per cycle value before it advances
        #[arg(long, default_value_t = 300)]
        cycle_length: usize,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}
