//! Configuration management for sigscope.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sigscope::record;
use sigscope::SessionSettings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_MAX_POINTS_PER_SERIES: usize = 10_000;
pub const DEFAULT_MEMORY_BUDGET_MB: usize = 10;
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_WINDOW_MINUTES: u64 = 120;

/// Recording (file) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Base time of record timestamps (default: Unix epoch)
    #[serde(default = "default_base_time")]
    pub base_time: DateTime<Utc>,

    /// Plot budget per series (default: 10000)
    #[serde(default = "default_max_points_per_series")]
    pub max_points_per_series: usize,
}

fn default_base_time() -> DateTime<Utc> {
    // Default for DateTime<Utc> is the Unix epoch
    DateTime::<Utc>::default()
}
fn default_max_points_per_series() -> usize {
    DEFAULT_MAX_POINTS_PER_SERIES
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            base_time: default_base_time(),
            max_points_per_series: default_max_points_per_series(),
        }
    }
}

/// Realtime session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Memory for all realtime series in MB (default: 10)
    #[serde(default = "default_memory_budget_mb")]
    pub memory_budget_mb: usize,

    /// Tick interval in milliseconds (default: 1000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Visible window in minutes (default: 120)
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,

    /// Active parameters
    #[serde(default = "default_parameters")]
    pub parameters: Vec<String>,

    /// Seed of the simulated source (None = random)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_memory_budget_mb() -> usize {
    DEFAULT_MEMORY_BUDGET_MB
}
fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}
fn default_window_minutes() -> u64 {
    DEFAULT_WINDOW_MINUTES
}
fn default_parameters() -> Vec<String> {
    record::parameter_names().iter().take(4).cloned().collect()
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            memory_budget_mb: default_memory_budget_mb(),
            interval_ms: default_interval_ms(),
            window_minutes: default_window_minutes(),
            parameters: default_parameters(),
            seed: None,
        }
    }
}

impl RealtimeConfig {
    /// Session settings for these values. Call after validation.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            memory_budget_mb: self.memory_budget_mb,
            interval_ms: i64::try_from(self.interval_ms).unwrap_or(i64::MAX),
            window_duration_ms: i64::try_from(self.window_minutes.saturating_mul(60_000))
                .unwrap_or(i64::MAX),
            parameters: self.parameters.clone(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Logging
    pub log_level: Option<String>,

    /// Parallel reduction threads (None or 0 = auto)
    pub parallelism: Option<usize>,

    #[serde(default)]
    pub recording: RecordingConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".into()),
            parallelism: None,
            recording: RecordingConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.recording.max_points_per_series == 0 {
        return Err("recording.max_points_per_series must be at least 1".into());
    }

    let rt = &cfg.realtime;
    if rt.memory_budget_mb == 0 {
        return Err("realtime.memory_budget_mb must be at least 1".into());
    }
    if rt.interval_ms == 0 {
        return Err("realtime.interval_ms must be at least 1".into());
    }
    if rt.window_minutes == 0 {
        return Err("realtime.window_minutes must be at least 1".into());
    }
    if rt.parameters.is_empty() {
        return Err("realtime.parameters must name at least one parameter".into());
    }
    if let Some(unknown) = rt
        .parameters
        .iter()
        .find(|p| record::parameter_index(p).is_none())
    {
        return Err(format!(
            "Unknown realtime parameter '{}', expected Signal_1 .. Signal_{}",
            unknown,
            record::SIGNAL_COUNT
        )
        .into());
    }

    if let Some(level) = cfg.log_level.as_deref() {
        match level {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(format!(
                    "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                    other
                )
                .into());
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(mb) = args.memory_budget_mb {
        config.realtime.memory_budget_mb = mb;
    }
    if let Some(interval) = args.interval_ms {
        config.realtime.interval_ms = interval;
    }
    if let Some(max_points) = args.max_points {
        config.recording.max_points_per_series = max_points;
    }
    if let Some(base_time) = &args.base_time {
        config.recording.base_time = DateTime::parse_from_rfc3339(base_time)
            .map_err(|e| format!("Invalid --base-time '{}': {}", base_time, e))?
            .with_timezone(&Utc);
    }
    if args.parallelism.is_some() {
        config.parallelism = args.parallelism;
    }

    Ok(config)
}

/// Loads a config file, or the first one found in the default locations.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => {
            let defaults = [
                "/etc/sigscope/sigscope.yaml",
                "/etc/sigscope/sigscope.yml",
                "/etc/sigscope/sigscope.json",
                "./sigscope.yaml",
                "./sigscope.yml",
                "./sigscope.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}
