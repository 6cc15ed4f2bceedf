//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("sigscope.yaml"));

    let mut content = render_config(&config, &format)
        .map_err(|e| anyhow::anyhow!("Failed to render configuration: {e}"))?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# sigscope Configuration
# ======================
#
# log_level: "info"              # off, error, warn, info, debug, trace
# parallelism: null              # Threads for parallel reduction (null/0 = auto)
#
# Recording Files
# ---------------
# recording:
#   base_time: "1970-01-01T00:00:00Z"  # Record timestamps are ms offsets from this
#   max_points_per_series: 10000       # Points per plotted series after reduction
#
# Realtime Session
# ----------------
# realtime:
#   memory_budget_mb: 10         # Shared by all active parameters (12 bytes per point)
#   interval_ms: 1000            # Tick interval
#   window_minutes: 120          # Visible window
#   parameters: [Signal_1, Signal_2, Signal_3, Signal_4]
#   seed: null                   # Seed of the simulated source (null = random)
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commented_template_still_parses() {
        let yaml = render_config(&Config::default(), &ConfigFormat::Yaml).unwrap();
        let commented = add_config_comments(yaml);
        assert!(commented.starts_with("# sigscope Configuration"));
        let parsed: Config = serde_yaml::from_str(&commented).unwrap();
        assert_eq!(parsed.realtime.memory_budget_mb, 10);
    }

    #[test]
    fn test_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        command_config(Some(path.clone()), ConfigFormat::Json, false).unwrap();
        let parsed: Config = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.recording.max_points_per_series, 10_000);
    }
}
