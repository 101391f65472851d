use serde::Deserialize;
use std::path::Path;

use crate::frame::DEFAULT_MAX_BYTES;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub detect: DetectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Largest accepted pixel payload (`n * h * w * 4`), in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Emit the `(n, h, w)` header. Disable for the legacy pixels-only layout.
    #[serde(default = "default_write_header")]
    pub write_header: bool,
}

/// Border coverage settings.
///
/// Both comparisons are inclusive, matching the fill's own tolerance test: a
/// border sample counts when its distance is `<= 3 * coverage_tolerance^2`,
/// and the border is uniform when coverage is `>= min_border_coverage`. With
/// strict comparisons a zero tolerance would not even count the key color
/// itself.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectConfig {
    /// Share of border samples that must look like the key color before the
    /// background is considered uniform.
    #[serde(default = "default_min_border_coverage")]
    pub min_border_coverage: f64,
    /// Per-channel tolerance used when measuring border coverage.
    #[serde(default = "default_coverage_tolerance")]
    pub coverage_tolerance: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            write_header: default_write_header(),
        }
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            min_border_coverage: default_min_border_coverage(),
            coverage_tolerance: default_coverage_tolerance(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}
fn default_write_header() -> bool {
    true
}
fn default_min_border_coverage() -> f64 {
    0.6
}
fn default_coverage_tolerance() -> i32 {
    10
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.input.max_bytes, 1_000_000_000);
        assert!(config.output.write_header);
        assert_eq!(config.detect.min_border_coverage, 0.6);
        assert_eq!(config.detect.coverage_tolerance, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections() {
        let config = Config::parse(
            r#"
            [output]
            write_header = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert!(!config.output.write_header);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.input.max_bytes, 1_000_000_000);
    }

    #[test]
    fn bad_type_is_parse_error() {
        let result = Config::parse("[input]\nmax_bytes = \"lots\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file() {
        let path = std::env::temp_dir().join("cutout_config_does_not_exist.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::ReadFile(..))));
    }
}
