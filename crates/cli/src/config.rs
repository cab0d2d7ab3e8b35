use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use netsoc_core::DetectionConfig;

use crate::cli::AnalyzeArgs;

/// Per-user overrides loaded from TOML. Unset fields keep the value from the
/// environment / `config.yaml` layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_seconds: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_window: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_z_threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_field: Option<String>,

    /// Hosts listed by `stats`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_hosts: Option<usize>,
}

pub const DEFAULT_TOP_HOSTS: usize = 10;

impl CliConfig {
    /// ~/.config/netsoc/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("netsoc");
        Ok(config_dir)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load overrides from the given path, or the default path.
    /// A missing file means no overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            debug!(?config_path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        debug!(?config_path, "Loading config");
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config: {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", config_path.display()))
    }

    pub fn apply(&self, detection: &mut DetectionConfig) {
        if let Some(gap) = self.gap_seconds {
            detection.gap_seconds = gap;
        }
        if let Some(window) = self.anomaly_window {
            detection.anomaly_window = window;
        }
        if let Some(z) = self.anomaly_z_threshold {
            detection.anomaly_z_threshold = z;
        }
        if let Some(field) = &self.volume_field {
            detection.volume_field = field.clone();
        }
    }

    pub fn top_hosts(&self, cli_override: Option<usize>) -> usize {
        cli_override.or(self.top_hosts).unwrap_or(DEFAULT_TOP_HOSTS)
    }
}

/// Command-line flags win over the file.
pub fn apply_flags(args: &AnalyzeArgs, detection: &mut DetectionConfig) {
    if let Some(gap) = args.gap {
        detection.gap_seconds = gap;
    }
    if let Some(window) = args.window {
        detection.anomaly_window = window;
    }
    if let Some(z) = args.z_threshold {
        detection.anomaly_z_threshold = z;
    }
    if let Some(field) = &args.field {
        detection.volume_field = field.clone();
    }
}
