//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`ARGOQC_*`, applied by the binary through clap)
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! A missing config file is never fatal: the loader reports it and falls back
//! to defaults. A config file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ARGOQC_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub markers: MarkerConfig,

    #[serde(default)]
    pub remote: RemoteConfig,
}

impl TomlConfig {
    /// Reject values no run can work with
    pub fn validate(&self) -> Result<()> {
        let spacing = self.processing.lattice_spacing_um;
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(Error::InvalidInput(format!(
                "processing.lattice_spacing_um must be positive, got {}",
                spacing
            )));
        }
        if self.processing.canvas_height == 0 {
            return Err(Error::InvalidInput(
                "processing.canvas_height must be at least 1".to_string(),
            ));
        }
        if self.remote.timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "remote.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Analysis and artifact options
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProcessingConfig {
    /// Pick up every item not yet marked processed (raw ones included) and
    /// start a fresh summary table instead of extending the current one
    #[serde(default)]
    pub process_all: bool,

    /// Render and publish heatmaps
    #[serde(default = "default_true")]
    pub save_heatmaps: bool,

    /// Features to render (field_distortion, field_uniformity, fwhm)
    #[serde(default = "default_heatmap_features")]
    pub heatmap_features: Vec<String>,

    /// Nominal ring spacing of the slide pattern, in micrometers
    #[serde(default = "default_lattice_spacing")]
    pub lattice_spacing_um: f64,

    /// Heatmap canvas height in pixels; width follows the image aspect ratio
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            process_all: false,
            save_heatmaps: true,
            heatmap_features: default_heatmap_features(),
            lattice_spacing_um: default_lattice_spacing(),
            canvas_height: default_canvas_height(),
        }
    }
}

/// Marker (tag) names used for lifecycle bookkeeping
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarkerConfig {
    #[serde(default = "default_raw_marker")]
    pub raw: String,

    #[serde(default = "default_processed_marker")]
    pub processed: String,

    /// Slide-family marker attached to every processed item
    #[serde(default = "default_slide_marker")]
    pub slide_family: String,

    /// Substring identifying derived/companion images inside multi-series files
    #[serde(default = "default_derived_pattern")]
    pub derived_image_pattern: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            raw: default_raw_marker(),
            processed: default_processed_marker(),
            slide_family: default_slide_marker(),
            derived_image_pattern: default_derived_pattern(),
        }
    }
}

/// Remote repository gateway settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_heatmap_features() -> Vec<String> {
    vec![
        "field_distortion".to_string(),
        "field_uniformity".to_string(),
        "fwhm".to_string(),
    ]
}

fn default_lattice_spacing() -> f64 {
    5.0
}

fn default_canvas_height() -> u32 {
    256
}

fn default_raw_marker() -> String {
    "raw".to_string()
}

fn default_processed_marker() -> String {
    "processed".to_string()
}

fn default_slide_marker() -> String {
    "argolight".to_string()
}

fn default_derived_pattern() -> String {
    "[macro image]".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Outcome of config resolution
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// File the config was read from; `None` when built-in defaults are used
    pub source: Option<PathBuf>,
}

/// Parse TOML text into a config
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Parse(format!("Parse TOML failed: {}", e)))
}

/// Resolve and load the config file
///
/// An explicit path (CLI) must exist. Otherwise `ARGOQC_CONFIG`, then the
/// platform config directory are tried; if neither yields a file, defaults
/// are returned with `source == None`.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return read_config_file(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return read_config_file(&path);
        }
        tracing::warn!(
            path = %path.display(),
            "{} points to a missing file, using defaults",
            CONFIG_ENV_VAR
        );
        return Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: None,
        });
    }

    match default_config_path() {
        Some(path) if path.exists() => read_config_file(&path),
        _ => Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: None,
        }),
    }
}

/// Platform config file location (`~/.config/argoqc/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("argoqc").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<LoadedConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = parse_toml_config(&content)?;
    config.validate()?;
    Ok(LoadedConfig {
        config,
        source: Some(path.to_path_buf()),
    })
}
