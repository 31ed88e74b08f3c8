use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{
    model::{DEFAULT_MODELS, ForecastRequest},
    provider::open_meteo::{FORECAST_URL, MARINE_URL},
};

/// Offshore point in the Campos basin.
pub const DEFAULT_LATITUDE: f64 = -22.46;
pub const DEFAULT_LONGITUDE: f64 = -40.54;
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_FILE_PREFIX: &str = "OpenMeteo_FULL";

/// Everything one run needs, built once at startup.
///
/// Example TOML (every key optional):
/// ```toml
/// latitude = -22.46
/// longitude = -40.54
/// timezone = "America/Sao_Paulo"
/// outdir = "docs"
/// html = true
/// location_tag = "campos"
/// models = ["ecmwf_ifs025", "icon_seamless"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub past_hours: i64,
    pub future_hours: i64,
    /// Atmospheric models to compare side by side. Empty lets the upstream
    /// pick its best match.
    pub models: Vec<String>,

    /// Destination directory for generated files.
    pub outdir: PathBuf,
    /// Also render the HTML page.
    pub html: bool,

    /// Optional tag inserted in the CSV file name between prefix and date.
    pub location_tag: Option<String>,
    pub file_prefix: String,

    /// Per-request timeout.
    pub timeout_secs: u64,
    pub forecast_url: String,
    pub marine_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            timezone: DEFAULT_TIMEZONE.to_string(),
            past_hours: DEFAULT_WINDOW_HOURS,
            future_hours: DEFAULT_WINDOW_HOURS,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            outdir: PathBuf::from("."),
            html: false,
            location_tag: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            timeout_secs: 30,
            forecast_url: FORECAST_URL.to_string(),
            marine_url: MARINE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from the platform config directory, or return defaults if
    /// no file exists there yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load config from an explicit path. The file must exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the default config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "forecast-snapshot", "forecast-snapshot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Validate the point, zone, window and models and build the request.
    pub fn request(&self) -> crate::error::Result<ForecastRequest> {
        ForecastRequest::new(
            self.latitude,
            self.longitude,
            &self.timezone,
            self.past_hours,
            self.future_hours,
        )?
        .with_models(&self.models)
    }
}
