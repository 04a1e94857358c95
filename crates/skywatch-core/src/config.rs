use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Longest forecast the weather API serves.
const MAX_FORECAST_DAYS: u32 = 14;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Weather API and dashboard settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the weather API (WeatherAPI-compatible)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key sent as the `key` query parameter
    #[serde(default)]
    pub api_key: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Temperature unit preference
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Refresh interval in seconds
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Days requested for the detailed forecast
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    /// Autocomplete debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Cities always kept fresh alongside favorites
    #[serde(default = "default_top_cities")]
    pub top_cities: Vec<String>,

    /// How many of `top_cities` are refreshed
    #[serde(default = "default_top_city_count")]
    pub top_city_count: usize,
}

fn default_api_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_forecast_days() -> u32 {
    7
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_top_cities() -> Vec<String> {
    [
        "Delhi",
        "Mumbai",
        "Bengaluru",
        "Chennai",
        "Kolkata",
        "Hyderabad",
        "Pune",
        "Ahmedabad",
        "Jaipur",
        "Lucknow",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_top_city_count() -> usize {
    8
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            temperature_unit: TemperatureUnit::Celsius,
            refresh_interval_secs: default_refresh_interval_secs(),
            forecast_days: default_forecast_days(),
            debounce_ms: default_debounce_ms(),
            top_cities: default_top_cities(),
            top_city_count: default_top_city_count(),
        }
    }
}

impl WeatherConfig {
    /// Check if an API key is configured (not a placeholder)
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.starts_with("YOUR_")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding persisted dashboard state (favorites)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skywatch")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist.
    /// Environment variables override the file.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file, writing defaults if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("WEATHER_API_KEY") {
            if !key.trim().is_empty() {
                self.weather.api_key = key;
            }
        }
        if let Ok(url) = std::env::var("WEATHER_API_URL") {
            if !url.trim().is_empty() {
                self.weather.api_url = url;
            }
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_url, "weather.api_url", &mut result);

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                "Weather API key not configured - requests will be rejected",
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.refresh_interval_secs == 0 {
            result.add_error(
                "weather.refresh_interval_secs",
                "Refresh interval must be greater than 0",
            );
        } else if self.weather.refresh_interval_secs > 86_400 {
            result.add_warning(
                "weather.refresh_interval_secs",
                "Weather refresh interval is more than 24 hours",
            );
        }

        if self.weather.forecast_days == 0 {
            result.add_error("weather.forecast_days", "Forecast days must be greater than 0");
        } else if self.weather.forecast_days > MAX_FORECAST_DAYS {
            result.add_error(
                "weather.forecast_days",
                format!("Forecast days cannot exceed {}", MAX_FORECAST_DAYS),
            );
        }

        if self.weather.top_city_count > self.weather.top_cities.len() {
            result.add_warning(
                "weather.top_city_count",
                format!(
                    "Only {} top cities configured, fewer than top_city_count",
                    self.weather.top_cities.len()
                ),
            );
        }

        if self.storage.data_dir.is_file() {
            result.add_error(
                "storage.data_dir",
                format!(
                    "Path is not a directory: {}",
                    self.storage.data_dir.display()
                ),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skywatch");

        Ok(config_dir.join("config.toml"))
    }
}
