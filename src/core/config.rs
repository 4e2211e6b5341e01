use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_EXCHANGERATE_API_URL: &str = "https://v6.exchangerate-api.com";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "product_prices_list.txt";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateApiConfig {
    #[serde(default = "default_exchangerate_api_url")]
    pub base_url: String,
    pub api_key: String,
}

fn default_exchangerate_api_url() -> String {
    DEFAULT_EXCHANGERATE_API_URL.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchangerate_api: ExchangeRateApiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportConfig {
    /// Defaults to `<data_path>/uploads`.
    pub directory: Option<String>,
    #[serde(default = "default_export_file_name")]
    pub file_name: String,
    #[serde(default = "default_true")]
    pub include_rate: bool,
    #[serde(default = "default_true")]
    pub include_reference_prices: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            directory: None,
            file_name: default_export_file_name(),
            include_rate: true,
            include_reference_prices: true,
        }
    }
}

fn default_export_file_name() -> String {
    DEFAULT_EXPORT_FILE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval_hours: default_interval_hours(),
        }
    }
}

fn default_interval_hours() -> u32 {
    24
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "rialsync", "rialsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "rialsync", "rialsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn export_path(&self) -> Result<PathBuf> {
        let directory = match &self.export.directory {
            Some(dir) => PathBuf::from(dir),
            None => self.default_data_path()?.join("uploads"),
        };
        Ok(directory.join(&self.export.file_name))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
