//! Configuration File Loading
//!
//! Finds and loads the configuration from an explicit path or the usual
//! per-user locations, in TOML or JSON, falling back to defaults.

use super::{Config, ConfigError};
use crate::error::{Error, Result};
use crate::security_audit;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "AUTOCARD_CONFIG";

/// Configuration file loader
pub struct ConfigLoader {
    /// Search paths for configuration files (without extension)
    search_paths: Vec<PathBuf>,
    /// Supported configuration file formats
    supported_formats: Vec<ConfigFormat>,
    /// Current configuration file path (if loaded)
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }

    /// Format implied by a file extension; unknown extensions read as TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            search_paths: Self::get_search_paths(),
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
            current_path: None,
        }
    }

    /// Load configuration, preferring an explicit path, then `AUTOCARD_CONFIG`,
    /// then the search paths, then defaults
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let result = Self::load_unaudited(explicit);
        // Parse errors quote file content, which may include PINs
        if result.is_err() {
            let path = explicit.map(|path| format!("path={}", path.display()));
            security_audit::log_config_event(true, path.as_deref());
        }
        result
    }

    fn load_unaudited(explicit: Option<&Path>) -> Result<Config> {
        let mut loader = Self::new();

        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

        let config = match explicit {
            Some(path) => {
                let config = loader.load_config_file(&path, ConfigFormat::from_path(&path))?;
                loader.current_path = Some(path);
                config
            }
            None => match loader.find_and_load_config()? {
                Some((path, config)) => {
                    loader.current_path = Some(path);
                    config
                }
                None => {
                    debug!("No configuration file found, using defaults");
                    Config::default()
                }
            },
        };

        config.validate()?;

        if let Some(path) = &loader.current_path {
            info!("Configuration loaded from {}", path.display());
            security_audit::log_config_event(false, Some(&format!("path={}", path.display())));
        }
        Ok(config)
    }

    /// Save configuration to a specific path, format chosen by extension
    pub fn save_to_path(&self, config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let format = ConfigFormat::from_path(path);
        let content = match format {
            ConfigFormat::Json => {
                serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
                    format: format.name(),
                    reason: e.to_string(),
                })?
            }
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
                    format: format.name(),
                    reason: e.to_string(),
                })?
            }
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Find and load configuration from search paths
    fn find_and_load_config(&self) -> Result<Option<(PathBuf, Config)>> {
        for path in &self.search_paths {
            for format in &self.supported_formats {
                let config_path = path.with_extension(format.extension());

                if config_path.exists() {
                    match self.load_config_file(&config_path, *format) {
                        Ok(config) => return Ok(Some((config_path, config))),
                        Err(e) => {
                            warn!(
                                "Failed to load config from {}: {}",
                                config_path.display(),
                                e
                            );
                            continue;
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    /// Load a specific configuration file
    fn load_config_file(&self, path: &Path, format: ConfigFormat) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| ConfigError::Parse {
                format: format.name(),
                reason: e.to_string(),
            }),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                format: format.name(),
                reason: e.to_string(),
            }),
        };

        Ok(parsed?)
    }

    /// Get default search paths for configuration files
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("autocard").join("config"));
        }

        // XDG config home fallback (for platforms where dirs does not honour it)
        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join("autocard").join("config"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".autocard"));
        }

        paths
    }

    /// Get the current configuration file path
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }

    /// Load from the configured search paths only, without defaults
    pub fn load_from_search_paths(&mut self) -> Result<Config> {
        match self.find_and_load_config()? {
            Some((path, config)) => {
                self.current_path = Some(path);
                config.validate()?;
                Ok(config)
            }
            None => Err(ConfigError::NotFound.into()),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
