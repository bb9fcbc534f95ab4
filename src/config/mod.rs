pub mod init;
mod schema;

pub use schema::{Config, ServerConfig, StorageConfig, DEFAULT_BIND, DEFAULT_CONNECT_TIMEOUT};

use anyhow::{Context, Result};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Get the config directory path (~/.config/team-points/)
pub fn get_config_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".config").join("team-points")
}

/// Get the default config file path (~/.config/team-points/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Default location of the member and category files
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| get_config_dir().join("data"))
        .join("team-points")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/team-points/config.yaml)
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
///
/// A missing default config file is not an error; defaults are used.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))
}

/// Parse configuration from YAML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_saphyr::from_str(content)?;
    Ok(config)
}

/// Validate configuration values
///
/// Returns Ok(()) if valid, or Err with a list of every problem found.
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Err(e) = config.server.bind.parse::<SocketAddr>() {
        errors.push(format!(
            "server.bind: invalid address '{}': {}",
            config.server.bind, e
        ));
    }

    match humantime::parse_duration(&config.storage.connect_timeout) {
        Ok(d) if d.is_zero() => {
            errors.push("storage.connect_timeout: must be greater than zero".to_string());
        }
        Ok(_) => {}
        Err(e) => errors.push(format!(
            "storage.connect_timeout: invalid duration '{}': {}",
            config.storage.connect_timeout, e
        )),
    }

    if let Some(ref dir) = config.server.static_dir {
        if dir.as_os_str().is_empty() {
            errors.push("server.static_dir: must not be empty".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl Config {
    /// Listen address. Call `validate_config` first for a friendly message.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.server.bind))
    }

    pub fn connect_timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.storage.connect_timeout).with_context(|| {
            format!(
                "Invalid connect timeout '{}'",
                self.storage.connect_timeout
            )
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Apply `PORT` and `TEAM_POINTS_DATA_DIR` style overrides.
    ///
    /// A port replaces only the port of the configured bind address.
    pub fn apply_overrides(&mut self, port: Option<u16>, data_dir: Option<PathBuf>) -> Result<()> {
        if let Some(port) = port {
            let mut addr = self.bind_addr()?;
            addr.set_port(port);
            self.server.bind = addr.to_string();
        }
        if let Some(dir) = data_dir {
            self.storage.data_dir = Some(dir);
        }
        Ok(())
    }
}
