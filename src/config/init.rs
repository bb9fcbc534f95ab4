use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{
    default_data_dir, get_config_path, validate_config, Config, ServerConfig, StorageConfig,
    DEFAULT_BIND, DEFAULT_CONNECT_TIMEOUT,
};

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
pub fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    Ok(parse_yes_no(&input, default_yes))
}

fn parse_yes_no(input: &str, default_yes: bool) -> bool {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        default_yes
    } else {
        input == "y" || input == "yes"
    }
}

/// Assemble a config from wizard answers. Empty optional answers mean "unset".
pub fn build_config(
    bind: &str,
    data_dir: &str,
    static_dir: &str,
    connect_timeout: &str,
) -> Result<Config, Vec<String>> {
    let optional_path = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| PathBuf::from(s))
    };

    let config = Config {
        server: ServerConfig {
            bind: bind.trim().to_string(),
            static_dir: optional_path(static_dir),
        },
        storage: StorageConfig {
            data_dir: optional_path(data_dir),
            connect_timeout: connect_timeout.trim().to_string(),
        },
    };

    validate_config(&config)?;
    Ok(config)
}

/// Run the interactive init wizard to create a config file.
///
/// If `default_path` is Some, uses that as the config file path.
/// Otherwise, prompts the user with the default config path.
pub fn run_init_wizard(default_path: Option<PathBuf>) -> Result<()> {
    println!();
    println!("Team Points Configuration");
    println!("=========================");
    println!();

    let config = loop {
        let bind = prompt_with_default("Listen address", DEFAULT_BIND)?;
        let data_dir = prompt_with_default(
            "Data directory",
            &default_data_dir().display().to_string(),
        )?;
        let static_dir = prompt("Web UI directory (empty for none): ")?;
        let timeout = prompt_with_default("Storage open timeout", DEFAULT_CONNECT_TIMEOUT)?;

        match build_config(&bind, &data_dir, &static_dir, &timeout) {
            Ok(config) => break config,
            Err(errors) => {
                println!("  Invalid settings:");
                for error in errors {
                    println!("    - {}", error);
                }
                println!("  Try again.");
                println!();
            }
        }
    };

    let default_config_path = default_path.unwrap_or_else(get_config_path);
    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    // Check if file already exists
    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!(
                "Config already exists at {}. Overwrite?",
                config_path.display()
            ),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    let yaml = serde_saphyr::to_string(&config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(&config_path, &yaml)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!();
    println!("Config written to {}", config_path.display());
    println!("Run `team-points serve` to start the server.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_parse_yes_no() {
        assert!(parse_yes_no("", true));
        assert!(!parse_yes_no("", false));
        assert!(parse_yes_no("Y", false));
        assert!(parse_yes_no(" yes ", false));
        assert!(!parse_yes_no("nope", true));
    }

    #[test]
    fn test_build_config() {
        let config = build_config("127.0.0.1:5000", "/srv/points", "", "5s").unwrap();
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/srv/points")));
        assert_eq!(config.server.static_dir, None);
    }

    #[test]
    fn test_build_config_reports_errors() {
        let errors = build_config("nowhere", "", "", "later").unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_written_config_loads_back() {
        let config = build_config("0.0.0.0:5001", "/srv/points", "./web", "10s").unwrap();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        assert_eq!(parse_config(&yaml).unwrap(), config);
    }
}
