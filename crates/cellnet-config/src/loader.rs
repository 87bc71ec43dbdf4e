// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{CellnetConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "cellnet.toml";

/// Find the cellnet configuration file
///
/// Search order:
/// 1. `CELLNET_CONFIG_PATH` environment variable
/// 2. Current working directory: `./cellnet.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("CELLNET_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by CELLNET_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "cellnet configuration file '{}' not found in any of these locations:\n{}\n\nSet CELLNET_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<CellnetConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: CellnetConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Load configuration, falling back to built-in defaults when the search
/// finds no file
///
/// An explicit `config_path` or `CELLNET_CONFIG_PATH` must still exist.
/// Environment and CLI overrides are applied to the defaults as well, so a
/// service URL given on the command line is enough to run.
///
/// # Errors
///
/// Returns error if an explicitly named file is missing or any file found
/// contains invalid TOML
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<CellnetConfig> {
    if config_path.is_some() || env::var_os("CELLNET_CONFIG_PATH").is_some() {
        return load_config(config_path, cli_args);
    }

    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) => Ok(default_with_overrides(cli_args)),
        Err(e) => Err(e),
    }
}

fn default_with_overrides(cli_args: Option<&HashMap<String, String>>) -> CellnetConfig {
    let mut config = CellnetConfig::default();
    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }
    config
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `CELLNET_SERVICE_URL` -> `service.base_url`
/// - `CELLNET_TIMEOUT_SECS` -> `service.timeout_secs`
/// - `CELLNET_MAX_REQUEST_LENGTH` -> `service.max_request_length`
/// - `CELLNET_UNITS` -> `units.default_units`
/// - `CELLNET_LABEL_GROUPS` -> `catalog.label_groups_path`
/// - `CELLNET_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut CellnetConfig) {
    if let Ok(value) = env::var("CELLNET_SERVICE_URL") {
        config.service.base_url = value;
    }
    if let Ok(value) = env::var("CELLNET_TIMEOUT_SECS") {
        if let Ok(secs) = value.parse::<u64>() {
            config.service.timeout_secs = secs;
        }
    }
    if let Ok(value) = env::var("CELLNET_MAX_REQUEST_LENGTH") {
        if let Ok(length) = value.parse::<usize>() {
            config.service.max_request_length = length;
        }
    }
    if let Ok(value) = env::var("CELLNET_UNITS") {
        config.units.default_units = value;
    }
    if let Ok(value) = env::var("CELLNET_LABEL_GROUPS") {
        config.catalog.label_groups_path = Some(PathBuf::from(value));
    }
    if let Ok(value) = env::var("CELLNET_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"service_url": "http://10.0.0.1/", "units": "px"}`)
pub fn apply_cli_overrides(config: &mut CellnetConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("service_url") {
        config.service.base_url = value.clone();
    }
    if let Some(value) = cli_args.get("timeout_secs") {
        if let Ok(secs) = value.parse::<u64>() {
            config.service.timeout_secs = secs;
        }
    }
    if let Some(value) = cli_args.get("max_request_length") {
        if let Ok(length) = value.parse::<usize>() {
            config.service.max_request_length = length;
        }
    }
    if let Some(value) = cli_args.get("units") {
        config.units.default_units = value.clone();
    }
    if let Some(value) = cli_args.get("use_label_groups") {
        config.catalog.use_label_groups =
            value.to_lowercase() == "true" || value == "1" || value.to_lowercase() == "yes";
    }
    if let Some(value) = cli_args.get("label_groups") {
        config.catalog.label_groups_path = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("CELLNET_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("CELLNET_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("CELLNET_CONFIG_PATH", "/definitely/not/here/cellnet.toml");
        let result = find_config_file();
        env::remove_var("CELLNET_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved_url = env::var("CELLNET_SERVICE_URL").ok();
        let saved_len = env::var("CELLNET_MAX_REQUEST_LENGTH").ok();
        env::remove_var("CELLNET_SERVICE_URL");
        env::remove_var("CELLNET_MAX_REQUEST_LENGTH");

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cellnet.toml");
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[service]").unwrap();
        writeln!(file, "base_url = \"http://volume.example/OData/\"").unwrap();
        writeln!(file, "max_request_length = 2000").unwrap();
        writeln!(file, "[units]").unwrap();
        writeln!(file, "default_units = \"px\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.service.base_url, "http://volume.example/OData/");
        assert_eq!(config.service.max_request_length, 2000);
        assert_eq!(config.service.timeout_secs, 30);
        assert_eq!(config.units.default_units, "px");
        assert_eq!(config.table.histogram_bins, 10);

        if let Some(value) = saved_url {
            env::set_var("CELLNET_SERVICE_URL", value);
        }
        if let Some(value) = saved_len {
            env::set_var("CELLNET_MAX_REQUEST_LENGTH", value);
        }
    }

    #[test]
    fn test_defaults_take_cli_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved_url = env::var("CELLNET_SERVICE_URL").ok();
        env::remove_var("CELLNET_SERVICE_URL");

        let mut cli = HashMap::new();
        cli.insert("service_url".to_string(), "http://10.0.0.7/OData/".to_string());
        let config = default_with_overrides(Some(&cli));

        assert_eq!(config.service.base_url, "http://10.0.0.7/OData/");
        assert_eq!(
            config.service.max_request_length,
            CellnetConfig::default().service.max_request_length
        );

        if let Some(value) = saved_url {
            env::set_var("CELLNET_SERVICE_URL", value);
        }
    }

    #[test]
    fn test_explicit_missing_path_does_not_fall_back() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let result = load_config_or_default(Some(&missing), None);

        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = CellnetConfig::default();

        env::set_var("CELLNET_SERVICE_URL", "http://10.1.1.1/");
        env::set_var("CELLNET_MAX_REQUEST_LENGTH", "900");
        env::set_var("CELLNET_TIMEOUT_SECS", "not-a-number");

        apply_environment_overrides(&mut config);

        env::remove_var("CELLNET_SERVICE_URL");
        env::remove_var("CELLNET_MAX_REQUEST_LENGTH");
        env::remove_var("CELLNET_TIMEOUT_SECS");

        assert_eq!(config.service.base_url, "http://10.1.1.1/");
        assert_eq!(config.service.max_request_length, 900);
        // Unparsable values leave the previous setting untouched
        assert_eq!(config.service.timeout_secs, 30);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = CellnetConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("units".to_string(), "px".to_string());
        cli_args.insert("use_label_groups".to_string(), "no".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.units.default_units, "px");
        assert!(!config.catalog.use_label_groups);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cellnet.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[service]").unwrap();
        writeln!(file, "base_url = \"http://file-host/\"").unwrap();
        writeln!(file, "max_request_length = 1000").unwrap();

        env::set_var("CELLNET_SERVICE_URL", "http://env-host/");
        env::set_var("CELLNET_MAX_REQUEST_LENGTH", "1200");

        let mut cli_args = HashMap::new();
        cli_args.insert("service_url".to_string(), "http://cli-host/".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("CELLNET_SERVICE_URL");
        env::remove_var("CELLNET_MAX_REQUEST_LENGTH");

        // CLI wins for the URL, env wins for the length (no CLI override)
        assert_eq!(config.service.base_url, "http://cli-host/");
        assert_eq!(config.service.max_request_length, 1200);
    }
}
