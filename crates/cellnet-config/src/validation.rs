// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are within usable ranges before any remote
//! request is issued.

use crate::{CellnetConfig, ConfigError, ConfigResult};

/// Shortest request a single link clause can produce
/// (`StructureLinks?$filter=(SourceID eq N or TargetID eq N)` plus headroom).
pub const MIN_REQUEST_LENGTH: usize = 64;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &CellnetConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_service(config, &mut errors);
    validate_units(config, &mut errors);
    validate_table(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_service(config: &CellnetConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.service.base_url.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "service.base_url".to_string(),
        });
    }
    if config.service.max_request_length < MIN_REQUEST_LENGTH {
        errors.push(ConfigValidationError::InvalidValue {
            field: "service.max_request_length".to_string(),
            reason: format!(
                "{} is shorter than a single link clause (minimum {})",
                config.service.max_request_length, MIN_REQUEST_LENGTH
            ),
        });
    }
    if config.service.timeout_secs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "service.timeout_secs".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
}

fn validate_units(config: &CellnetConfig, errors: &mut Vec<ConfigValidationError>) {
    if !matches!(config.units.default_units.as_str(), "nm" | "px") {
        errors.push(ConfigValidationError::InvalidValue {
            field: "units.default_units".to_string(),
            reason: format!("'{}' is not one of nm, px", config.units.default_units),
        });
    }
    if !(config.units.nm_per_pixel > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "units.nm_per_pixel".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if !(config.units.nm_per_section > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "units.nm_per_section".to_string(),
            reason: "must be positive".to_string(),
        });
    }
}

fn validate_table(config: &CellnetConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.table.histogram_bins == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "table.histogram_bins".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_request_length() {
        let mut config = CellnetConfig::default();
        config.service.max_request_length = 10;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("service.max_request_length"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = CellnetConfig::default();
        config.service.base_url = "  ".to_string();
        config.units.default_units = "furlongs".to_string();
        config.units.nm_per_pixel = 0.0;
        config.table.histogram_bins = 0;

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("service.base_url"));
        assert!(message.contains("units.default_units"));
        assert!(message.contains("units.nm_per_pixel"));
        assert!(message.contains("table.histogram_bins"));
    }
}
