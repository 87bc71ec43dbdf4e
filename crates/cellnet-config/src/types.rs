// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `cellnet.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CellnetConfig {
    pub service: ServiceConfig,
    pub units: UnitsConfig,
    pub table: TableConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

/// Remote volume service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the OData endpoint, e.g. `http://host/Service.svc/`
    pub base_url: String,
    pub timeout_secs: u64,
    /// Longest request URI the service accepts. Link filters are split so
    /// that no issued request exceeds this many characters.
    pub max_request_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 30,
            max_request_length: 1400,
        }
    }
}

/// Physical unit conversion
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UnitsConfig {
    /// "nm" or "px"
    pub default_units: String,
    pub nm_per_pixel: f64,
    pub nm_per_section: f64,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            default_units: "nm".to_string(),
            nm_per_pixel: 2.18,
            nm_per_section: 90.0,
        }
    }
}

/// Overview table and histogram layout
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    pub column_width: u32,
    pub histogram_bins: usize,
    pub histogram_row_width: u32,
    pub histogram_row_height: u32,
    pub default_row_height: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            column_width: 100,
            histogram_bins: 10,
            histogram_row_width: 200,
            histogram_row_height: 100,
            default_row_height: 30,
        }
    }
}

/// Label group catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON file of `[{"name": .., "labels": [..]}]`
    pub label_groups_path: Option<PathBuf>,
    pub use_label_groups: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            label_groups_path: None,
            use_label_groups: true,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Directory for rolling log files (only used with file logging)
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file_dir: None,
        }
    }
}
