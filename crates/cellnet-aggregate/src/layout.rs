// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Grid sizing hints for table consumers

use cellnet_config::TableConfig;
use serde::Serialize;

use crate::types::Attribute;

/// Row and column sizing for one table mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableLayout {
    pub row_height: u32,
    pub data_column_width: u32,
    /// Histogram bucket count; only meaningful when an attribute is shown
    pub histogram_bins: usize,
}

impl TableLayout {
    /// Count tables use the default row height and column width, attribute
    /// tables the histogram sizes
    pub fn for_attribute(attribute: Option<Attribute>, config: &TableConfig) -> Self {
        match attribute {
            None => Self {
                row_height: config.default_row_height,
                data_column_width: config.column_width,
                histogram_bins: config.histogram_bins,
            },
            Some(_) => Self {
                row_height: config.histogram_row_height,
                data_column_width: config.histogram_row_width,
                histogram_bins: config.histogram_bins,
            },
        }
    }
}
