// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Query axes: grouping, per-child attribute, units

use std::fmt;
use std::str::FromStr;

use cellnet_config::UnitsConfig;
use serde::{Deserialize, Serialize};

use crate::error::AggregateError;

/// Column-key strategy of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grouping {
    /// One column per (grouped) label of the cells on the far side of links
    TargetLabel = 0,
    /// One column per child structure type
    ChildType = 1,
}

impl TryFrom<u8> for Grouping {
    type Error = AggregateError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Grouping::TargetLabel),
            1 => Ok(Grouping::ChildType),
            other => Err(AggregateError::InvalidGrouping(format!(
                "unknown grouping code {}",
                other
            ))),
        }
    }
}

impl FromStr for Grouping {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "target" | "target-label" | "label" => Ok(Grouping::TargetLabel),
            "type" | "child-type" => Ok(Grouping::ChildType),
            other => Err(AggregateError::InvalidArgument(format!(
                "unknown grouping '{}'",
                other
            ))),
        }
    }
}

/// Per-child scalar shown instead of plain counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Distance from the child to the soma of its cell
    Distance,
    /// Largest diameter of the child
    Diameter,
    /// Detection confidence of the child
    Confidence,
}

impl FromStr for Attribute {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "distance" => Ok(Attribute::Distance),
            "diameter" => Ok(Attribute::Diameter),
            "confidence" => Ok(Attribute::Confidence),
            other => Err(AggregateError::InvalidArgument(format!(
                "unknown attribute '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Distance => "distance",
            Attribute::Diameter => "diameter",
            Attribute::Confidence => "confidence",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Units {
    Pixels,
    Nanometers,
}

impl FromStr for Units {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "px" => Ok(Units::Pixels),
            "nm" => Ok(Units::Nanometers),
            other => Err(AggregateError::InvalidArgument(format!(
                "unknown units '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Units::Pixels => "px",
            Units::Nanometers => "nm",
        })
    }
}

/// Physical scale of the volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    pub nm_per_pixel: f64,
    pub nm_per_section: f64,
}

impl UnitScale {
    /// Sections are thicker than pixels are wide; converts a z delta in
    /// sections to pixels
    pub fn pixels_per_section(&self) -> f64 {
        self.nm_per_section / self.nm_per_pixel
    }

    /// Convert a length measured in pixels
    pub fn convert(&self, pixels: f64, units: Units) -> f64 {
        match units {
            Units::Pixels => pixels,
            Units::Nanometers => pixels * self.nm_per_pixel,
        }
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::from(&UnitsConfig::default())
    }
}

impl From<&UnitsConfig> for UnitScale {
    fn from(config: &UnitsConfig) -> Self {
        Self {
            nm_per_pixel: config.nm_per_pixel,
            nm_per_section: config.nm_per_section,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_codes() {
        assert_eq!(Grouping::try_from(0).unwrap(), Grouping::TargetLabel);
        assert_eq!(Grouping::try_from(1).unwrap(), Grouping::ChildType);
        assert!(matches!(
            Grouping::try_from(2),
            Err(AggregateError::InvalidGrouping(_))
        ));
        assert_eq!("type".parse::<Grouping>().unwrap(), Grouping::ChildType);
        assert!(matches!(
            "rows".parse::<Grouping>(),
            Err(AggregateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_units_parse_and_convert() {
        let scale = UnitScale {
            nm_per_pixel: 2.0,
            nm_per_section: 90.0,
        };
        assert_eq!("nm".parse::<Units>().unwrap(), Units::Nanometers);
        assert!(matches!(
            "mm".parse::<Units>(),
            Err(AggregateError::InvalidArgument(_))
        ));
        assert_eq!(scale.convert(10.0, Units::Nanometers), 20.0);
        assert_eq!(scale.convert(10.0, Units::Pixels), 10.0);
        assert_eq!(scale.pixels_per_section(), 45.0);
    }

    #[test]
    fn test_attribute_parse() {
        assert_eq!("Diameter".parse::<Attribute>().unwrap(), Attribute::Diameter);
        assert!(matches!(
            "volume".parse::<Attribute>(),
            Err(AggregateError::InvalidArgument(_))
        ));
    }
}
