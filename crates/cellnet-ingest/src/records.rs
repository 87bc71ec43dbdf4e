// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed wire records
//!
//! Field names follow the service (`ID`, `ParentID`, `VolumeX`, ...).
//! Expanded navigation properties arrive either as a bare array or as a
//! nested page (`{"results": [...], "__next": "..."}`).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::IngestResult;
use crate::query::Cursor;
use crate::store::{StructureId, TypeId};

/// Decode one raw record
pub fn decode<T: DeserializeOwned>(value: Value) -> IngestResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Decode every raw record of a result set
pub fn decode_all<T: DeserializeOwned>(values: Vec<Value>) -> IngestResult<Vec<T>> {
    values.into_iter().map(decode).collect()
}

/// Expanded navigation property
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expansion<T> {
    Inline(Vec<T>),
    Paged {
        results: Vec<T>,
        #[serde(rename = "__next", default)]
        next: Option<String>,
    },
}

impl<T> Expansion<T> {
    /// Split into the inline records and the continuation cursor
    pub fn into_parts(self) -> (Vec<T>, Option<Cursor>) {
        match self {
            Expansion::Inline(results) => (results, None),
            Expansion::Paged { results, next } => {
                (results, next.filter(|c| !c.is_empty()).map(Cursor::new))
            }
        }
    }
}

impl<T> Default for Expansion<T> {
    fn default() -> Self {
        Expansion::Inline(Vec::new())
    }
}

/// One `Locations` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocationRecord {
    #[serde(rename = "ID", default)]
    pub id: StructureId,
    #[serde(default)]
    pub radius: f64,
    pub volume_x: f64,
    pub volume_y: f64,
    pub z: f64,
}

/// One `Structures` entry (cell or child, depending on the query)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructureRecord {
    #[serde(rename = "ID")]
    pub id: StructureId,
    #[serde(rename = "ParentID", default)]
    pub parent_id: Option<StructureId>,
    #[serde(rename = "TypeID", default)]
    pub type_id: Option<TypeId>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub locations: Expansion<LocationRecord>,
}

/// One `StructureLinks` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct LinkRecord {
    #[serde(rename = "SourceID")]
    pub source_id: StructureId,
    #[serde(rename = "TargetID")]
    pub target_id: StructureId,
}

/// One `StructureTypes` entry, as used by the catalog
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructureType {
    #[serde(rename = "ID")]
    pub id: TypeId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "ParentID", default)]
    pub parent_id: Option<TypeId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structure_with_paged_locations() {
        let record: StructureRecord = decode(json!({
            "ID": 476,
            "Locations": {
                "results": [
                    {"ID": 1, "Radius": 310.5, "VolumeX": 10.0, "VolumeY": 20.0, "Z": 3}
                ],
                "__next": "Structures(476)/Locations?$skiptoken=1"
            }
        }))
        .unwrap();

        let (locations, next) = record.locations.into_parts();
        assert_eq!(record.id, 476);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].radius, 310.5);
        assert_eq!(
            next,
            Some(Cursor::new("Structures(476)/Locations?$skiptoken=1"))
        );
    }

    #[test]
    fn test_structure_with_inline_locations() {
        let record: StructureRecord = decode(json!({
            "ID": 90210,
            "TypeID": 35,
            "Confidence": 0.5,
            "Locations": [{"VolumeX": 1.0, "VolumeY": 2.0, "Z": 3.0}]
        }))
        .unwrap();

        assert_eq!(record.type_id, Some(35));
        assert_eq!(record.confidence, Some(0.5));
        let (locations, next) = record.locations.into_parts();
        assert_eq!(locations.len(), 1);
        assert!(next.is_none());
    }

    #[test]
    fn test_missing_id_is_a_decode_error() {
        let result: IngestResult<StructureRecord> = decode(json!({"TypeID": 1}));
        assert!(matches!(result, Err(crate::IngestError::Decode(_))));
    }
}
