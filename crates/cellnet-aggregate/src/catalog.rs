// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Structure type and label group catalog

use std::path::Path;

use cellnet_ingest::{StructureType, TypeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AggregateError, AggregateResult};

/// Named collection of cell labels shown as one table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelGroup {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl LabelGroup {
    pub fn new(name: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            name: name.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelGroupsFile {
    Bare(Vec<LabelGroup>),
    Wrapped { values: Vec<LabelGroup> },
}

/// Structure types plus label groups
#[derive(Debug, Clone, Default)]
pub struct StructureCatalog {
    types: Vec<StructureType>,
    child_type_indexes: Vec<usize>,
    groups: Vec<LabelGroup>,
}

impl StructureCatalog {
    /// Neighbor carrying the row cell's own label
    pub const GROUP_IN_CLASS: &'static str = "In Class";
    /// Neighbor that is the row cell itself
    pub const GROUP_SELF: &'static str = "Self";

    /// Build the catalog; the `In Class` and `Self` groups are appended last
    pub fn from_parts(types: Vec<StructureType>, mut groups: Vec<LabelGroup>) -> Self {
        groups.retain(|g| g.name != Self::GROUP_IN_CLASS && g.name != Self::GROUP_SELF);
        groups.push(LabelGroup::new(Self::GROUP_IN_CLASS, &[]));
        groups.push(LabelGroup::new(Self::GROUP_SELF, &[]));

        let child_type_indexes = types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.parent_id.is_some())
            .map(|(i, _)| i)
            .collect();

        Self {
            types,
            child_type_indexes,
            groups,
        }
    }

    /// Parse a label group document: either `[{name, labels}]` or
    /// `{"values": [{name, labels}]}`
    pub fn parse_label_groups(json: &str) -> AggregateResult<Vec<LabelGroup>> {
        let file: LabelGroupsFile = serde_json::from_str(json)
            .map_err(|e| AggregateError::Catalog(format!("invalid label groups: {}", e)))?;
        Ok(match file {
            LabelGroupsFile::Bare(groups) | LabelGroupsFile::Wrapped { values: groups } => groups,
        })
    }

    pub fn load_label_groups(path: &Path) -> AggregateResult<Vec<LabelGroup>> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AggregateError::Catalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        let groups = Self::parse_label_groups(&json)?;
        debug!(
            target: "cellnet-aggregate",
            "Loaded {} label groups from {}",
            groups.len(),
            path.display()
        );
        Ok(groups)
    }

    pub fn structure_types(&self) -> &[StructureType] {
        &self.types
    }

    /// Types that have a parent type, in catalog order
    pub fn child_types(&self) -> Vec<TypeId> {
        self.child_type_indexes
            .iter()
            .map(|&i| self.types[i].id)
            .collect()
    }

    fn find(&self, id: TypeId) -> Option<&StructureType> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn type_code(&self, id: TypeId) -> Option<&str> {
        self.find(id).map(|t| t.code.as_str())
    }

    pub fn type_name(&self, id: TypeId) -> Option<&str> {
        self.find(id).map(|t| t.name.as_str())
    }

    /// Position of a type among the child types
    pub fn child_type_position(&self, id: TypeId) -> Option<usize> {
        self.child_type_indexes
            .iter()
            .position(|&i| self.types[i].id == id)
    }

    pub fn groups(&self) -> &[LabelGroup] {
        &self.groups
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// First group listing `label`
    pub fn group_of_label(&self, label: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.labels.iter().any(|l| l == label))
            .map(|g| g.name.as_str())
    }

    pub fn labels_in_group(&self, name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.labels.as_slice())
    }

    pub fn is_label_in_group(&self, label: &str, name: &str) -> bool {
        self.labels_in_group(name)
            .is_some_and(|labels| labels.iter().any(|l| l == label))
    }
}
