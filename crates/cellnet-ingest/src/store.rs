// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory indexed cache of ingested cells
//!
//! Cells are addressed by their *index* (insertion order) everywhere in the
//! ingestion and aggregation layers; ids are only used at the wire boundary
//! and for neighbor lookups. Every per-cell table (`locations`, `children`,
//! `partners`) is indexed the same way, so fan-out loads can write one slot
//! each without coordinating.
//!
//! Mutation is crate-private: only [`crate::CellLoader`] (and the test
//! fixtures) populate the store. Readers get shared references.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;

/// Remote structure identifier
pub type StructureId = i64;
/// Identifier of a cell (a top-level structure)
pub type CellId = StructureId;
/// Identifier of a child structure
pub type ChildId = StructureId;
/// Structure type identifier
pub type TypeId = i64;

/// One sampled point of a cell's morphology
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub id: StructureId,
    pub radius: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A loaded cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub id: CellId,
    /// Label the cell was loaded under
    pub label: String,
    /// Slot in the store's location table
    pub locations_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChildLocation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
}

/// A child structure (synapse, bouton, ...) owned by one cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Child {
    pub id: ChildId,
    pub type_id: TypeId,
    pub confidence: Option<f64>,
    pub locations: Vec<ChildLocation>,
}

/// Other end of one link from a child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    /// Child on the far side of the link
    pub child_id: ChildId,
    /// Cell owning that child, when the service reported a parent
    pub cell_id: Option<CellId>,
}

/// All neighbors reached through one child's links
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partner {
    pub neighbors: Vec<Neighbor>,
}

/// Directory entry for any cell seen so far (loaded or neighbor)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborCell {
    pub id: CellId,
    pub label: Option<String>,
}

/// Indexed cell cache
#[derive(Debug, Default)]
pub struct CellStore {
    cells: Vec<Cell>,
    locations: Vec<Vec<Location>>,
    children: Vec<Vec<Child>>,
    partners: Vec<Vec<Partner>>,
    cell_ids: AHashMap<CellId, usize>,
    directory: AHashMap<CellId, NeighborCell>,
    unattributed_links: Vec<usize>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything that has been loaded
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_at(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn cell_index_of(&self, id: CellId) -> Option<usize> {
        self.cell_ids.get(&id).copied()
    }

    /// Morphology of a cell, in page-arrival order
    pub fn locations_of(&self, index: usize) -> &[Location] {
        self.cells
            .get(index)
            .and_then(|cell| self.locations.get(cell.locations_index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Children of a cell (empty until `load_children` has run)
    pub fn children_of(&self, index: usize) -> &[Child] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_at(&self, cell_index: usize, child_index: usize) -> Option<&Child> {
        self.children.get(cell_index)?.get(child_index)
    }

    /// Children of a cell whose type is in `types` (all children when `None`),
    /// paired with their child index
    pub fn children_by_types<'a>(
        &'a self,
        cell_index: usize,
        types: Option<&'a [TypeId]>,
    ) -> impl Iterator<Item = (usize, &'a Child)> + 'a {
        self.children_of(cell_index)
            .iter()
            .enumerate()
            .filter(move |(_, child)| types.map_or(true, |t| t.contains(&child.type_id)))
    }

    /// Distinct child type ids across all loaded children, first-seen order
    pub fn available_child_types(&self) -> Vec<TypeId> {
        let mut seen = AHashSet::new();
        self.children
            .iter()
            .flatten()
            .map(|child| child.type_id)
            .filter(|type_id| seen.insert(*type_id))
            .collect()
    }

    pub fn partners_of(&self, cell_index: usize) -> &[Partner] {
        self.partners.get(cell_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn partner_at(&self, cell_index: usize, child_index: usize) -> Option<&Partner> {
        self.partners.get(cell_index)?.get(child_index)
    }

    /// Cell id on the far side of one neighbor entry
    pub fn neighbor_id_from_child_and_partner(
        &self,
        cell_index: usize,
        child_index: usize,
        partner_index: usize,
    ) -> Option<CellId> {
        self.partner_at(cell_index, child_index)?
            .neighbors
            .get(partner_index)?
            .cell_id
    }

    /// Directory lookup for a loaded or neighbor cell
    pub fn neighbor_cell(&self, id: CellId) -> Option<&NeighborCell> {
        self.directory.get(&id)
    }

    /// Linear scan of the cell's loaded children
    pub fn is_child_of_cell(&self, child_id: ChildId, cell_index: usize) -> bool {
        self.children_of(cell_index)
            .iter()
            .any(|child| child.id == child_id)
    }

    /// Links whose endpoints could not be attributed to the queried cell,
    /// summed over the latest link load of every cell
    pub fn unattributed_links(&self) -> usize {
        self.unattributed_links.iter().sum()
    }

    /// Unattributed links of one cell's latest link load
    pub fn unattributed_links_of(&self, cell_index: usize) -> usize {
        self.unattributed_links.get(cell_index).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Ingestion-side mutators
    // ------------------------------------------------------------------

    /// Append a cell with its first page of locations, returning its index.
    /// A cell id that is already known keeps its existing slot.
    pub(crate) fn push_cell(
        &mut self,
        id: CellId,
        label: &str,
        locations: Vec<Location>,
    ) -> (usize, bool) {
        if let Some(&index) = self.cell_ids.get(&id) {
            return (index, false);
        }

        let index = self.cells.len();
        let locations_index = self.locations.len();
        self.cells.push(Cell {
            id,
            label: label.to_string(),
            locations_index,
        });
        self.locations.push(locations);
        self.children.push(Vec::new());
        self.partners.push(Vec::new());
        self.unattributed_links.push(0);
        self.cell_ids.insert(id, index);
        self.directory.insert(
            id,
            NeighborCell {
                id,
                label: Some(label.to_string()),
            },
        );
        (index, true)
    }

    /// Clear a cell's children and partners ahead of a reload
    pub(crate) fn reset_children(&mut self, cell_index: usize) {
        if let Some(slot) = self.children.get_mut(cell_index) {
            slot.clear();
        }
        if let Some(slot) = self.partners.get_mut(cell_index) {
            slot.clear();
        }
        if let Some(count) = self.unattributed_links.get_mut(cell_index) {
            *count = 0;
        }
    }

    pub(crate) fn set_children(&mut self, cell_index: usize, children: Vec<Child>) {
        if let (Some(child_slot), Some(partner_slot)) = (
            self.children.get_mut(cell_index),
            self.partners.get_mut(cell_index),
        ) {
            *partner_slot = vec![Partner::default(); children.len()];
            *child_slot = children;
        }
    }

    /// Replace the partner list of a cell; one entry per child
    pub(crate) fn set_partners(&mut self, cell_index: usize, partners: Vec<Partner>) {
        if let Some(slot) = self.partners.get_mut(cell_index) {
            *slot = partners;
        }
    }

    pub(crate) fn insert_neighbor_cell(&mut self, id: CellId, label: Option<String>) {
        self.directory
            .entry(id)
            .or_insert(NeighborCell { id, label });
    }

    /// Record the unattributed link count of a cell's latest link load
    pub(crate) fn set_unattributed_links(&mut self, cell_index: usize, count: usize) {
        if let Some(slot) = self.unattributed_links.get_mut(cell_index) {
            *slot = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(id: ChildId, type_id: TypeId) -> Child {
        Child {
            id,
            type_id,
            confidence: None,
            locations: Vec::new(),
        }
    }

    #[test]
    fn test_push_cell_indexes_and_directory() {
        let mut store = CellStore::new();
        let (first, added) = store.push_cell(476, "CBb5", Vec::new());
        assert!(added);
        let (second, _) = store.push_cell(593, "CBb5", Vec::new());

        assert_eq!((first, second), (0, 1));
        assert_eq!(store.cell_index_of(593), Some(1));
        assert_eq!(store.cell_at(1).map(|c| c.locations_index), Some(1));
        assert_eq!(
            store.neighbor_cell(476).and_then(|c| c.label.as_deref()),
            Some("CBb5")
        );

        let (again, added) = store.push_cell(476, "CBb5", Vec::new());
        assert_eq!(again, 0);
        assert!(!added);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_children_lookups() {
        let mut store = CellStore::new();
        store.push_cell(1, "A", Vec::new());
        store.set_children(0, vec![child(10, 35), child(11, 28), child(12, 35)]);

        assert!(store.is_child_of_cell(11, 0));
        assert!(!store.is_child_of_cell(99, 0));
        assert_eq!(store.partners_of(0).len(), 3);

        let types = [35];
        let ids: Vec<_> = store
            .children_by_types(0, Some(&types[..]))
            .map(|(i, c)| (i, c.id))
            .collect();
        assert_eq!(ids, vec![(0, 10), (2, 12)]);
        assert_eq!(store.available_child_types(), vec![35, 28]);
    }

    #[test]
    fn test_reset_children_clears_partners() {
        let mut store = CellStore::new();
        store.push_cell(1, "A", Vec::new());
        store.set_children(0, vec![child(10, 35)]);
        store.set_partners(
            0,
            vec![Partner {
                neighbors: vec![Neighbor {
                    child_id: 20,
                    cell_id: Some(2),
                }],
            }],
        );
        assert_eq!(store.neighbor_id_from_child_and_partner(0, 0, 0), Some(2));

        store.set_unattributed_links(0, 2);
        assert_eq!(store.unattributed_links(), 2);

        store.reset_children(0);
        assert!(store.children_of(0).is_empty());
        assert!(store.partner_at(0, 0).is_none());
        assert_eq!(store.unattributed_links(), 0);
    }

    #[test]
    fn test_unattributed_links_sum_over_cells() {
        let mut store = CellStore::new();
        store.push_cell(1, "A", Vec::new());
        store.push_cell(2, "A", Vec::new());

        store.set_unattributed_links(0, 1);
        store.set_unattributed_links(1, 3);
        store.set_unattributed_links(0, 1);
        store.set_unattributed_links(7, 5);

        assert_eq!(store.unattributed_links_of(1), 3);
        assert_eq!(store.unattributed_links(), 4);
    }

    #[test]
    fn test_out_of_range_lookups_are_empty() {
        let store = CellStore::new();
        assert!(store.locations_of(3).is_empty());
        assert!(store.children_of(3).is_empty());
        assert!(store.child_at(3, 0).is_none());
        assert!(store.neighbor_id_from_child_and_partner(3, 0, 0).is_none());
    }
}
