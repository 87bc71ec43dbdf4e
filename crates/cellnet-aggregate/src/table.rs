// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cross-tabulation of cells against target labels or child types
//!
//! A table row holds, per column, the raw list of [`ChildValue`]s that fall
//! into that column. Reductions (counts, maxima, histogram bins) are applied
//! by the consumer so the same table can be shown as counts or as attribute
//! distributions.

use ahash::AHashSet;
use cellnet_ingest::{Cell, CellId, CellStore, TypeId};
use serde::Serialize;
use tracing::debug;

use crate::attributes::child_attribute;
use crate::catalog::StructureCatalog;
use crate::error::{AggregateError, AggregateResult};
use crate::types::{Attribute, Grouping, SortDirection, UnitScale, Units};

/// Leading columns of every header
pub const ID_COLUMN: &str = "id";
pub const LABEL_COLUMN: &str = "label";

/// Arguments shared by every table-shaped query
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateParams {
    pub cell_indexes: Vec<usize>,
    /// Restrict to these child types; all types when `None`
    pub child_types: Option<Vec<TypeId>>,
    pub use_label_groups: bool,
    pub restrict_to_selected: bool,
    pub selected_targets: Vec<String>,
    pub grouping: Grouping,
    pub attribute: Option<Attribute>,
    pub units: Units,
    pub column_width: u32,
}

impl AggregateParams {
    pub fn new(cell_indexes: Vec<usize>, grouping: Grouping) -> Self {
        Self {
            cell_indexes,
            child_types: None,
            use_label_groups: true,
            restrict_to_selected: false,
            selected_targets: Vec::new(),
            grouping,
            attribute: None,
            units: Units::Nanometers,
            column_width: 100,
        }
    }

    pub fn with_child_types(mut self, child_types: Vec<TypeId>) -> Self {
        self.child_types = Some(child_types);
        self
    }

    pub fn with_label_groups(mut self, use_label_groups: bool) -> Self {
        self.use_label_groups = use_label_groups;
        self
    }

    /// Keep only these target columns
    pub fn with_selected_targets(mut self, targets: Vec<String>) -> Self {
        self.restrict_to_selected = true;
        self.selected_targets = targets;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attribute = Some(attribute);
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_column_width(mut self, column_width: u32) -> Self {
        self.column_width = column_width;
        self
    }

    fn child_types(&self) -> Option<&[TypeId]> {
        self.child_types.as_deref()
    }
}

/// One child contributing to a table cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChildValue {
    pub cell_index: usize,
    pub child_index: usize,
    /// Neighbor entry the child was grouped by (target grouping only)
    pub partner_index: Option<usize>,
    /// Attribute value, when an attribute was requested and computable
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCell {
    pub values: Vec<ChildValue>,
    pub width: u32,
    pub highlight: bool,
}

impl TableCell {
    fn new(width: u32) -> Self {
        Self {
            values: Vec::new(),
            width,
            highlight: false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One table row: a cell plus its data columns in header order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub id: CellId,
    pub label: String,
    pub cell_index: usize,
    pub columns: Vec<(String, TableCell)>,
}

impl TableRow {
    pub fn get(&self, column: &str) -> Option<&TableCell> {
        self.columns
            .iter()
            .find(|(key, _)| key == column)
            .map(|(_, cell)| cell)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut TableCell> {
        self.columns
            .iter_mut()
            .find(|(key, _)| key == column)
            .map(|(_, cell)| cell)
    }

    /// Column keys of this row, `id` and `label` first
    pub fn keys(&self) -> Vec<&str> {
        [ID_COLUMN, LABEL_COLUMN]
            .into_iter()
            .chain(self.columns.iter().map(|(key, _)| key.as_str()))
            .collect()
    }
}

/// Read-only view producing tables over a [`CellStore`]
pub struct Aggregator<'a> {
    store: &'a CellStore,
    catalog: &'a StructureCatalog,
    scale: UnitScale,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a CellStore, catalog: &'a StructureCatalog, scale: UnitScale) -> Self {
        Self {
            store,
            catalog,
            scale,
        }
    }

    pub fn store(&self) -> &'a CellStore {
        self.store
    }

    pub fn catalog(&self) -> &'a StructureCatalog {
        self.catalog
    }

    pub fn scale(&self) -> &UnitScale {
        &self.scale
    }

    pub(crate) fn cell(&self, cell_index: usize) -> AggregateResult<&'a Cell> {
        self.store
            .cell_at(cell_index)
            .ok_or(AggregateError::UnknownCell(cell_index))
    }

    /// Column key for one neighbor of a child of `row_cell`
    ///
    /// Neighbors without a resolved cell or without a known label have no key.
    pub fn target_key(
        &self,
        row_cell: &Cell,
        neighbor_id: Option<CellId>,
        use_label_groups: bool,
    ) -> Option<String> {
        let neighbor_id = neighbor_id?;
        let label = self.store.neighbor_cell(neighbor_id)?.label.as_deref()?;

        if !use_label_groups {
            return Some(label.to_string());
        }
        if neighbor_id == row_cell.id {
            return Some(StructureCatalog::GROUP_SELF.to_string());
        }
        if label == row_cell.label {
            return Some(StructureCatalog::GROUP_IN_CLASS.to_string());
        }
        Some(
            self.catalog
                .group_of_label(label)
                .unwrap_or(label)
                .to_string(),
        )
    }

    /// Ordered column keys: `id`, `label`, then the data columns
    ///
    /// # Errors
    /// * `AggregateError::UnknownCell` - a cell index is not in the store
    /// * `AggregateError::UnknownChildType` - a child type has no catalog code
    ///
    pub fn header_data(&self, params: &AggregateParams) -> AggregateResult<Vec<String>> {
        let mut header = vec![ID_COLUMN.to_string(), LABEL_COLUMN.to_string()];
        match params.grouping {
            Grouping::TargetLabel => header.extend(self.target_columns(params)?),
            Grouping::ChildType => {
                for type_id in self.type_columns(params) {
                    header.push(self.type_code(type_id)?.to_string());
                }
            }
        }
        Ok(header)
    }

    fn type_code(&self, type_id: TypeId) -> AggregateResult<&'a str> {
        self.catalog
            .type_code(type_id)
            .ok_or(AggregateError::UnknownChildType(type_id))
    }

    /// Distinct target keys in discovery order; with label groups the
    /// `In Class` and `Self` columns always close the list
    fn target_columns(&self, params: &AggregateParams) -> AggregateResult<Vec<String>> {
        let mut seen = AHashSet::new();
        let mut targets = Vec::new();

        for &cell_index in &params.cell_indexes {
            let cell = self.cell(cell_index)?;
            for (child_index, _) in self.store.children_by_types(cell_index, params.child_types())
            {
                let Some(partner) = self.store.partner_at(cell_index, child_index) else {
                    continue;
                };
                for neighbor in &partner.neighbors {
                    let Some(key) =
                        self.target_key(cell, neighbor.cell_id, params.use_label_groups)
                    else {
                        continue;
                    };
                    let pseudo = params.use_label_groups
                        && (key == StructureCatalog::GROUP_IN_CLASS
                            || key == StructureCatalog::GROUP_SELF);
                    if !pseudo && seen.insert(key.clone()) {
                        targets.push(key);
                    }
                }
            }
        }

        if params.use_label_groups {
            targets.push(StructureCatalog::GROUP_IN_CLASS.to_string());
            targets.push(StructureCatalog::GROUP_SELF.to_string());
        }
        if params.restrict_to_selected {
            targets.retain(|t| params.selected_targets.contains(t));
        }
        Ok(targets)
    }

    /// Child types shown as columns, in catalog order
    fn type_columns(&self, params: &AggregateParams) -> Vec<TypeId> {
        let mut types = match params.child_types() {
            Some(types) => types.to_vec(),
            None => self.store.available_child_types(),
        };
        let mut seen = AHashSet::new();
        types.retain(|t| seen.insert(*t));
        // Stable: types missing from the catalog keep their relative order at the end
        types.sort_by_key(|t| self.catalog.child_type_position(*t).unwrap_or(usize::MAX));
        types
    }

    fn value_of(&self, params: &AggregateParams, cell_index: usize, child_index: usize) -> Option<f64> {
        params.attribute.and_then(|attribute| {
            child_attribute(
                self.store,
                cell_index,
                child_index,
                attribute,
                params.units,
                &self.scale,
            )
        })
    }

    /// One row per requested cell, each with exactly the header's data columns
    pub fn table_data(&self, params: &AggregateParams) -> AggregateResult<Vec<TableRow>> {
        let header = self.header_data(params)?;
        let table = match params.grouping {
            Grouping::TargetLabel => self.table_by_target(params, &header[2..])?,
            Grouping::ChildType => self.table_by_type(params, &header[2..])?,
        };

        debug!(
            target: "cellnet-aggregate",
            "Built {:?} table: {} rows x {} columns",
            params.grouping,
            table.len(),
            header.len()
        );
        Ok(table)
    }

    fn empty_row(&self, cell_index: usize, columns: &[String], width: u32) -> AggregateResult<TableRow> {
        let cell = self.cell(cell_index)?;
        Ok(TableRow {
            id: cell.id,
            label: cell.label.clone(),
            cell_index,
            columns: columns
                .iter()
                .map(|key| (key.clone(), TableCell::new(width)))
                .collect(),
        })
    }

    fn table_by_target(
        &self,
        params: &AggregateParams,
        columns: &[String],
    ) -> AggregateResult<Vec<TableRow>> {
        let mut table = Vec::with_capacity(params.cell_indexes.len());
        for &cell_index in &params.cell_indexes {
            let cell = self.cell(cell_index)?;
            let mut row = self.empty_row(cell_index, columns, params.column_width)?;

            for (child_index, _) in self.store.children_by_types(cell_index, params.child_types())
            {
                let Some(partner) = self.store.partner_at(cell_index, child_index) else {
                    continue;
                };
                for (partner_index, neighbor) in partner.neighbors.iter().enumerate() {
                    let Some(key) =
                        self.target_key(cell, neighbor.cell_id, params.use_label_groups)
                    else {
                        continue;
                    };
                    // Columns filtered out by the selection are dropped here
                    if let Some(column) = row.get_mut(&key) {
                        column.values.push(ChildValue {
                            cell_index,
                            child_index,
                            partner_index: Some(partner_index),
                            value: self.value_of(params, cell_index, child_index),
                        });
                    }
                }
            }
            table.push(row);
        }
        Ok(table)
    }

    fn table_by_type(
        &self,
        params: &AggregateParams,
        columns: &[String],
    ) -> AggregateResult<Vec<TableRow>> {
        let types = self.type_columns(params);
        let mut table = Vec::with_capacity(params.cell_indexes.len());

        for &cell_index in &params.cell_indexes {
            let mut row = self.empty_row(cell_index, columns, params.column_width)?;
            for (position, type_id) in types.iter().enumerate() {
                let wanted = [*type_id];
                let values = self
                    .store
                    .children_by_types(cell_index, Some(&wanted[..]))
                    .map(|(child_index, _)| ChildValue {
                        cell_index,
                        child_index,
                        partner_index: None,
                        value: self.value_of(params, cell_index, child_index),
                    })
                    .collect();
                row.columns[position].1.values = values;
            }
            table.push(row);
        }
        Ok(table)
    }
}

/// Largest value-list length (count mode) or largest attribute value across
/// the data columns of `table`
pub fn table_data_max_value(
    header: &[String],
    table: &[TableRow],
    attribute: Option<Attribute>,
) -> f64 {
    let mut max_value = 0.0f64;
    for row in table {
        for column in header.iter().skip(2) {
            let Some(cell) = row.get(column) else {
                continue;
            };
            match attribute {
                None => max_value = max_value.max(cell.len() as f64),
                Some(_) => {
                    for value in cell.values.iter().filter_map(|v| v.value) {
                        max_value = max_value.max(value);
                    }
                }
            }
        }
    }
    max_value
}

/// Whether `value` reaches the cell `neighbor_id`
fn touches_neighbor(store: &CellStore, value: &ChildValue, neighbor_id: CellId) -> bool {
    match value.partner_index {
        Some(partner_index) => {
            store.neighbor_id_from_child_and_partner(value.cell_index, value.child_index, partner_index)
                == Some(neighbor_id)
        }
        None => store
            .partner_at(value.cell_index, value.child_index)
            .is_some_and(|p| p.neighbors.iter().any(|n| n.cell_id == Some(neighbor_id))),
    }
}

/// Flag every table cell holding a child linked to `neighbor_id`
///
/// Returns the `(row, column)` positions that were highlighted.
pub fn highlight_neighbor(
    table: &mut [TableRow],
    store: &CellStore,
    neighbor_id: CellId,
) -> Vec<(usize, String)> {
    let mut highlighted = Vec::new();
    for (row_index, row) in table.iter_mut().enumerate() {
        for (key, cell) in row.columns.iter_mut() {
            if cell.values.iter().any(|v| touches_neighbor(store, v, neighbor_id)) {
                cell.highlight = true;
                highlighted.push((row_index, key.clone()));
            }
        }
    }
    highlighted
}

pub fn clear_highlights(table: &mut [TableRow], highlighted: &[(usize, String)]) {
    for (row_index, key) in highlighted {
        if let Some(cell) = table.get_mut(*row_index).and_then(|row| row.get_mut(key)) {
            cell.highlight = false;
        }
    }
}

/// Stable sort of rows by one column
///
/// Data columns sort by value-list length, `id` numerically and `label`
/// lexically. Ties keep their current order in both directions.
pub fn sort_rows_by_column(table: &mut [TableRow], column: &str, direction: SortDirection) {
    let ordering = |a: &TableRow, b: &TableRow| match column {
        ID_COLUMN => a.id.cmp(&b.id),
        LABEL_COLUMN => a.label.cmp(&b.label),
        _ => {
            let len = |row: &TableRow| row.get(column).map_or(0, TableCell::len);
            len(a).cmp(&len(b))
        }
    };
    match direction {
        SortDirection::Ascending => table.sort_by(ordering),
        SortDirection::Descending => table.sort_by(|a, b| ordering(b, a)),
    }
}
