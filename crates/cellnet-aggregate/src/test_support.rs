// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for unit tests

use cellnet_ingest::testing::{child, location, partner, StoreFixture};
use cellnet_ingest::{CellStore, StructureType, TypeId};

use crate::catalog::{LabelGroup, StructureCatalog};

pub fn structure_type(id: TypeId, code: &str, parent: Option<TypeId>) -> StructureType {
    StructureType {
        id,
        name: format!("type {}", id),
        code: code.to_string(),
        parent_id: parent,
    }
}

/// Cell type 1, child types `syn` (35) and `rib` (28); one `GC` label group
pub fn catalog() -> StructureCatalog {
    StructureCatalog::from_parts(
        vec![
            structure_type(1, "CELL", None),
            structure_type(35, "syn", Some(1)),
            structure_type(28, "rib", Some(1)),
        ],
        vec![LabelGroup::new("GC", &["GC ON", "GC OFF"])],
    )
}

/// Three loaded cells with resolved partners:
///
/// * cell 1 `CBb5`: syn 10 -> {GC ON 100, Rod BC 300}, syn 11 -> {GC OFF 200,
///   unresolved}, rib 12 -> {cell 2}
/// * cell 2 `CBb5`: rib 20 -> {cell 1}, rib 21 -> {}
/// * cell 3 `AC`: rib 30 -> {}
pub fn connected_store() -> CellStore {
    StoreFixture::new()
        .cell(1, "CBb5", vec![location(0.0, 0.0, 0.0, 10.0)])
        .cell(2, "CBb5", vec![location(50.0, 0.0, 0.0, 10.0)])
        .cell(3, "AC", Vec::new())
        .neighbor_cell(100, Some("GC ON"))
        .neighbor_cell(200, Some("GC OFF"))
        .neighbor_cell(300, Some("Rod BC"))
        .children(
            1,
            vec![
                child(10, 35, &[(3.0, 4.0, 0.0, 1.0)]),
                child(11, 35, &[(6.0, 8.0, 0.0, 4.0)]),
                child(12, 28, &[(0.0, 3.0, 0.0, 2.0)]),
            ],
        )
        .partners(
            1,
            vec![
                partner(&[(500, Some(100)), (501, Some(300))]),
                partner(&[(502, Some(200)), (503, None)]),
                partner(&[(504, Some(2))]),
            ],
        )
        .children(
            2,
            vec![
                child(20, 28, &[(50.0, 0.0, 0.0, 1.0)]),
                child(21, 28, &[]),
            ],
        )
        .partners(2, vec![partner(&[(505, Some(1))]), partner(&[])])
        .children(3, vec![child(30, 28, &[])])
        .build()
}
