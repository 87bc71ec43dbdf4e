// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-child scalar attributes

use cellnet_ingest::{CellStore, Child, Location};

use crate::types::{Attribute, UnitScale, Units};

/// Location of the cell with the largest radius
pub fn soma_location(locations: &[Location]) -> Option<&Location> {
    locations
        .iter()
        .max_by(|a, b| a.radius.total_cmp(&b.radius))
}

/// Mean position of a child's locations, z in sections
pub fn child_centroid(child: &Child) -> Option<(f64, f64, f64)> {
    if child.locations.is_empty() {
        return None;
    }
    let n = child.locations.len() as f64;
    let (x, y, z) = child
        .locations
        .iter()
        .fold((0.0, 0.0, 0.0), |(x, y, z), l| (x + l.x, y + l.y, z + l.z));
    Some((x / n, y / n, z / n))
}

/// Distance in pixels from the child to the soma of `cell_index`
pub fn distance_to_soma_px(
    store: &CellStore,
    cell_index: usize,
    child: &Child,
    scale: &UnitScale,
) -> Option<f64> {
    let soma = soma_location(store.locations_of(cell_index))?;
    let (x, y, z) = child_centroid(child)?;

    let dx = x - soma.x;
    let dy = y - soma.y;
    let dz = (z - soma.z) * scale.pixels_per_section();
    Some((dx * dx + dy * dy + dz * dz).sqrt())
}

/// Twice the largest location radius of the child, in pixels
pub fn diameter_px(child: &Child) -> Option<f64> {
    child
        .locations
        .iter()
        .map(|l| l.radius)
        .max_by(f64::total_cmp)
        .map(|radius| radius * 2.0)
}

/// Value of `attribute` for one child; `None` when it cannot be computed
pub fn child_attribute(
    store: &CellStore,
    cell_index: usize,
    child_index: usize,
    attribute: Attribute,
    units: Units,
    scale: &UnitScale,
) -> Option<f64> {
    let child = store.child_at(cell_index, child_index)?;
    match attribute {
        Attribute::Distance => distance_to_soma_px(store, cell_index, child, scale)
            .map(|px| scale.convert(px, units)),
        Attribute::Diameter => diameter_px(child).map(|px| scale.convert(px, units)),
        Attribute::Confidence => child.confidence,
    }
}
