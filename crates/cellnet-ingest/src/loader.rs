// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cell, child and link loading
//!
//! Each load fans out one future per cell, joins them all, and only then
//! writes into the [`CellStore`]; every branch produces the data for exactly
//! one cell slot. Branch failures are collected into
//! [`IngestError::PartialLoad`] after the successful slots have been stored.
//! A cancelled load writes nothing.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CellLoadFailure, IngestError, IngestResult};
use crate::link_batcher::{FilterBatcher, LinkAttribution, LinkBatcher};
use crate::page_fetcher::PageFetcher;
use crate::query::{quote_literal, Cursor, ODataQuery};
use crate::records::{decode_all, LocationRecord, StructureRecord, StructureType};
use crate::source::VolumeSource;
use crate::store::{
    CellId, CellStore, Child, ChildId, ChildLocation, Location, Neighbor, Partner,
};

const STRUCTURES: &str = "Structures";
const STRUCTURE_TYPES: &str = "StructureTypes";

const CELL_FIELDS: [&str; 7] = [
    "ID",
    "Label",
    "Locations/ID",
    "Locations/Radius",
    "Locations/VolumeX",
    "Locations/VolumeY",
    "Locations/Z",
];

const CHILD_FIELDS: [&str; 7] = [
    "ID",
    "TypeID",
    "Confidence",
    "Locations/VolumeX",
    "Locations/VolumeY",
    "Locations/Z",
    "Locations/Radius",
];

impl From<LocationRecord> for Location {
    fn from(record: LocationRecord) -> Self {
        Location {
            id: record.id,
            radius: record.radius,
            x: record.volume_x,
            y: record.volume_y,
            z: record.z,
        }
    }
}

impl From<LocationRecord> for ChildLocation {
    fn from(record: LocationRecord) -> Self {
        ChildLocation {
            x: record.volume_x,
            y: record.volume_y,
            z: record.z,
            radius: record.radius,
        }
    }
}

/// One cell decoded from the cell query, before it is stored
struct PendingCell {
    id: CellId,
    locations: Vec<Location>,
    next: Option<Cursor>,
}

/// Drives paginated, batched reads into a [`CellStore`]
pub struct CellLoader<S: ?Sized> {
    fetcher: PageFetcher<S>,
    batcher: FilterBatcher,
    links: LinkBatcher,
}

impl<S: VolumeSource + ?Sized> CellLoader<S> {
    /// Create a loader; `max_request_length` bounds every batched filter
    pub fn new(source: Arc<S>, max_request_length: usize) -> Self {
        Self {
            fetcher: PageFetcher::new(source),
            batcher: FilterBatcher::new(max_request_length),
            links: LinkBatcher::new(max_request_length),
        }
    }

    pub fn fetcher(&self) -> &PageFetcher<S> {
        &self.fetcher
    }

    pub fn link_batcher(&self) -> &LinkBatcher {
        &self.links
    }

    /// Query for all cells carrying `label`, with their first page of locations
    pub fn cells_query(label: &str) -> ODataQuery {
        ODataQuery::new(STRUCTURES)
            .filter(format!("(Label eq {})", quote_literal(label)))
            .expand("Locations")
            .select(CELL_FIELDS)
    }

    /// Query for every child of one cell
    pub fn children_query(cell_id: CellId) -> ODataQuery {
        ODataQuery::new(STRUCTURES)
            .filter(format!("ParentID eq {}", cell_id))
            .expand("Locations")
            .select(CHILD_FIELDS)
    }

    /// Load every cell labelled `label`, completing each cell's location list
    ///
    /// Cells already in the store are skipped. Returns the indexes of the cells
    /// that were added.
    ///
    /// # Errors
    /// * `IngestError::Cancelled` - nothing was stored
    /// * `IngestError::PartialLoad` - some location continuations failed; those
    ///   cells are stored with the locations read so far
    /// * any transport or decode error of the cell query itself
    ///
    pub async fn load_cells(
        &self,
        store: &mut CellStore,
        label: &str,
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<usize>> {
        let query = Self::cells_query(label);
        let records: Vec<StructureRecord> =
            decode_all(self.fetcher.fetch_all(&query, cancel).await?)?;

        let mut pending: Vec<PendingCell> = records
            .into_iter()
            .filter(|record| store.cell_index_of(record.id).is_none())
            .map(|record| {
                let (locations, next) = record.locations.into_parts();
                PendingCell {
                    id: record.id,
                    locations: locations.into_iter().map(Location::from).collect(),
                    next,
                }
            })
            .collect();

        let continuations = join_all(pending.iter().enumerate().filter_map(|(slot, cell)| {
            cell.next.clone().map(|cursor| async move {
                let more = self.fetcher.fetch_from_cursor(cursor, cancel).await;
                (slot, more.and_then(decode_all::<LocationRecord>))
            })
        }))
        .await;
        ensure_not_cancelled(cancel, &continuations)?;

        debug!(
            target: "cellnet-ingest",
            "Label {}: {} new cells, {} needed location continuations",
            label,
            pending.len(),
            continuations.len()
        );

        let mut failed_slots = Vec::new();
        for (slot, result) in continuations {
            match result {
                Ok(more) => pending[slot]
                    .locations
                    .extend(more.into_iter().map(Location::from)),
                Err(error) => failed_slots.push((slot, error)),
            }
        }

        let added: Vec<usize> = pending
            .iter_mut()
            .map(|cell| {
                store
                    .push_cell(cell.id, label, std::mem::take(&mut cell.locations))
                    .0
            })
            .collect();

        let failures = failed_slots
            .into_iter()
            .map(|(slot, error)| CellLoadFailure {
                cell_index: added[slot],
                cell_id: pending[slot].id,
                error: Box::new(error),
            })
            .collect();

        info!(
            target: "cellnet-ingest",
            "Loaded {} cells for label {}",
            added.len(),
            label
        );
        finish(failures)?;
        Ok(added)
    }

    /// Load the children of every stored cell
    ///
    /// Each cell's children are cleared before its fetch starts, so a repeated
    /// call replaces earlier data. A cell whose children do not fit in one page
    /// fails with `PaginationOverflow` without affecting the other cells.
    pub async fn load_children(
        &self,
        store: &mut CellStore,
        cancel: &CancellationToken,
    ) -> IngestResult<()> {
        let cell_ids: Vec<CellId> = store.cells().iter().map(|cell| cell.id).collect();
        for index in 0..cell_ids.len() {
            store.reset_children(index);
        }

        let results = join_all(cell_ids.iter().enumerate().map(|(index, &id)| async move {
            (index, self.fetch_children(index, id, cancel).await)
        }))
        .await;
        ensure_not_cancelled(cancel, &results)?;

        let mut failures = Vec::new();
        let mut total = 0usize;
        for (index, result) in results {
            match result {
                Ok(children) => {
                    total += children.len();
                    store.set_children(index, children);
                }
                Err(error) => {
                    warn!(
                        target: "cellnet-ingest",
                        "Children of cell {} failed to load: {}",
                        cell_ids[index],
                        error
                    );
                    failures.push(CellLoadFailure {
                        cell_index: index,
                        cell_id: cell_ids[index],
                        error: Box::new(error),
                    });
                }
            }
        }

        info!(
            target: "cellnet-ingest",
            "Loaded {} children across {} cells",
            total,
            cell_ids.len()
        );
        finish(failures)
    }

    async fn fetch_children(
        &self,
        cell_index: usize,
        cell_id: CellId,
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<Child>> {
        let page = self
            .fetcher
            .fetch_first(&Self::children_query(cell_id), cancel)
            .await?;
        if page.next.is_some() {
            return Err(IngestError::PaginationOverflow {
                cell_index,
                cell_id,
            });
        }

        let records: Vec<StructureRecord> = decode_all(page.results)?;
        let mut children = Vec::with_capacity(records.len());
        for record in records {
            let type_id = record.type_id.ok_or_else(|| {
                IngestError::MalformedPage(format!("child {} has no TypeID", record.id))
            })?;

            let (first, next) = record.locations.into_parts();
            let mut locations: Vec<ChildLocation> =
                first.into_iter().map(ChildLocation::from).collect();
            if let Some(cursor) = next {
                let more = self.fetcher.fetch_from_cursor(cursor, cancel).await?;
                locations.extend(
                    decode_all::<LocationRecord>(more)?
                        .into_iter()
                        .map(ChildLocation::from),
                );
            }

            children.push(Child {
                id: record.id,
                type_id,
                confidence: record.confidence,
                locations,
            });
        }
        Ok(children)
    }

    /// Load the cross-links of every stored cell's children and resolve the
    /// cell on the far side of each link
    ///
    /// Links whose endpoints cannot be attributed to the queried cell are
    /// logged and counted in [`CellStore::unattributed_links`].
    pub async fn load_links(
        &self,
        store: &mut CellStore,
        cancel: &CancellationToken,
    ) -> IngestResult<()> {
        let child_ids: Vec<Vec<ChildId>> = (0..store.len())
            .map(|index| store.children_of(index).iter().map(|c| c.id).collect())
            .collect();

        let results = join_all(child_ids.iter().enumerate().map(|(index, ids)| async move {
            (index, self.links.fetch_links(&self.fetcher, ids, cancel).await)
        }))
        .await;
        ensure_not_cancelled(cancel, &results)?;

        let mut failures = Vec::new();
        let mut attributed: Vec<(usize, Vec<Partner>, usize)> = Vec::new();

        for (index, result) in results {
            let links = match result {
                Ok(links) => links,
                Err(error) => {
                    failures.push(CellLoadFailure {
                        cell_index: index,
                        cell_id: store.cells()[index].id,
                        error: Box::new(error),
                    });
                    continue;
                }
            };

            let positions: AHashMap<ChildId, usize> = child_ids[index]
                .iter()
                .enumerate()
                .map(|(position, id)| (*id, position))
                .collect();
            let mut partners = vec![Partner::default(); positions.len()];
            let mut unattributed = 0usize;
            let mut seen = AHashSet::new();

            for link in &links {
                if !seen.insert((link.source_id, link.target_id)) {
                    continue;
                }
                match LinkAttribution::classify(link, |id| positions.contains_key(&id)).endpoints()
                {
                    Some((own, partner)) => {
                        if let Some(&position) = positions.get(&own) {
                            partners[position].neighbors.push(Neighbor {
                                child_id: partner,
                                cell_id: None,
                            });
                        }
                    }
                    None => {
                        unattributed += 1;
                        warn!(
                            target: "cellnet-ingest",
                            "Link {} -> {} cannot be attributed to cell {}",
                            link.source_id,
                            link.target_id,
                            store.cells()[index].id
                        );
                    }
                }
            }
            attributed.push((index, partners, unattributed));
        }

        // Resolve far-side children to their cells, then unseen cells to labels
        let mut owners: AHashMap<ChildId, CellId> = AHashMap::new();
        for (index, cell) in store.cells().iter().enumerate() {
            for child in store.children_of(index) {
                owners.insert(child.id, cell.id);
            }
        }
        let mut unknown_children = Vec::new();
        let mut seen_children = AHashSet::new();
        for neighbor in attributed
            .iter()
            .flat_map(|(_, partners, _)| partners)
            .flat_map(|partner| &partner.neighbors)
        {
            if !owners.contains_key(&neighbor.child_id) && seen_children.insert(neighbor.child_id)
            {
                unknown_children.push(neighbor.child_id);
            }
        }
        owners.extend(self.resolve_parents(&unknown_children, cancel).await?);

        for (_, partners, _) in attributed.iter_mut() {
            for neighbor in partners.iter_mut().flat_map(|p| p.neighbors.iter_mut()) {
                neighbor.cell_id = owners.get(&neighbor.child_id).copied();
            }
        }

        let mut unknown_cells = Vec::new();
        let mut seen_cells = AHashSet::new();
        for neighbor in attributed
            .iter()
            .flat_map(|(_, partners, _)| partners)
            .flat_map(|partner| &partner.neighbors)
        {
            if let Some(cell_id) = neighbor.cell_id {
                if store.neighbor_cell(cell_id).is_none() && seen_cells.insert(cell_id) {
                    unknown_cells.push(cell_id);
                }
            }
        }
        let labels = self.resolve_labels(&unknown_cells, cancel).await?;

        let mut unattributed = 0usize;
        for (index, partners, count) in attributed {
            store.set_partners(index, partners);
            store.set_unattributed_links(index, count);
            unattributed += count;
        }
        for cell_id in unknown_cells {
            store.insert_neighbor_cell(cell_id, labels.get(&cell_id).cloned());
        }

        info!(
            target: "cellnet-ingest",
            "Links loaded: {} neighbor cells resolved, {} unattributed links",
            seen_cells.len(),
            unattributed
        );
        finish(failures)
    }

    /// Parent cell of each child id (children without a parent are absent)
    async fn resolve_parents(
        &self,
        child_ids: &[ChildId],
        cancel: &CancellationToken,
    ) -> IngestResult<AHashMap<ChildId, CellId>> {
        let records = self.lookup_by_id(child_ids, ["ID", "ParentID"], cancel).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| record.parent_id.map(|parent| (record.id, parent)))
            .collect())
    }

    /// Label of each cell id (cells without a label are absent)
    async fn resolve_labels(
        &self,
        cell_ids: &[CellId],
        cancel: &CancellationToken,
    ) -> IngestResult<AHashMap<CellId, String>> {
        let records = self.lookup_by_id(cell_ids, ["ID", "Label"], cancel).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| record.label.map(|label| (record.id, label)))
            .collect())
    }

    async fn lookup_by_id(
        &self,
        ids: &[i64],
        select: [&str; 2],
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<StructureRecord>> {
        let queries = self
            .batcher
            .plan(ids.iter().map(|id| format!("ID eq {}", id)), |filter| {
                ODataQuery::new(STRUCTURES).filter(filter).select(select)
            });

        let pages = join_all(queries.iter().map(|q| self.fetcher.fetch_all(q, cancel))).await;
        let mut records = Vec::new();
        for page in pages {
            records.extend(decode_all::<StructureRecord>(page?)?);
        }
        Ok(records)
    }

    /// Load the structure type catalog
    pub async fn fetch_structure_types(
        &self,
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<StructureType>> {
        let query = ODataQuery::new(STRUCTURE_TYPES).select(["ID", "Name", "Code", "ParentID"]);
        let mut types: Vec<StructureType> =
            decode_all(self.fetcher.fetch_all(&query, cancel).await?)?;
        for structure_type in types.iter_mut() {
            structure_type.name = structure_type.name.trim().to_string();
        }

        debug!(target: "cellnet-ingest", "Loaded {} structure types", types.len());
        Ok(types)
    }
}

fn ensure_not_cancelled<T>(
    cancel: &CancellationToken,
    results: &[(usize, IngestResult<T>)],
) -> IngestResult<()> {
    let cancelled = cancel.is_cancelled()
        || results
            .iter()
            .any(|(_, result)| matches!(result, Err(IngestError::Cancelled)));
    if cancelled {
        debug!(target: "cellnet-ingest", "Load cancelled; discarding fetched data");
        return Err(IngestError::Cancelled);
    }
    Ok(())
}

fn finish(failures: Vec<CellLoadFailure>) -> IngestResult<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(IngestError::PartialLoad { failures })
    }
}
