// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Length-bounded filter batching and link attribution
//!
//! The volume service rejects request URIs above a fixed size, so filters
//! made of many per-id clauses are split into several requests. The limit is
//! measured on the rendered request URI ([`ODataQuery::uri`]); a clause is
//! never split, and each clause lands in exactly one request.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::IngestResult;
use crate::page_fetcher::PageFetcher;
use crate::query::ODataQuery;
use crate::records::{decode_all, LinkRecord};
use crate::source::VolumeSource;
use crate::store::{CellStore, ChildId};

/// Plans OR-filters that fit within a maximum request length
#[derive(Debug, Clone, Copy)]
pub struct FilterBatcher {
    max_request_length: usize,
}

impl FilterBatcher {
    pub fn new(max_request_length: usize) -> Self {
        Self { max_request_length }
    }

    pub fn max_request_length(&self) -> usize {
        self.max_request_length
    }

    /// Group `clauses` into `(c1 or c2 or ...)` filters and build one query
    /// per group with `build`.
    ///
    /// Before a clause is appended, the query it would produce is rendered and
    /// measured; if that exceeds the limit, the current group is flushed and
    /// the clause starts the next one.
    pub fn plan<I, F>(&self, clauses: I, build: F) -> Vec<ODataQuery>
    where
        I: IntoIterator<Item = String>,
        F: Fn(String) -> ODataQuery,
    {
        let mut queries = Vec::new();
        let mut current: Option<String> = None;

        for clause in clauses {
            if let Some(filter) = current.take() {
                let candidate = format!("{} or {}", filter, clause);
                if self.fits(&build, &candidate) {
                    current = Some(candidate);
                    continue;
                }
                queries.push(build(format!("({})", filter)));
            }

            if !self.fits(&build, &clause) {
                warn!(
                    target: "cellnet-ingest",
                    "Single filter clause exceeds {} characters: {}",
                    self.max_request_length,
                    clause
                );
            }
            current = Some(clause);
        }

        if let Some(filter) = current {
            queries.push(build(format!("({})", filter)));
        }
        queries
    }

    fn fits<F>(&self, build: &F, filter: &str) -> bool
    where
        F: Fn(String) -> ODataQuery,
    {
        build(format!("({})", filter)).uri().len() <= self.max_request_length
    }
}

/// Builds and issues the cross-link queries for a set of children
#[derive(Debug, Clone, Copy)]
pub struct LinkBatcher {
    batcher: FilterBatcher,
}

impl LinkBatcher {
    pub const COLLECTION: &'static str = "StructureLinks";

    pub fn new(max_request_length: usize) -> Self {
        Self {
            batcher: FilterBatcher::new(max_request_length),
        }
    }

    pub fn link_clause(child_id: ChildId) -> String {
        format!("SourceID eq {} or TargetID eq {}", child_id, child_id)
    }

    /// Split the link filter for `child_ids` into bounded requests
    pub fn plan(&self, child_ids: &[ChildId]) -> Vec<ODataQuery> {
        self.batcher
            .plan(child_ids.iter().map(|id| Self::link_clause(*id)), |filter| {
                ODataQuery::new(Self::COLLECTION)
                    .filter(filter)
                    .select(["SourceID", "TargetID"])
            })
    }

    /// Issue every planned request concurrently and concatenate the links
    /// in plan order
    pub async fn fetch_links<S>(
        &self,
        fetcher: &PageFetcher<S>,
        child_ids: &[ChildId],
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<LinkRecord>>
    where
        S: VolumeSource + ?Sized,
    {
        let queries = self.plan(child_ids);
        debug!(
            target: "cellnet-ingest",
            "Fetching links for {} children in {} request(s)",
            child_ids.len(),
            queries.len()
        );

        let batches = join_all(queries.iter().map(|q| fetcher.fetch_all(q, cancel))).await;

        let mut links = Vec::new();
        for batch in batches {
            links.extend(decode_all::<LinkRecord>(batch?)?);
        }
        Ok(links)
    }
}

/// Which side of a link belongs to the cell under inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAttribution {
    /// `own` is the link source; `partner` is the target
    Outgoing { own: ChildId, partner: ChildId },
    /// `own` is the link target; `partner` is the source
    Incoming { own: ChildId, partner: ChildId },
    /// Neither endpoint belongs to the cell
    Unattributed,
}

impl LinkAttribution {
    /// Attribute `link` using an arbitrary membership test
    ///
    /// The target is tested first, so a link between two children of the
    /// same cell is kept as an incoming self-link on its target child.
    pub fn classify<F>(link: &LinkRecord, is_member: F) -> Self
    where
        F: Fn(ChildId) -> bool,
    {
        if is_member(link.target_id) {
            LinkAttribution::Incoming {
                own: link.target_id,
                partner: link.source_id,
            }
        } else if is_member(link.source_id) {
            LinkAttribution::Outgoing {
                own: link.source_id,
                partner: link.target_id,
            }
        } else {
            LinkAttribution::Unattributed
        }
    }

    /// Attribute `link` against the loaded children of `cell_index`
    pub fn resolve(link: &LinkRecord, store: &CellStore, cell_index: usize) -> Self {
        Self::classify(link, |id| store.is_child_of_cell(id, cell_index))
    }

    /// `(own, partner)` child ids, when attributed
    pub fn endpoints(&self) -> Option<(ChildId, ChildId)> {
        match *self {
            LinkAttribution::Outgoing { own, partner }
            | LinkAttribution::Incoming { own, partner } => Some((own, partner)),
            LinkAttribution::Unattributed => None,
        }
    }
}
