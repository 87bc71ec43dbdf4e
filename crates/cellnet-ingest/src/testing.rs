// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the ingestion layer
//!
//! [`ScriptedSource`] answers requests from scripted pages and records every
//! request URI it sees. [`StoreFixture`] builds a populated [`CellStore`]
//! without going through a loader, for aggregation tests.

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{IngestError, IngestResult};
use crate::query::{Cursor, ODataQuery, Page};
use crate::source::VolumeSource;
use crate::store::{
    CellId, CellStore, Child, ChildId, ChildLocation, Location, Neighbor, Partner, TypeId,
};

type Responder = Box<dyn Fn(&str) -> IngestResult<Page> + Send + Sync>;

/// In-memory [`VolumeSource`] returning scripted pages
///
/// Lookup order for a request URI (filter query or cursor): scripted
/// failures, exact pages, then the first responder whose prefix matches.
/// Anything else answers with a 404 status error.
#[derive(Default)]
pub struct ScriptedSource {
    pages: AHashMap<String, Page>,
    responders: Vec<(String, Responder)>,
    failures: AHashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the rendered query `uri` with `page`
    pub fn with_page(mut self, uri: impl Into<String>, page: Page) -> Self {
        self.pages.insert(uri.into(), page);
        self
    }

    /// Answer a cursor read with `page`
    pub fn with_cursor(self, cursor: impl Into<String>, page: Page) -> Self {
        self.with_page(cursor, page)
    }

    /// Answer every request starting with `prefix` through `respond`
    pub fn with_responder<F>(mut self, prefix: impl Into<String>, respond: F) -> Self
    where
        F: Fn(&str) -> IngestResult<Page> + Send + Sync + 'static,
    {
        self.responders.push((prefix.into(), Box::new(respond)));
        self
    }

    /// Fail the request for `uri` with a transport error
    pub fn with_failure(mut self, uri: impl Into<String>) -> Self {
        self.failures.insert(uri.into());
        self
    }

    /// Every request URI seen so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn respond(&self, uri: &str) -> IngestResult<Page> {
        self.requests.lock().push(uri.to_string());

        if self.failures.contains(uri) {
            return Err(IngestError::Transport(format!(
                "scripted failure for {}",
                uri
            )));
        }
        if let Some(page) = self.pages.get(uri) {
            return Ok(page.clone());
        }
        if let Some((_, respond)) = self
            .responders
            .iter()
            .find(|(prefix, _)| uri.starts_with(prefix.as_str()))
        {
            return respond(uri);
        }
        Err(IngestError::Status {
            status: 404,
            uri: uri.to_string(),
        })
    }
}

#[async_trait]
impl VolumeSource for ScriptedSource {
    async fn read_by_filter(&self, query: &ODataQuery) -> IngestResult<Page> {
        self.respond(&query.uri())
    }

    async fn read_by_cursor(&self, cursor: &Cursor) -> IngestResult<Page> {
        self.respond(cursor.as_str())
    }
}

/// Distinct ids compared with `eq` in a filter expression or a full request
/// URI, in order
pub fn ids_in_filter(filter: &str) -> Vec<i64> {
    let mut seen = AHashSet::new();
    let mut tokens = filter.split_whitespace();
    let mut ids = Vec::new();
    while let Some(token) = tokens.next() {
        if token != "eq" {
            continue;
        }
        let parsed = tokens.next().and_then(|value| {
            let digits: String = value
                .trim_start_matches('(')
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '-')
                .collect();
            digits.parse::<i64>().ok()
        });
        if let Some(id) = parsed {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Builder for a populated [`CellStore`]
///
/// Panics when a referenced cell id has not been added first.
#[derive(Debug, Default)]
pub struct StoreFixture {
    store: CellStore,
}

impl StoreFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, id: CellId, label: &str, locations: Vec<Location>) -> Self {
        self.store.push_cell(id, label, locations);
        self
    }

    pub fn children(mut self, cell_id: CellId, children: Vec<Child>) -> Self {
        let index = self.index_of(cell_id);
        self.store.set_children(index, children);
        self
    }

    /// One partner entry per child of `cell_id`, in child order
    pub fn partners(mut self, cell_id: CellId, partners: Vec<Partner>) -> Self {
        let index = self.index_of(cell_id);
        self.store.set_partners(index, partners);
        self
    }

    pub fn neighbor_cell(mut self, id: CellId, label: Option<&str>) -> Self {
        self.store.insert_neighbor_cell(id, label.map(str::to_string));
        self
    }

    pub fn build(self) -> CellStore {
        self.store
    }

    fn index_of(&self, cell_id: CellId) -> usize {
        match self.store.cell_index_of(cell_id) {
            Some(index) => index,
            None => panic!("fixture cell {} has not been added", cell_id),
        }
    }
}

pub fn location(x: f64, y: f64, z: f64, radius: f64) -> Location {
    Location {
        id: 0,
        radius,
        x,
        y,
        z,
    }
}

pub fn child(id: ChildId, type_id: TypeId, locations: &[(f64, f64, f64, f64)]) -> Child {
    Child {
        id,
        type_id,
        confidence: None,
        locations: locations
            .iter()
            .map(|&(x, y, z, radius)| ChildLocation { x, y, z, radius })
            .collect(),
    }
}

/// Partner entry from `(neighbor child id, neighbor cell id)` pairs
pub fn partner(neighbors: &[(ChildId, Option<CellId>)]) -> Partner {
    Partner {
        neighbors: neighbors
            .iter()
            .map(|&(child_id, cell_id)| Neighbor { child_id, cell_id })
            .collect(),
    }
}
