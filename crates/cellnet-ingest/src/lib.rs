// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# cellnet Ingestion Layer

Loads cells (neurons), their morphology locations, their children (synapses,
boutons, ...) and the cross-links between children from a remote OData
volume service into an in-memory [`CellStore`].

## Architecture

```text
┌─────────────────────────────────────────────────────────────────┐
│                      CellLoader                                  │
│  load_cells · load_children · load_links · structure types      │
└──────────────┬──────────────────────────────┬───────────────────┘
               ↓                              ↓
┌──────────────────────────┐   ┌──────────────────────────────────┐
│  PageFetcher             │   │  LinkBatcher / FilterBatcher     │
│  follows `next` cursors  │   │  length-bounded OR filters       │
└──────────────┬───────────┘   └──────────────┬───────────────────┘
               ↓                              ↓
┌─────────────────────────────────────────────────────────────────┐
│          VolumeSource (ODataClient over HTTP, or scripted)       │
└─────────────────────────────────────────────────────────────────┘
```

All per-cell requests fan out concurrently and are joined before any
result is written into the store; each branch owns exactly one cell slot.
Every load takes a `CancellationToken` so a stale load can be abandoned.

## Usage

```rust,no_run
use std::sync::Arc;
use std::time::Duration;
use cellnet_ingest::{CellLoader, CellStore, ODataClient};
use tokio_util::sync::CancellationToken;

# async fn run() -> cellnet_ingest::IngestResult<()> {
let client = ODataClient::new("http://volume.example/OData/", Duration::from_secs(30))?;
let loader = CellLoader::new(Arc::new(client), 1400);
let cancel = CancellationToken::new();

let mut store = CellStore::new();
loader.load_cells(&mut store, "CBb5", &cancel).await?;
loader.load_children(&mut store, &cancel).await?;
loader.load_links(&mut store, &cancel).await?;
# Ok(())
# }
```
*/

pub mod error;
pub mod link_batcher;
pub mod loader;
pub mod page_fetcher;
pub mod query;
pub mod records;
pub mod source;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{CellLoadFailure, IngestError, IngestResult};
pub use link_batcher::{FilterBatcher, LinkAttribution, LinkBatcher};
pub use loader::CellLoader;
pub use page_fetcher::PageFetcher;
pub use query::{Cursor, ODataQuery, Page};
pub use records::{LinkRecord, StructureType};
pub use source::VolumeSource;
pub use store::{
    Cell, CellId, CellStore, Child, ChildId, ChildLocation, Location, Neighbor, NeighborCell,
    Partner, StructureId, TypeId,
};

#[cfg(feature = "http")]
pub use http::ODataClient;

/// Re-export so callers do not need a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;
