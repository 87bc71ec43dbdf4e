// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # cellnet - Connectome Neighbor Explorer
//!
//! Loads cells, their children (synapses, ribbons, ...) and the links between
//! children from a remote OData volume service, then cross-tabulates every
//! cell against the cells it connects to.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! cellnet = "0.1"  # Default: OData over HTTP
//! ```
//!
//! ## Feature Flags
//!
//! - **`http`** (default): `ODataClient` transport over reqwest
//! - **`file-logging`**: rolling log files via tracing-appender
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cellnet::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = cellnet::config::load_config(None, None)?;
//! let client = ODataClient::new(
//!     config.service.base_url.clone(),
//!     Duration::from_secs(config.service.timeout_secs),
//! )?;
//! let loader = CellLoader::new(Arc::new(client), config.service.max_request_length);
//! let cancel = CancellationToken::new();
//!
//! let mut store = CellStore::new();
//! loader.load_cells(&mut store, "CBb5", &cancel).await?;
//! loader.load_children(&mut store, &cancel).await?;
//! loader.load_links(&mut store, &cancel).await?;
//!
//! let types = loader.fetch_structure_types(&cancel).await?;
//! let catalog = StructureCatalog::from_parts(types, Vec::new());
//! let aggregator = Aggregator::new(&store, &catalog, UnitScale::from(&config.units));
//! let params = AggregateParams::new((0..store.len()).collect(), Grouping::TargetLabel);
//! print!("{}", aggregator.table_as_csv(&params)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: cellnet-config, cellnet-observability      │
//! │  (TOML config, tracing setup)                           │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Ingestion: cellnet-ingest                              │
//! │  (PageFetcher, LinkBatcher, CellStore, ODataClient)     │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Aggregation: cellnet-aggregate                         │
//! │  (neighbor tables, histograms, detail rows, CSV)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use cellnet_config as config;
pub use cellnet_observability as observability;

// Re-export data layers
pub use cellnet_aggregate as aggregate;
pub use cellnet_ingest as ingest;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::aggregate::{
        AggregateError, AggregateParams, Aggregator, Attribute, DetailRow, Grouping,
        StructureCatalog, TableRow, UnitScale, Units,
    };
    pub use crate::config::CellnetConfig;
    pub use crate::ingest::{
        CancellationToken, CellLoader, CellStore, IngestError, PageFetcher, VolumeSource,
    };

    #[cfg(feature = "http")]
    pub use crate::ingest::ODataClient;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;

        let store = CellStore::new();
        let catalog = StructureCatalog::default();
        let aggregator = Aggregator::new(&store, &catalog, UnitScale::default());
        let params = AggregateParams::new(Vec::new(), Grouping::ChildType);
        assert_eq!(aggregator.table_as_csv(&params).unwrap(), "id, label\n");
    }
}
