// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# cellnet Aggregation Layer

Turns an ingested [`CellStore`](cellnet_ingest::CellStore) into neighbor
tables: one row per cell, one column per target label (or label group) or
per child structure type. Each table cell keeps the list of children that
fall into it, so consumers can show counts, attribute histograms or
drill-down detail rows from the same data.

## Usage

```rust,no_run
use cellnet_aggregate::{AggregateParams, Aggregator, Grouping, StructureCatalog, UnitScale};
use cellnet_ingest::CellStore;

# fn run(store: &CellStore, catalog: &StructureCatalog) -> cellnet_aggregate::AggregateResult<()> {
let aggregator = Aggregator::new(store, catalog, UnitScale::default());
let params = AggregateParams::new((0..store.len()).collect(), Grouping::TargetLabel);

print!("{}", aggregator.table_as_csv(&params)?);
# Ok(())
# }
```
*/

pub mod attributes;
pub mod catalog;
pub mod csv;
pub mod details;
pub mod error;
pub mod histogram;
pub mod layout;
pub mod table;
pub mod types;

#[cfg(test)]
mod test_support;

pub use attributes::{child_attribute, diameter_px, distance_to_soma_px, soma_location};
pub use catalog::{LabelGroup, StructureCatalog};
pub use csv::{render_table_csv, CHILD_CSV_HEADER};
pub use details::{details_data, DetailRow};
pub use error::{AggregateError, AggregateResult};
pub use histogram::{
    histogram_max_y_from_table, histogram_max_y_from_values, histogram_values, Bin, LinearScale,
};
pub use layout::TableLayout;
pub use table::{
    clear_highlights, highlight_neighbor, sort_rows_by_column, table_data_max_value,
    AggregateParams, Aggregator, ChildValue, TableCell, TableRow, ID_COLUMN, LABEL_COLUMN,
};
pub use types::{Attribute, Grouping, SortDirection, UnitScale, Units};
