// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Neighbor Table Export Tool

Loads every cell carrying one of the given labels, with children and links,
and prints the neighbor table (or the flat per-child table) as CSV.

Usage:
  cargo run --bin cellnet-export -- --label CBb5 --label CBb4 --grouping target

Example:
  cargo run --bin cellnet-export -- --label "GC ON" --grouping type --attribute diameter > gc_on.csv
*/

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use cellnet::aggregate::{
    AggregateParams, Aggregator, Attribute, Grouping, StructureCatalog, UnitScale, Units,
};
use cellnet::config::{load_config_or_default, validate_config};
use cellnet::ingest::{CancellationToken, CellLoader, IngestError, IngestResult, ODataClient};
use cellnet::observability::{init_logging, parse_debug_flags};

/// Export connectome neighbor tables as CSV
#[derive(Parser, Debug)]
#[command(name = "cellnet-export", version, long_about = None)]
struct Args {
    /// Cell label to load; repeat for several labels
    #[arg(short, long = "label", required = true)]
    labels: Vec<String>,

    /// Column grouping: "target" (neighbor labels) or "type" (child types)
    #[arg(short, long, default_value = "target")]
    grouping: Grouping,

    /// Show attribute values instead of counts: distance, diameter or confidence
    #[arg(short, long)]
    attribute: Option<Attribute>,

    /// Attribute units ("px" or "nm"); defaults to the configured units
    #[arg(short, long)]
    units: Option<Units>,

    /// Restrict to these child type codes
    #[arg(long = "child-type", value_name = "CODE")]
    child_types: Vec<String>,

    /// Print one line per child and neighbor instead of the table
    #[arg(long, default_value_t = false)]
    children: bool,

    /// Path to cellnet.toml (searched for when omitted; defaults apply if none is found)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the service base URL
    #[arg(long)]
    service_url: Option<String>,

    /// Enable debug logging for a crate (e.g. cellnet-ingest); repeatable
    #[arg(long = "debug", value_name = "CRATE")]
    debug: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(failed) if failed.is_empty() => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("cellnet-export: {} cell(s) failed to load:", failed.len());
            for failure in &failed {
                eprintln!("  {}", failure);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("cellnet-export: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Keep going on a partial load, collecting the failed cells
fn tolerate_partial<T>(stage: &str, result: IngestResult<T>, failed: &mut Vec<String>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(IngestError::PartialLoad { failures }) => {
            for failure in failures {
                warn!(
                    target: "cellnet-export",
                    "{}: cell {} (index {}) failed: {}",
                    stage,
                    failure.cell_id,
                    failure.cell_index,
                    failure.error
                );
                failed.push(format!(
                    "{}: cell {} (index {}): {}",
                    stage, failure.cell_id, failure.cell_index, failure.error
                ));
            }
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("{} failed", stage)),
    }
}

async fn run(args: Args) -> Result<Vec<String>> {
    let mut overrides = HashMap::new();
    if let Some(url) = &args.service_url {
        overrides.insert("service_url".to_string(), url.clone());
    }
    let config = load_config_or_default(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;

    let mut debug_flags = parse_debug_flags();
    debug_flags.enabled_crates.extend(args.debug.iter().cloned());
    let _logging = init_logging(&debug_flags, &config.logging)?;

    let client = ODataClient::new(
        config.service.base_url.clone(),
        Duration::from_secs(config.service.timeout_secs),
    )?;
    let loader = CellLoader::new(Arc::new(client), config.service.max_request_length);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(target: "cellnet-export", "Interrupted, cancelling load");
            on_interrupt.cancel();
        }
    });

    let types = loader
        .fetch_structure_types(&cancel)
        .await
        .context("Failed to load structure types")?;
    let groups = match &config.catalog.label_groups_path {
        Some(path) => StructureCatalog::load_label_groups(path)?,
        None => Vec::new(),
    };
    let catalog = StructureCatalog::from_parts(types, groups);

    let mut failed = Vec::new();
    let mut store = cellnet::ingest::CellStore::new();
    for label in &args.labels {
        let result = loader.load_cells(&mut store, label, &cancel).await;
        tolerate_partial("cells", result, &mut failed)?;
    }
    info!(
        target: "cellnet-export",
        "Loaded {} cells for {} label(s)",
        store.len(),
        args.labels.len()
    );

    let result = loader.load_children(&mut store, &cancel).await;
    tolerate_partial("children", result, &mut failed)?;
    let result = loader.load_links(&mut store, &cancel).await;
    tolerate_partial("links", result, &mut failed)?;

    let units = match args.units {
        Some(units) => units,
        None => config.units.default_units.parse::<Units>()?,
    };
    let mut params = AggregateParams::new((0..store.len()).collect(), args.grouping)
        .with_label_groups(config.catalog.use_label_groups)
        .with_units(units)
        .with_column_width(config.table.column_width);
    if let Some(attribute) = args.attribute {
        params = params.with_attribute(attribute);
    }
    if !args.child_types.is_empty() {
        let mut ids = Vec::with_capacity(args.child_types.len());
        for code in &args.child_types {
            let Some(found) = catalog.structure_types().iter().find(|t| &t.code == code) else {
                bail!("Unknown child type code: {}", code);
            };
            ids.push(found.id);
        }
        params = params.with_child_types(ids);
    }

    let aggregator = Aggregator::new(&store, &catalog, UnitScale::from(&config.units));
    let csv = if args.children {
        aggregator.table_as_csv_of_children(&params)?
    } else {
        aggregator.table_as_csv(&params)?
    };
    print!("{}", csv);

    if store.unattributed_links() > 0 {
        warn!(
            target: "cellnet-export",
            "{} link(s) could not be attributed to a loaded cell",
            store.unattributed_links()
        );
    }
    Ok(failed)
}
