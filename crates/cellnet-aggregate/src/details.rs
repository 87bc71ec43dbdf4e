// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Drill-down rows for one table cell

use cellnet_ingest::{CellId, CellStore, ChildId};
use serde::Serialize;

use crate::error::{AggregateError, AggregateResult};
use crate::table::ChildValue;
use crate::types::{Attribute, Grouping};

const NONE: &str = "none";

/// One row of the detail view of a table cell
///
/// The variant is fixed by the grouping and by whether an attribute is shown;
/// see [`DetailRow::columns`] for the matching header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DetailRow {
    /// Target grouping, counts: one row per distinct target cell
    TargetCount {
        target_id: CellId,
        count: usize,
        child_ids: Vec<ChildId>,
    },
    /// Target grouping, attribute: one row per value
    TargetValue {
        child_id: ChildId,
        target_id: CellId,
        value: Option<f64>,
    },
    /// Child type grouping, counts: one row per child with all its targets
    ChildTargets {
        child_id: ChildId,
        target_ids: Vec<CellId>,
        target_labels: Vec<String>,
    },
    /// Child type grouping, attribute
    ChildTargetsValue {
        child_id: ChildId,
        target_ids: Vec<CellId>,
        target_labels: Vec<String>,
        value: Option<f64>,
    },
}

fn join<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        return NONE.to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

impl DetailRow {
    /// Header names for the detail rows of a grouping
    pub fn columns(grouping: Grouping, attribute: Option<Attribute>) -> &'static [&'static str] {
        match (grouping, attribute.is_some()) {
            (Grouping::TargetLabel, false) => &["target id", "count", "child ids"],
            (Grouping::TargetLabel, true) => &["child id", "target id", "child value"],
            (Grouping::ChildType, false) => &["child id", "target label", "target id"],
            (Grouping::ChildType, true) => &["child id", "target label", "target id", "child value"],
        }
    }

    /// Rendered fields in [`DetailRow::columns`] order
    pub fn fields(&self) -> Vec<String> {
        match self {
            DetailRow::TargetCount {
                target_id,
                count,
                child_ids,
            } => vec![target_id.to_string(), count.to_string(), join(child_ids)],
            DetailRow::TargetValue {
                child_id,
                target_id,
                value,
            } => vec![child_id.to_string(), target_id.to_string(), optional(*value)],
            DetailRow::ChildTargets {
                child_id,
                target_ids,
                target_labels,
            } => vec![child_id.to_string(), join(target_labels), join(target_ids)],
            DetailRow::ChildTargetsValue {
                child_id,
                target_ids,
                target_labels,
                value,
            } => vec![
                child_id.to_string(),
                join(target_labels),
                join(target_ids),
                optional(*value),
            ],
        }
    }
}

fn child_id(store: &CellStore, value: &ChildValue) -> AggregateResult<ChildId> {
    store
        .child_at(value.cell_index, value.child_index)
        .map(|child| child.id)
        .ok_or(AggregateError::UnknownCell(value.cell_index))
}

fn shape_error(grouping: Grouping) -> AggregateError {
    AggregateError::InvalidGrouping(format!(
        "value shape does not match {:?} grouping",
        grouping
    ))
}

/// Resolved target of a target-grouped value
fn target_of(store: &CellStore, value: &ChildValue) -> AggregateResult<Option<CellId>> {
    let partner_index = value
        .partner_index
        .ok_or_else(|| shape_error(Grouping::TargetLabel))?;
    Ok(store.neighbor_id_from_child_and_partner(value.cell_index, value.child_index, partner_index))
}

/// Resolved targets of a type-grouped value, with their labels
fn targets_of(store: &CellStore, value: &ChildValue) -> AggregateResult<(Vec<CellId>, Vec<String>)> {
    if value.partner_index.is_some() {
        return Err(shape_error(Grouping::ChildType));
    }
    let ids: Vec<CellId> = store
        .partner_at(value.cell_index, value.child_index)
        .map(|partner| partner.neighbors.iter().filter_map(|n| n.cell_id).collect())
        .unwrap_or_default();
    let labels = ids
        .iter()
        .map(|id| {
            store
                .neighbor_cell(*id)
                .and_then(|cell| cell.label.clone())
                .unwrap_or_else(|| "undefined".to_string())
        })
        .collect();
    Ok((ids, labels))
}

/// Detail rows for the values of one table cell
///
/// # Errors
/// * `AggregateError::InvalidGrouping` - a value carries a partner index under
///   child type grouping, or lacks one under target grouping
/// * `AggregateError::UnknownCell` - a value points outside the store
///
pub fn details_data(
    store: &CellStore,
    attribute: Option<Attribute>,
    grouping: Grouping,
    values: &[ChildValue],
) -> AggregateResult<Vec<DetailRow>> {
    let mut details = Vec::new();

    match (grouping, attribute) {
        (Grouping::TargetLabel, None) => {
            let mut targets: Vec<(CellId, Vec<ChildId>)> = Vec::new();
            for value in values {
                let Some(target_id) = target_of(store, value)? else {
                    continue;
                };
                let child_id = child_id(store, value)?;
                match targets.iter_mut().find(|(id, _)| *id == target_id) {
                    Some((_, children)) => children.push(child_id),
                    None => targets.push((target_id, vec![child_id])),
                }
            }
            details.extend(targets.into_iter().map(|(target_id, child_ids)| {
                DetailRow::TargetCount {
                    target_id,
                    count: child_ids.len(),
                    child_ids,
                }
            }));
        }
        (Grouping::TargetLabel, Some(_)) => {
            for value in values {
                let Some(target_id) = target_of(store, value)? else {
                    continue;
                };
                details.push(DetailRow::TargetValue {
                    child_id: child_id(store, value)?,
                    target_id,
                    value: value.value,
                });
            }
        }
        (Grouping::ChildType, None) => {
            for value in values {
                let (target_ids, target_labels) = targets_of(store, value)?;
                details.push(DetailRow::ChildTargets {
                    child_id: child_id(store, value)?,
                    target_ids,
                    target_labels,
                });
            }
        }
        (Grouping::ChildType, Some(_)) => {
            for value in values {
                let (target_ids, target_labels) = targets_of(store, value)?;
                details.push(DetailRow::ChildTargetsValue {
                    child_id: child_id(store, value)?,
                    target_ids,
                    target_labels,
                    value: value.value,
                });
            }
        }
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{AggregateParams, Aggregator};
    use crate::test_support::{catalog, connected_store};
    use crate::types::UnitScale;
    use cellnet_ingest::testing::{child, partner, StoreFixture};

    fn value(cell_index: usize, child_index: usize, partner_index: Option<usize>) -> ChildValue {
        ChildValue {
            cell_index,
            child_index,
            partner_index,
            value: Some(1.5),
        }
    }

    #[test]
    fn test_target_counts_group_children_per_target() {
        let store = StoreFixture::new()
            .cell(1, "A", Vec::new())
            .neighbor_cell(7, Some("B"))
            .children(1, vec![child(10, 35, &[]), child(11, 35, &[])])
            .partners(1, vec![partner(&[(70, Some(7))]), partner(&[(71, Some(7))])])
            .build();

        let rows = details_data(
            &store,
            None,
            Grouping::TargetLabel,
            &[value(0, 0, Some(0)), value(0, 1, Some(0))],
        )
        .unwrap();

        assert_eq!(
            rows,
            vec![DetailRow::TargetCount {
                target_id: 7,
                count: 2,
                child_ids: vec![10, 11],
            }]
        );
        assert_eq!(rows[0].fields(), vec!["7", "2", "10, 11"]);
    }

    #[test]
    fn test_target_values_one_row_per_value() {
        let store = connected_store();
        let rows = details_data(
            &store,
            Some(Attribute::Confidence),
            Grouping::TargetLabel,
            &[value(0, 0, Some(1))],
        )
        .unwrap();

        assert_eq!(rows[0].fields(), vec!["10", "300", "1.5"]);
        assert_eq!(
            DetailRow::columns(Grouping::TargetLabel, Some(Attribute::Confidence)),
            &["child id", "target id", "child value"]
        );
    }

    #[test]
    fn test_child_type_rows_list_targets() {
        let store = connected_store();
        let catalog = catalog();
        let aggregator = Aggregator::new(&store, &catalog, UnitScale::default());
        let params = AggregateParams::new(vec![0, 2], Grouping::ChildType);
        let table = aggregator.table_data(&params).unwrap();

        let syn = details_data(&store, None, Grouping::ChildType, &table[0].get("syn").unwrap().values)
            .unwrap();
        assert_eq!(syn.len(), 2);
        assert_eq!(syn[0].fields(), vec!["10", "GC ON, Rod BC", "100, 300"]);
        // Unresolved neighbors are left out
        assert_eq!(syn[1].fields(), vec!["11", "GC OFF", "200"]);

        let rib = details_data(&store, None, Grouping::ChildType, &table[1].get("rib").unwrap().values)
            .unwrap();
        assert_eq!(rib[0].fields(), vec!["30", "none", "none"]);
    }

    #[test]
    fn test_mismatched_value_shape() {
        let store = connected_store();

        assert!(matches!(
            details_data(&store, None, Grouping::TargetLabel, &[value(0, 0, None)]),
            Err(AggregateError::InvalidGrouping(_))
        ));
        assert!(matches!(
            details_data(
                &store,
                Some(Attribute::Diameter),
                Grouping::ChildType,
                &[value(0, 0, Some(0))]
            ),
            Err(AggregateError::InvalidGrouping(_))
        ));
    }
}
