// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Plain-text CSV export
//!
//! Fields are separated by `", "` and never quoted; every line ends with a
//! newline. The table export renders exactly what the table shows: value-list
//! lengths in count mode, `;`-joined attribute values otherwise.

use std::fmt::Write;

use crate::attributes::{diameter_px, distance_to_soma_px};
use crate::error::{AggregateError, AggregateResult};
use crate::table::{AggregateParams, Aggregator, TableRow};
use crate::types::{Attribute, Units};

const SEPARATOR: &str = ", ";
const UNDEFINED: &str = "undefined";

/// Header line of the per-child export
pub const CHILD_CSV_HEADER: &str = "cell id, child id, child type, confidence, distance (px), \
distance (nm), target id, target label, diameter (px), diameter (nm)";

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| UNDEFINED.to_string(), |v| v.to_string())
}

/// Serialise a table built by [`Aggregator::table_data`] under `header`
pub fn render_table_csv(header: &[String], table: &[TableRow], attribute: Option<Attribute>) -> String {
    let mut csv = header.join(SEPARATOR);
    csv.push('\n');

    for row in table {
        let mut fields = vec![row.id.to_string(), row.label.clone()];
        for column in header.iter().skip(2) {
            let field = match (row.get(column), attribute) {
                (None, _) => String::new(),
                (Some(cell), None) => cell.len().to_string(),
                (Some(cell), Some(_)) => cell
                    .values
                    .iter()
                    .filter_map(|v| v.value)
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(";"),
            };
            fields.push(field);
        }
        csv.push_str(&fields.join(SEPARATOR));
        csv.push('\n');
    }
    csv
}

impl<'a> Aggregator<'a> {
    /// Header line plus one line per requested cell
    pub fn table_as_csv(&self, params: &AggregateParams) -> AggregateResult<String> {
        let header = self.header_data(params)?;
        let table = self.table_data(params)?;
        Ok(render_table_csv(&header, &table, params.attribute))
    }

    /// One line per (child, neighbor) of the requested cells, or one line with
    /// target `-1, undefined` for a child without neighbors
    pub fn table_as_csv_of_children(&self, params: &AggregateParams) -> AggregateResult<String> {
        let store = self.store();
        let scale = self.scale();
        let mut csv = String::from(CHILD_CSV_HEADER);
        csv.push('\n');

        for &cell_index in &params.cell_indexes {
            let cell = self.cell(cell_index)?;
            for (child_index, child) in
                store.children_by_types(cell_index, params.child_types.as_deref())
            {
                let code = self
                    .catalog()
                    .type_code(child.type_id)
                    .ok_or(AggregateError::UnknownChildType(child.type_id))?;
                let distance = distance_to_soma_px(store, cell_index, child, scale);
                let diameter = diameter_px(child);

                let mut targets: Vec<(String, String)> = store
                    .partner_at(cell_index, child_index)
                    .map(|p| p.neighbors.as_slice())
                    .unwrap_or(&[])
                    .iter()
                    .map(|neighbor| match neighbor.cell_id {
                        Some(id) => (
                            id.to_string(),
                            store
                                .neighbor_cell(id)
                                .and_then(|c| c.label.clone())
                                .unwrap_or_else(|| UNDEFINED.to_string()),
                        ),
                        None => ("-1".to_string(), UNDEFINED.to_string()),
                    })
                    .collect();
                if targets.is_empty() {
                    targets.push(("-1".to_string(), UNDEFINED.to_string()));
                }

                for (target_id, target_label) in targets {
                    writeln!(
                        csv,
                        "{}, {}, {}, {}, {}, {}, {}, {}, {}, {}",
                        cell.id,
                        child.id,
                        code,
                        optional(child.confidence),
                        optional(distance),
                        optional(distance.map(|px| scale.convert(px, Units::Nanometers))),
                        target_id,
                        target_label,
                        optional(diameter),
                        optional(diameter.map(|px| scale.convert(px, Units::Nanometers))),
                    )?;
                }
            }
        }
        Ok(csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog, connected_store};
    use crate::types::{Grouping, UnitScale};

    fn scale() -> UnitScale {
        UnitScale {
            nm_per_pixel: 2.0,
            nm_per_section: 90.0,
        }
    }

    #[test]
    fn test_count_csv_has_one_line_per_cell() {
        let store = connected_store();
        let catalog = catalog();
        let aggregator = Aggregator::new(&store, &catalog, scale());
        let params = AggregateParams::new(vec![0, 1, 2], Grouping::ChildType);

        let csv = aggregator.table_as_csv(&params).unwrap();

        assert_eq!(
            csv,
            "id, label, syn, rib\n1, CBb5, 2, 1\n2, CBb5, 0, 2\n3, AC, 0, 1\n"
        );
        for line in csv.lines() {
            assert_eq!(line.split(", ").count(), 4);
        }
    }

    #[test]
    fn test_attribute_csv_matches_table_values() {
        let store = connected_store();
        let catalog = catalog();
        let aggregator = Aggregator::new(&store, &catalog, scale());
        let params = AggregateParams::new(vec![0, 1, 2], Grouping::ChildType)
            .with_attribute(Attribute::Diameter)
            .with_units(Units::Pixels);

        let csv = aggregator.table_as_csv(&params).unwrap();

        assert_eq!(
            csv,
            "id, label, syn, rib\n1, CBb5, 2;8, 4\n2, CBb5, , 2\n3, AC, , \n"
        );
    }

    #[test]
    fn test_target_csv_header_follows_header_data() {
        let store = connected_store();
        let catalog = catalog();
        let aggregator = Aggregator::new(&store, &catalog, scale());
        let params = AggregateParams::new(vec![0], Grouping::TargetLabel);

        let csv = aggregator.table_as_csv(&params).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id, label, GC, Rod BC, In Class, Self"));
        assert_eq!(lines.next(), Some("1, CBb5, 2, 1, 1, 0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_children_csv() {
        let store = connected_store();
        let catalog = catalog();
        let aggregator = Aggregator::new(&store, &catalog, scale());
        let params = AggregateParams::new(vec![0, 2], Grouping::ChildType).with_child_types(vec![28]);

        let csv = aggregator.table_as_csv_of_children(&params).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], CHILD_CSV_HEADER);
        assert_eq!(lines[1], "1, 12, rib, undefined, 3, 6, 2, CBb5, 4, 8");
        assert_eq!(
            lines[2],
            "3, 30, rib, undefined, undefined, undefined, -1, undefined, undefined, undefined"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_children_csv_line_per_neighbor() {
        let store = connected_store();
        let catalog = catalog();
        let aggregator = Aggregator::new(&store, &catalog, scale());
        let params = AggregateParams::new(vec![0], Grouping::ChildType).with_child_types(vec![35]);

        let csv = aggregator.table_as_csv_of_children(&params).unwrap();
        let targets: Vec<_> = csv
            .lines()
            .skip(1)
            .map(|line| line.split(", ").nth(7).unwrap_or_default().to_string())
            .collect();

        assert_eq!(targets, vec!["GC ON", "Rod BC", "GC OFF", "undefined"]);
    }

    #[test]
    fn test_write_failure_is_an_aggregate_error() {
        fn write_line(out: &mut impl Write) -> AggregateResult<()> {
            writeln!(out, "{}, {}", 1, UNDEFINED)?;
            Ok(())
        }

        struct Rejecting;
        impl Write for Rejecting {
            fn write_str(&mut self, _: &str) -> std::fmt::Result {
                Err(std::fmt::Error)
            }
        }

        let mut line = String::new();
        write_line(&mut line).unwrap();
        assert_eq!(line, "1, undefined\n");
        assert!(matches!(
            write_line(&mut Rejecting),
            Err(AggregateError::Format(_))
        ));
    }
}
