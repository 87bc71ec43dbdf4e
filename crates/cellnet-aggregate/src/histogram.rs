// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Equal-width histograms over attribute values

use serde::Serialize;

use crate::table::{ChildValue, TableRow};

/// One histogram bucket
///
/// Covers `[x0, x1)`; the last bucket of a histogram also includes its upper
/// edge. `px0`/`px1` are the edges mapped into the drawing range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub x0: f64,
    pub x1: f64,
    pub px0: f64,
    pub px1: f64,
    pub values: Vec<f64>,
}

impl Bin {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Linear map from a value domain onto a drawing range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (x - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Partition the attribute values of `values` into `num_bins` equal buckets
/// spanning `domain`
///
/// Values outside `domain` and values without an attribute are dropped. A
/// degenerate domain (`lo >= hi`) yields one bucket holding the values equal
/// to `lo`.
pub fn histogram_values(
    values: &[ChildValue],
    num_bins: usize,
    domain: (f64, f64),
    range: (f64, f64),
) -> Vec<Bin> {
    let scale = LinearScale::new(domain, range);
    let (lo, hi) = domain;
    let scalars = values.iter().filter_map(|v| v.value);

    if lo >= hi || lo.is_nan() || hi.is_nan() {
        return vec![Bin {
            x0: lo,
            x1: lo,
            px0: scale.map(lo),
            px1: scale.map(lo),
            values: scalars.filter(|&v| v == lo).collect(),
        }];
    }

    let num_bins = num_bins.max(1);
    let step = (hi - lo) / num_bins as f64;
    let mut bins: Vec<Bin> = (0..num_bins)
        .map(|i| {
            let x0 = lo + step * i as f64;
            let x1 = if i + 1 == num_bins {
                hi
            } else {
                lo + step * (i + 1) as f64
            };
            Bin {
                x0,
                x1,
                px0: scale.map(x0),
                px1: scale.map(x1),
                values: Vec::new(),
            }
        })
        .collect();

    for value in scalars {
        if value.is_nan() || value < lo || value > hi {
            continue;
        }
        let mut index = (((value - lo) / step).floor() as usize).min(num_bins - 1);
        // Correct for rounding at the bin edges
        while index > 0 && value < bins[index].x0 {
            index -= 1;
        }
        while index + 1 < num_bins && value >= bins[index].x1 {
            index += 1;
        }
        bins[index].values.push(value);
    }
    bins
}

/// Size of the fullest bucket of one value list
pub fn histogram_max_y_from_values(
    values: &[ChildValue],
    num_bins: usize,
    domain: (f64, f64),
    range: (f64, f64),
) -> usize {
    histogram_values(values, num_bins, domain, range)
        .iter()
        .map(Bin::len)
        .max()
        .unwrap_or(0)
}

/// Size of the fullest bucket across every data column of `table`, so all
/// per-cell histograms can share one y axis
pub fn histogram_max_y_from_table(
    table: &[TableRow],
    header: &[String],
    num_bins: usize,
    domain: (f64, f64),
    range: (f64, f64),
) -> usize {
    table
        .iter()
        .flat_map(|row| {
            header
                .iter()
                .skip(2)
                .filter_map(move |column| row.get(column))
        })
        .map(|cell| histogram_max_y_from_values(&cell.values, num_bins, domain, range))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableCell;

    fn values(xs: &[f64]) -> Vec<ChildValue> {
        xs.iter()
            .enumerate()
            .map(|(i, &x)| ChildValue {
                cell_index: 0,
                child_index: i,
                partner_index: None,
                value: Some(x),
            })
            .collect()
    }

    #[test]
    fn test_bins_are_half_open_and_cover_domain() {
        let bins = histogram_values(
            &values(&[0.0, 2.0, 2.5, 5.0, 9.99, 10.0, 11.0, -1.0]),
            4,
            (0.0, 10.0),
            (0.0, 200.0),
        );

        assert_eq!(bins.len(), 4);
        assert_eq!((bins[0].x0, bins[0].x1), (0.0, 2.5));
        assert_eq!((bins[3].x0, bins[3].x1), (7.5, 10.0));
        assert_eq!((bins[1].px0, bins[3].px1), (50.0, 200.0));

        assert_eq!(bins[0].values, vec![0.0, 2.0]);
        assert_eq!(bins[1].values, vec![2.5]);
        assert_eq!(bins[2].values, vec![5.0]);
        assert_eq!(bins[3].values, vec![9.99, 10.0]);

        let total: usize = bins.iter().map(Bin::len).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_missing_values_are_ignored() {
        let mut vs = values(&[1.0]);
        vs.push(ChildValue {
            cell_index: 0,
            child_index: 9,
            partner_index: None,
            value: None,
        });

        let bins = histogram_values(&vs, 2, (0.0, 2.0), (0.0, 10.0));
        assert_eq!(bins.iter().map(Bin::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_degenerate_domain() {
        let bins = histogram_values(&values(&[0.0, 0.0, 1.0]), 10, (0.0, 0.0), (0.0, 200.0));
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].len(), 2);
    }

    #[test]
    fn test_shared_max_y_across_table() {
        let row = |cell_index: usize, xs: &[f64]| TableRow {
            id: cell_index as i64,
            label: "A".to_string(),
            cell_index,
            columns: vec![(
                "syn".to_string(),
                TableCell {
                    values: values(xs),
                    width: 200,
                    highlight: false,
                },
            )],
        };
        let table = vec![row(0, &[1.0, 1.5]), row(1, &[8.0, 8.1, 8.2])];
        let header = vec!["id".to_string(), "label".to_string(), "syn".to_string()];

        assert_eq!(
            histogram_max_y_from_values(&table[0].columns[0].1.values, 5, (0.0, 10.0), (0.0, 1.0)),
            2
        );
        assert_eq!(
            histogram_max_y_from_table(&table, &header, 5, (0.0, 10.0), (0.0, 1.0)),
            3
        );
    }
}
