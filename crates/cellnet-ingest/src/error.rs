// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ingestion error types

use thiserror::Error;

use crate::store::CellId;

/// One cell whose load did not complete
#[derive(Debug)]
pub struct CellLoadFailure {
    pub cell_index: usize,
    pub cell_id: CellId,
    pub error: Box<IngestError>,
}

/// Ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    /// A page or batched read failed below the HTTP layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client failure
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Request '{uri}' failed with status {status}")]
    Status { status: u16, uri: String },

    /// Response envelope is not a recognisable page
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    /// A record could not be decoded into its typed form
    #[error("Failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),

    /// A cell's children did not fit in a single page
    #[error("Cell {cell_index} (id {cell_id}) has more children than fit in one page")]
    PaginationOverflow { cell_index: usize, cell_id: CellId },

    /// Some per-cell loads failed; the others were stored
    #[error("Partial load: cell indexes [{}] failed", failed_indexes(.failures))]
    PartialLoad { failures: Vec<CellLoadFailure> },

    /// The load was abandoned through its cancellation token
    #[error("Load cancelled")]
    Cancelled,
}

impl IngestError {
    /// Whether this error came from reading a page off the wire
    pub fn is_transport(&self) -> bool {
        match self {
            IngestError::Transport(_) | IngestError::Status { .. } => true,
            #[cfg(feature = "http")]
            IngestError::Http(_) => true,
            _ => false,
        }
    }

    /// Indexes of the cells that failed, for a `PartialLoad`
    pub fn failed_cell_indexes(&self) -> Vec<usize> {
        match self {
            IngestError::PartialLoad { failures } => {
                failures.iter().map(|f| f.cell_index).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn failed_indexes(failures: &[CellLoadFailure]) -> String {
    failures
        .iter()
        .map(|f| f.cell_index.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_load_lists_failed_indexes() {
        let err = IngestError::PartialLoad {
            failures: vec![
                CellLoadFailure {
                    cell_index: 2,
                    cell_id: 593,
                    error: Box::new(IngestError::Transport("reset".to_string())),
                },
                CellLoadFailure {
                    cell_index: 7,
                    cell_id: 6115,
                    error: Box::new(IngestError::PaginationOverflow {
                        cell_index: 7,
                        cell_id: 6115,
                    }),
                },
            ],
        };

        assert_eq!(err.to_string(), "Partial load: cell indexes [2, 7] failed");
        assert_eq!(err.failed_cell_indexes(), vec![2, 7]);
        assert!(!err.is_transport());
    }
}
