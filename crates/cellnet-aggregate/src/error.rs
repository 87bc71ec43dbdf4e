// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Aggregation error types

use cellnet_ingest::TypeId;
use thiserror::Error;

/// Aggregation errors
#[derive(Error, Debug)]
pub enum AggregateError {
    /// Value shape or grouping code that does not fit the query
    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    /// Unparsable grouping, attribute or units name
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Child type id missing from the structure catalog
    #[error("Unknown child structure type: {0}")]
    UnknownChildType(TypeId),

    #[error("Unknown cell index: {0}")]
    UnknownCell(usize),

    /// Catalog data could not be read or parsed
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Failed to format export: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Result type for aggregation operations
pub type AggregateResult<T> = Result<T, AggregateError>;
