// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Remote read capability consumed by the ingestion layer.

use async_trait::async_trait;

use crate::error::IngestResult;
use crate::query::{Cursor, ODataQuery, Page};

/// Paginated record source (transport-agnostic)
#[async_trait]
pub trait VolumeSource: Send + Sync {
    /// Issue a filtered query and return its first page
    ///
    /// # Errors
    /// * `IngestError::Transport` / `Status` / `Http` - the read failed
    /// * `IngestError::MalformedPage` - the response was not a page
    ///
    async fn read_by_filter(&self, query: &ODataQuery) -> IngestResult<Page>;

    /// Follow a `next` cursor returned by a previous page
    async fn read_by_cursor(&self, cursor: &Cursor) -> IngestResult<Page>;
}
