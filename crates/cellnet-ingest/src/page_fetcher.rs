// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cursor-following page reader
//!
//! Pages of one logical query are strictly sequenced: page N+1 is requested
//! only after page N has arrived. Any failed read fails the whole fetch; there
//! is no retry.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::query::{Cursor, ODataQuery, Page};
use crate::source::VolumeSource;

/// Reads every page of a query from a [`VolumeSource`]
pub struct PageFetcher<S: ?Sized> {
    source: Arc<S>,
}

impl<S: ?Sized> Clone for PageFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: VolumeSource + ?Sized> PageFetcher<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Issue `query` and concatenate its records with every follow-up page
    pub async fn fetch_all(
        &self,
        query: &ODataQuery,
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<Value>> {
        let first = guarded(cancel, self.source.read_by_filter(query)).await?;
        self.continue_from(first.results, first.next, cancel).await
    }

    /// Read the first page of `query` only
    pub async fn fetch_first(
        &self,
        query: &ODataQuery,
        cancel: &CancellationToken,
    ) -> IngestResult<Page> {
        guarded(cancel, self.source.read_by_filter(query)).await
    }

    /// Read every page starting at `cursor`
    pub async fn fetch_from_cursor(
        &self,
        cursor: Cursor,
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<Value>> {
        self.continue_from(Vec::new(), Some(cursor), cancel).await
    }

    /// Append the pages reachable from `next` to `records`
    pub async fn continue_from(
        &self,
        mut records: Vec<Value>,
        mut next: Option<Cursor>,
        cancel: &CancellationToken,
    ) -> IngestResult<Vec<Value>> {
        let mut pages = 0usize;
        while let Some(cursor) = next {
            let page = guarded(cancel, self.source.read_by_cursor(&cursor)).await?;
            pages += 1;
            records.extend(page.results);
            next = page.next;
        }

        if pages > 0 {
            debug!(
                target: "cellnet-ingest",
                "Followed {} continuation page(s), {} records total",
                pages,
                records.len()
            );
        }
        Ok(records)
    }
}

/// Race one read against cancellation
async fn guarded<F>(cancel: &CancellationToken, read: F) -> IngestResult<Page>
where
    F: Future<Output = IngestResult<Page>>,
{
    if cancel.is_cancelled() {
        return Err(IngestError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IngestError::Cancelled),
        page = read => page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSource;
    use serde_json::json;

    #[tokio::test]
    async fn test_pages_concatenate_in_cursor_order() {
        let query = ODataQuery::new("Structures").filter("Label eq 'CBb5'");
        let source = ScriptedSource::new()
            .with_page(
                query.uri(),
                Page::new(vec![json!({"ID": 1}), json!({"ID": 2})]).with_next("p2"),
            )
            .with_cursor("p2", Page::new(vec![json!({"ID": 3})]).with_next("p3"))
            .with_cursor("p3", Page::new(vec![json!({"ID": 4}), json!({"ID": 5})]));
        let source = Arc::new(source);
        let fetcher = PageFetcher::new(Arc::clone(&source));

        let records = fetcher
            .fetch_all(&query, &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<_> = records.iter().map(|r| r["ID"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(source.requests(), vec![query.uri(), "p2".into(), "p3".into()]);
    }

    #[tokio::test]
    async fn test_failed_page_fails_the_fetch() {
        let query = ODataQuery::new("StructureLinks");
        let source = ScriptedSource::new()
            .with_page(query.uri(), Page::new(vec![json!({})]).with_next("broken"))
            .with_failure("broken");
        let fetcher = PageFetcher::new(Arc::new(source));

        let err = fetcher
            .fetch_all(&query, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_read() {
        let query = ODataQuery::new("Structures");
        let source = Arc::new(ScriptedSource::new().with_page(query.uri(), Page::new(vec![])));
        let fetcher = PageFetcher::new(Arc::clone(&source));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher.fetch_all(&query, &cancel).await.unwrap_err();
        assert!(matches!(err, IngestError::Cancelled));
        assert!(source.requests().is_empty());
    }
}
