// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! OData volume service client over HTTP

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::query::{Cursor, ODataQuery, Page};
use crate::source::VolumeSource;

/// [`VolumeSource`] backed by a remote OData endpoint
///
/// ```ignore
/// let client = ODataClient::new("http://volume.example/OData/", Duration::from_secs(30))?;
/// let page = client.read_by_filter(&ODataQuery::new("StructureTypes")).await?;
/// ```
#[derive(Clone)]
pub struct ODataClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ODataClient {
    /// Create a client with its own `reqwest::Client`
    ///
    /// # Arguments
    /// * `base_url` - service root; relative request URIs are appended to it
    /// * `timeout` - per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> IngestResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self::with_http_client(base_url, http_client))
    }

    /// Create a client sharing a pre-configured `reqwest::Client`
    pub fn with_http_client(base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a relative request URI or a server cursor
    pub fn resolve(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                uri.trim_start_matches('/')
            )
        }
    }

    async fn get_page(&self, uri: &str) -> IngestResult<Page> {
        let url = self.resolve(uri);
        debug!(target: "cellnet-ingest", "GET {}", url);

        let resp = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                uri: uri.to_string(),
            });
        }

        let payload: Value = resp.json().await?;
        Self::parse_page(payload)
    }

    /// Parse a page envelope
    ///
    /// Accepts the verbose v2 form (`{"d": {"results": [...], "__next": ...}}`),
    /// the bare `{"results": [...], "__next": ...}` form, and the v4 form
    /// (`{"value": [...], "@odata.nextLink": ...}`).
    pub fn parse_page(payload: Value) -> IngestResult<Page> {
        let body = match payload {
            Value::Object(mut map) if map.contains_key("d") => {
                map.remove("d").unwrap_or(Value::Null)
            }
            other => other,
        };

        let mut map = match body {
            Value::Object(map) => map,
            other => {
                return Err(IngestError::MalformedPage(format!(
                    "expected an object, got {}",
                    other
                )))
            }
        };

        let results = match map.remove("results").or_else(|| map.remove("value")) {
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(IngestError::MalformedPage(format!(
                    "results is not an array: {}",
                    other
                )))
            }
            None => {
                return Err(IngestError::MalformedPage(
                    "page has no results".to_string(),
                ))
            }
        };

        let next = match map.remove("__next").or_else(|| map.remove("@odata.nextLink")) {
            Some(Value::String(cursor)) if !cursor.is_empty() => Some(Cursor::new(cursor)),
            _ => None,
        };

        Ok(Page { results, next })
    }
}

#[async_trait]
impl VolumeSource for ODataClient {
    async fn read_by_filter(&self, query: &ODataQuery) -> IngestResult<Page> {
        self.get_page(&query.uri()).await
    }

    async fn read_by_cursor(&self, cursor: &Cursor) -> IngestResult<Page> {
        self.get_page(cursor.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_verbose_envelope() {
        let page = ODataClient::parse_page(json!({
            "d": {"results": [{"ID": 1}], "__next": "Structures?$skiptoken=1"}
        }))
        .unwrap();

        assert_eq!(page.results.len(), 1);
        assert_eq!(page.next, Some(Cursor::new("Structures?$skiptoken=1")));
    }

    #[test]
    fn test_parse_v4_envelope() {
        let page = ODataClient::parse_page(json!({"value": [{"ID": 1}, {"ID": 2}]})).unwrap();
        assert_eq!(page.results.len(), 2);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_parse_rejects_non_page() {
        assert!(matches!(
            ODataClient::parse_page(json!([1, 2])),
            Err(IngestError::MalformedPage(_))
        ));
        assert!(matches!(
            ODataClient::parse_page(json!({"d": {"count": 3}})),
            Err(IngestError::MalformedPage(_))
        ));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let client =
            ODataClient::with_http_client("http://volume.example/OData/", reqwest::Client::new());
        assert_eq!(
            client.resolve("Structures?$skiptoken=5"),
            "http://volume.example/OData/Structures?$skiptoken=5"
        );
        assert_eq!(
            client.resolve("https://other.example/OData/Structures"),
            "https://other.example/OData/Structures"
        );
    }

    #[tokio::test]
    async fn test_reads_filter_then_relative_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Structures"))
            .and(query_param("$filter", "(Label eq 'A')"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "d": {"results": [{"ID": 1}], "__next": "Structures?$skiptoken=1"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Structures"))
            .and(query_param("$skiptoken", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"d": {"results": [{"ID": 2}]}})),
            )
            .mount(&server)
            .await;

        let client = ODataClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let first = client
            .read_by_filter(&ODataQuery::new("Structures").filter("(Label eq 'A')"))
            .await
            .unwrap();
        let cursor = first.next.clone().unwrap();
        let second = client.read_by_cursor(&cursor).await.unwrap();

        assert_eq!(first.results, vec![json!({"ID": 1})]);
        assert_eq!(second.results, vec![json!({"ID": 2})]);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(414))
            .mount(&server)
            .await;

        let client = ODataClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = client
            .read_by_filter(&ODataQuery::new("StructureLinks"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Status { status: 414, .. }));
        assert!(err.is_transport());
    }
}
