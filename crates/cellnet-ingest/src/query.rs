// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! OData request and page types
//!
//! A query renders to the relative request URI the service receives, e.g.
//! `Structures?$filter=ParentID eq 12&$expand=Locations&$select=ID,TypeID`.
//! The rendered string is also what request-length limits are measured on.

use serde_json::Value;
use std::fmt;

/// Server-issued token pointing at the next page of a result set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of records
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub results: Vec<Value>,
    pub next: Option<Cursor>,
}

impl Page {
    pub fn new(results: Vec<Value>) -> Self {
        Self {
            results,
            next: None,
        }
    }

    pub fn with_next(mut self, cursor: impl Into<String>) -> Self {
        self.next = Some(Cursor::new(cursor));
        self
    }
}

/// Filtered read against one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ODataQuery {
    pub collection: String,
    pub filter: Option<String>,
    pub expand: Vec<String>,
    pub select: Vec<String>,
}

impl ODataQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: None,
            expand: Vec::new(),
            select: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn expand(mut self, navigation: impl Into<String>) -> Self {
        self.expand.push(navigation.into());
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Render the relative request URI
    pub fn uri(&self) -> String {
        let mut params = Vec::with_capacity(3);
        if let Some(filter) = &self.filter {
            params.push(format!("$filter={}", filter));
        }
        if !self.expand.is_empty() {
            params.push(format!("$expand={}", self.expand.join(",")));
        }
        if !self.select.is_empty() {
            params.push(format!("$select={}", self.select.join(",")));
        }

        if params.is_empty() {
            self.collection.clone()
        } else {
            format!("{}?{}", self.collection, params.join("&"))
        }
    }
}

/// Quote a string literal for an OData filter (`'` is doubled)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
