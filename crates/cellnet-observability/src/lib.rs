// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # cellnet-observability
//!
//! Logging infrastructure shared by the cellnet crates, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: Rolling log files in addition to console output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known cellnet crate names for debug flags. These are also the
/// `target:` strings used by the crates' tracing macros.
pub const KNOWN_CRATES: &[&str] = &[
    "cellnet-ingest",
    "cellnet-aggregate",
    "cellnet-config",
    "cellnet-export",
];
