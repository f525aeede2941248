// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB Object Sink
//!
//! Turns chunks of structured records into time-series points and writes
//! them to an InfluxDB 1.x compatible store.
//!
//! This crate provides:
//! - Record time resolution with explicit strptime formats or free-form parsing
//! - Classification of record fields into numeric values and string tags
//! - Point assembly with configurable timestamp precision
//! - One store write per chunk through a pluggable [`PointWriter`]
//! - YAML configuration with startup validation
//!
//! # Overview
//!
//! ```text
//! ChunkEntry (tag, time, JSON) --> RecordClassifier --> TimeResolver --> ResolvedPoint --> Batch --> PointWriter
//! ```
//!
//! Records without any numeric value are discarded with a warning. Records
//! whose time cannot be parsed keep the chunk entry's time, and the failure
//! is reported once through a [`DiagnosticSink`].

pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod line_protocol;
pub mod point;
pub mod sink;
pub mod stats;
pub mod time;
pub mod value;
pub mod writer;

pub use classify::{ClassifiedRecord, RecordClassifier};
pub use config::{ConfigError, SinkConfig};
pub use diagnostics::{DiagnosticSink, TimeParseFailure, TracingDiagnostics};
pub use point::{Batch, Precision, ResolvedPoint};
pub use sink::{check_database, ObjectSink, SinkError};
pub use stats::SinkStatsSnapshot;
pub use time::{TimeParseError, TimeResolver, TimeSpec};
pub use value::{ChunkEntry, FieldValue, Numeric, RawRecord};
pub use writer::{HttpPointWriter, PointWriter, StdoutWriter, WriteError};
