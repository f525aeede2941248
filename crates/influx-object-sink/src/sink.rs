// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Chunk processing: the sink's per-batch entry point.
//!
//! Connects time resolution, record classification, point assembly and the
//! store writer:
//!
//! ```text
//! ChunkEntry --> RawRecord --> TimeResolver + RecordClassifier --> ResolvedPoint --> Batch --> PointWriter
//! ```

use crate::classify::RecordClassifier;
use crate::config::{ConfigError, SinkConfig};
use crate::diagnostics::{DiagnosticSink, TimeParseFailure, TracingDiagnostics};
use crate::point::{Batch, Precision, ResolvedPoint};
use crate::stats::{SinkStats, SinkStatsSnapshot};
use crate::time::TimeResolver;
use crate::value::{ChunkEntry, RawRecord};
use crate::writer::{HttpPointWriter, PointWriter, WriteError};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by [`ObjectSink::process_chunk`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The store write failed. Returned unchanged; the caller owns retries.
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Counts diagnostics on their way to the configured sink.
struct CountingDiagnostics<'a> {
    inner: &'a dyn DiagnosticSink,
    counter: &'a AtomicU64,
}

impl DiagnosticSink for CountingDiagnostics<'_> {
    fn time_parse_failed(&self, failure: TimeParseFailure) {
        SinkStats::add(self.counter, 1);
        self.inner.time_parse_failed(failure);
    }
}

/// Record-to-point sink.
///
/// Configuration is fixed at construction; `process_chunk` takes `&self`
/// and may be called from several threads at once.
pub struct ObjectSink {
    measurement: Option<String>,
    precision: Precision,
    resolver: TimeResolver,
    classifier: RecordClassifier,
    writer: Arc<dyn PointWriter>,
    diagnostics: Arc<dyn DiagnosticSink>,
    stats: SinkStats,
}

impl ObjectSink {
    /// Create a sink from validated configuration and a store writer.
    pub fn from_config(
        config: &SinkConfig,
        writer: Arc<dyn PointWriter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver = TimeResolver::new(config.time_spec());
        tracing::debug!(
            time_key = %config.time_key,
            parsers = ?resolver.parser_names(),
            "time resolver ready"
        );

        Ok(Self {
            measurement: config.measurement.clone(),
            precision: config.time_precision,
            resolver,
            classifier: RecordClassifier::new(config.tag_keys.iter().cloned(), &config.time_key),
            writer,
            diagnostics: Arc::new(TracingDiagnostics::new(&config.time_parse_error_tag)),
            stats: SinkStats::new(),
        })
    }

    /// Replace the diagnostics receiver.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn stats(&self) -> SinkStatsSnapshot {
        self.stats.snapshot()
    }

    /// Series name for points from `tag`.
    pub fn series_for<'a>(&'a self, tag: &'a str) -> &'a str {
        self.measurement.as_deref().unwrap_or(tag)
    }

    /// Turn one chunk entry into a point.
    ///
    /// Returns `None` for entries that are not records and for records
    /// without numeric values.
    pub fn build_point(&self, tag: &str, entry: &ChunkEntry) -> Option<ResolvedPoint> {
        SinkStats::add(&self.stats.records_seen, 1);

        let Some(record) = RawRecord::from_json(&entry.record) else {
            SinkStats::add(&self.stats.records_malformed, 1);
            tracing::debug!(tag, "ignoring chunk entry that is not a record");
            return None;
        };

        let classified = self.classifier.classify(&record);

        let diagnostics = CountingDiagnostics {
            inner: self.diagnostics.as_ref(),
            counter: &self.stats.time_parse_failures,
        };
        let time = self
            .resolver
            .resolve(classified.time.as_ref(), entry.time, tag, &diagnostics);

        let point = ResolvedPoint::new(
            self.precision.epoch(&time),
            self.series_for(tag),
            classified.values,
            classified.tags,
        );
        if point.is_none() {
            SinkStats::add(&self.stats.records_discarded, 1);
            tracing::warn!(
                tag,
                record = %record,
                "Skip record because InfluxDB requires at least one value per point"
            );
        }
        point
    }

    /// Build the batch for a chunk without writing it.
    pub fn build_batch(&self, tag: &str, entries: &[ChunkEntry]) -> Batch {
        let mut batch = Batch::with_capacity(self.precision, entries.len());
        for entry in entries {
            if let Some(point) = self.build_point(tag, entry) {
                batch.push(point);
            }
        }
        batch
    }

    /// Process one chunk and write its points in a single call.
    ///
    /// Returns the number of points written. An empty batch is not written.
    pub fn process_chunk(&self, tag: &str, entries: &[ChunkEntry]) -> Result<usize, SinkError> {
        SinkStats::add(&self.stats.chunks_processed, 1);

        let batch = self.build_batch(tag, entries);
        if batch.is_empty() {
            tracing::debug!(tag, entries = entries.len(), "no points in chunk, nothing to write");
            return Ok(0);
        }

        tracing::info!(tag, points = batch.len(), "write points");
        if let Err(e) = self.writer.write_points(&batch) {
            SinkStats::add(&self.stats.write_errors, 1);
            return Err(e.into());
        }
        SinkStats::add(&self.stats.points_written, batch.len() as u64);
        Ok(batch.len())
    }
}

/// Verify at startup that `dbname` exists on the store.
///
/// A missing database is a configuration error. When the database list
/// cannot be read (no admin privilege, store unreachable), the check is
/// skipped.
pub fn check_database(writer: &HttpPointWriter, user: &str) -> Result<(), ConfigError> {
    let dbname = writer.dbname();
    match writer.list_databases() {
        Ok(existing) => {
            if existing.iter().any(|name| name == dbname) {
                tracing::info!(dbname, "database exists");
                Ok(())
            } else {
                Err(ConfigError::MissingDatabase {
                    dbname: dbname.to_string(),
                    existing,
                })
            }
        }
        Err(WriteError::Unauthorized { .. }) => {
            tracing::info!(
                user,
                dbname,
                "skip database presence check because the user doesn't have admin privilege"
            );
            Ok(())
        }
        Err(e) => {
            tracing::info!(dbname, error = %e, "skip database presence check");
            Ok(())
        }
    }
}
