// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sink counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by chunk processing. Safe to share across threads.
#[derive(Debug, Default)]
pub struct SinkStats {
    pub chunks_processed: AtomicU64,
    pub records_seen: AtomicU64,
    /// Chunk entries that were not structured records.
    pub records_malformed: AtomicU64,
    /// Records dropped for having no numeric values.
    pub records_discarded: AtomicU64,
    pub time_parse_failures: AtomicU64,
    pub points_written: AtomicU64,
    pub write_errors: AtomicU64,
}

impl SinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SinkStatsSnapshot {
        SinkStatsSnapshot {
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            records_seen: self.records_seen.load(Ordering::Relaxed),
            records_malformed: self.records_malformed.load(Ordering::Relaxed),
            records_discarded: self.records_discarded.load(Ordering::Relaxed),
            time_parse_failures: self.time_parse_failures.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStatsSnapshot {
    pub chunks_processed: u64,
    pub records_seen: u64,
    pub records_malformed: u64,
    pub records_discarded: u64,
    pub time_parse_failures: u64,
    pub points_written: u64,
    pub write_errors: u64,
}
