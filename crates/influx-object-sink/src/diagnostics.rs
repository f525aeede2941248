// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Diagnostic side channel for recoverable per-record failures.

use chrono::{DateTime, Utc};

/// Default tag under which time parse failures are reported.
pub const DEFAULT_ERROR_TAG: &str = "influxdb.time_parse_error";

/// A record whose time field could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeParseFailure {
    /// Chunk tag the record came from.
    pub tag: String,
    /// Fallback timestamp used instead.
    pub fallback: DateTime<Utc>,
    /// Configured time format, if any.
    pub format: Option<String>,
    /// Raw time value, rendered as text (`None` when the field was absent).
    pub value: Option<String>,
    /// Why every parser rejected the value.
    pub reason: String,
}

/// Receiver for diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    /// Called once per record whose time field failed to parse.
    fn time_parse_failed(&self, failure: TimeParseFailure);
}

/// Reports diagnostics as `tracing` error events.
#[derive(Debug, Clone)]
pub struct TracingDiagnostics {
    error_tag: String,
}

impl TracingDiagnostics {
    pub fn new(error_tag: impl Into<String>) -> Self {
        Self {
            error_tag: error_tag.into(),
        }
    }
}

impl DiagnosticSink for TracingDiagnostics {
    fn time_parse_failed(&self, failure: TimeParseFailure) {
        tracing::error!(
            error_tag = %self.error_tag,
            tag = %failure.tag,
            time = %failure.fallback,
            format = failure.format.as_deref().unwrap_or("-"),
            value = failure.value.as_deref().unwrap_or("-"),
            reason = %failure.reason,
            "failed to parse record time, using event time"
        );
    }
}
