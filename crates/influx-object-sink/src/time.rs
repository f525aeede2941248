// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record time resolution.
//!
//! A [`TimeResolver`] owns an ordered chain of [`TimeParser`] strategies and
//! tries them in turn until one accepts the raw value:
//!
//! ```text
//! format set:    CompiledFormat (precompiled) --> StrftimeFormat (chrono)
//! format unset:  FreeForm (RFC 3339, RFC 2822, common layouts)
//! ```
//!
//! Resolution never fails: when the whole chain rejects a value, a
//! [`TimeParseFailure`] is reported and the fallback (event) time is used.
//!
//! Format strings use strptime syntax. Besides chrono's directives, `%L`
//! (3-digit milliseconds) and `%N` (9-digit nanoseconds) are accepted.
//! Values without an explicit offset are taken as UTC.

use crate::diagnostics::{DiagnosticSink, TimeParseFailure};
use crate::value::FieldValue;
use chrono::format::{parse, Item, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Default name of the record field holding the time.
pub const DEFAULT_TIME_KEY: &str = "time";

/// How a record's time is located and parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSpec {
    /// Record field holding the raw time value.
    pub key: String,
    /// Explicit strptime format. `None` selects free-form parsing.
    pub format: Option<String>,
}

impl Default for TimeSpec {
    fn default() -> Self {
        Self {
            key: DEFAULT_TIME_KEY.to_string(),
            format: None,
        }
    }
}

/// Why a time value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("time field is missing")]
    Missing,

    #[error("time value is not a string: {0}")]
    NotAString(String),

    #[error("format '{0}' is not supported by this parser")]
    UnsupportedFormat(String),

    #[error("'{value}' does not match format '{format}'")]
    NoMatch { value: String, format: String },

    #[error("unrecognized date/time '{0}'")]
    Unrecognized(String),
}

/// One parsing strategy.
pub trait TimeParser: Send + Sync {
    /// Short strategy name, for logs.
    fn name(&self) -> &'static str;

    /// Parse a textual time value.
    fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimeParseError>;
}

// ---------------------------------------------------------------------------
// Compiled format (fast path)
// ---------------------------------------------------------------------------

/// Strptime format compiled once into chrono format items.
///
/// Uses the same engine as [`StrftimeFormat`], so both accept exactly the
/// same values; only the per-call format scan is saved. Compilation fails
/// when the format has directives chrono does not know, in which case the
/// chain relies on [`StrftimeFormat`] alone.
#[derive(Debug, Clone)]
pub struct CompiledFormat {
    format: String,
    items: Vec<Item<'static>>,
}

impl CompiledFormat {
    pub fn compile(format: &str) -> Result<Self, TimeParseError> {
        let items = StrftimeItems::new(&translate_format(format))
            .parse_to_owned()
            .map_err(|_| TimeParseError::UnsupportedFormat(format.to_string()))?;
        Ok(Self {
            format: format.to_string(),
            items,
        })
    }
}

impl TimeParser for CompiledFormat {
    fn name(&self) -> &'static str {
        "compiled"
    }

    fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimeParseError> {
        let mut parsed = Parsed::new();
        parse(&mut parsed, value, self.items.iter())
            .ok()
            .and_then(|()| finish(&parsed))
            .ok_or_else(|| TimeParseError::NoMatch {
                value: value.to_string(),
                format: self.format.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// Strftime format (general path)
// ---------------------------------------------------------------------------

/// Strptime parsing through chrono's format engine.
#[derive(Debug, Clone)]
pub struct StrftimeFormat {
    format: String,
    chrono_format: String,
}

impl StrftimeFormat {
    pub fn new(format: &str) -> Self {
        let chrono_format = translate_format(format);
        if StrftimeItems::new(&chrono_format).any(|item| matches!(item, Item::Error)) {
            tracing::warn!(format, "time format contains unknown directives, values will not parse");
        }
        Self {
            format: format.to_string(),
            chrono_format,
        }
    }
}

impl TimeParser for StrftimeFormat {
    fn name(&self) -> &'static str {
        "strftime"
    }

    fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimeParseError> {
        let mut parsed = Parsed::new();
        parse(&mut parsed, value, StrftimeItems::new(&self.chrono_format))
            .ok()
            .and_then(|()| finish(&parsed))
            .ok_or_else(|| TimeParseError::NoMatch {
                value: value.to_string(),
                format: self.format.clone(),
            })
    }
}

/// Map `%L` and `%N` onto chrono's fixed-width fraction directives.
fn translate_format(format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 4);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('L') => out.push_str("%3f"),
            Some('N') => out.push_str("%9f"),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Turn chrono's parsed fields into an instant. Missing offset means UTC,
/// missing time of day means midnight.
fn finish(parsed: &Parsed) -> Option<DateTime<Utc>> {
    if let Ok(dt) = parsed.to_datetime() {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = parsed.to_naive_datetime_with_offset(0) {
        return Some(naive.and_utc());
    }
    parsed
        .to_naive_date()
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

// ---------------------------------------------------------------------------
// Free-form
// ---------------------------------------------------------------------------

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y/%m/%d %H:%M:%S%.f %z",
    "%d/%b/%Y:%H:%M:%S %z",
    "%a %b %e %H:%M:%S %z %Y",
];

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f UTC",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%d/%b/%Y:%H:%M:%S",
    "%a %b %e %H:%M:%S %Y",
    "%b %e %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%B %e, %Y %H:%M:%S",
];

const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %e, %Y",
    "%B %e, %Y",
    "%b %e %Y",
];

/// Locale-agnostic parsing of common date/time representations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeForm;

impl TimeParser for FreeForm {
    fn name(&self) -> &'static str {
        "free-form"
    }

    fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimeParseError> {
        let s = value.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        for layout in OFFSET_LAYOUTS {
            if let Ok(dt) = DateTime::parse_from_str(s, layout) {
                return Ok(dt.with_timezone(&Utc));
            }
        }
        for layout in NAIVE_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
                return Ok(naive.and_utc());
            }
        }
        for layout in DATE_LAYOUTS {
            if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
                return Ok(date.and_time(NaiveTime::MIN).and_utc());
            }
        }

        Err(TimeParseError::Unrecognized(value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Ordered chain of time parsers built from a [`TimeSpec`].
pub struct TimeResolver {
    spec: TimeSpec,
    parsers: Vec<Box<dyn TimeParser>>,
}

impl TimeResolver {
    pub fn new(spec: TimeSpec) -> Self {
        let parsers: Vec<Box<dyn TimeParser>> = match spec.format.as_deref() {
            Some(format) => {
                let mut chain: Vec<Box<dyn TimeParser>> = Vec::with_capacity(2);
                match CompiledFormat::compile(format) {
                    Ok(compiled) => chain.push(Box::new(compiled)),
                    Err(e) => tracing::debug!(
                        format,
                        reason = %e,
                        "compiled time parser unavailable, using strftime only"
                    ),
                }
                chain.push(Box::new(StrftimeFormat::new(format)));
                chain
            }
            None => vec![Box::new(FreeForm)],
        };
        Self { spec, parsers }
    }

    /// Build a resolver with an explicit strategy chain.
    pub fn with_parsers(spec: TimeSpec, parsers: Vec<Box<dyn TimeParser>>) -> Self {
        Self { spec, parsers }
    }

    /// Names of the strategies, in the order they are tried.
    pub fn parser_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// Run the chain over a raw field value.
    pub fn parse(&self, raw: Option<&FieldValue>) -> Result<DateTime<Utc>, TimeParseError> {
        let text = match raw {
            None | Some(FieldValue::Null) => return Err(TimeParseError::Missing),
            Some(FieldValue::String(s)) => s.as_str(),
            Some(other) => return Err(TimeParseError::NotAString(other.to_string())),
        };

        let mut last = TimeParseError::Unrecognized(text.to_string());
        for parser in &self.parsers {
            match parser.parse(text) {
                Ok(time) => return Ok(time),
                Err(e) => {
                    tracing::trace!(parser = parser.name(), reason = %e, "time parser rejected value");
                    last = e;
                }
            }
        }
        Err(last)
    }

    /// Resolve a record time, degrading to `fallback` on failure.
    ///
    /// Exactly one diagnostic is reported for each failed resolution.
    pub fn resolve(
        &self,
        raw: Option<&FieldValue>,
        fallback: DateTime<Utc>,
        tag: &str,
        diagnostics: &dyn DiagnosticSink,
    ) -> DateTime<Utc> {
        match self.parse(raw) {
            Ok(time) => time,
            Err(e) => {
                diagnostics.time_parse_failed(TimeParseFailure {
                    tag: tag.to_string(),
                    fallback,
                    format: self.spec.format.clone(),
                    value: raw.map(|v| v.to_string()),
                    reason: e.to_string(),
                });
                fallback
            }
        }
    }
}

impl std::fmt::Debug for TimeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeResolver")
            .field("spec", &self.spec)
            .field("parsers", &self.parser_names())
            .finish()
    }
}
