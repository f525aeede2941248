// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Points and batches submitted to the store.

use crate::value::Numeric;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp precision of written points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
pub enum Precision {
    #[serde(rename = "ns", alias = "n")]
    Nanoseconds,
    #[serde(rename = "u")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[default]
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
}

impl Precision {
    /// Value of the store's `precision` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "u",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }

    /// Integer epoch of `time` in this unit, truncated toward negative infinity.
    pub fn epoch(&self, time: &DateTime<Utc>) -> i64 {
        let secs = time.timestamp();
        match self {
            Self::Nanoseconds => time
                .timestamp_nanos_opt()
                .unwrap_or_else(|| secs.saturating_mul(1_000_000_000)),
            Self::Microseconds => time.timestamp_micros(),
            Self::Milliseconds => time.timestamp_millis(),
            Self::Seconds => secs,
            Self::Minutes => secs.div_euclid(60),
            Self::Hours => secs.div_euclid(3600),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One time-series point. Always carries at least one value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPoint {
    timestamp: i64,
    series: String,
    values: BTreeMap<String, Numeric>,
    tags: BTreeMap<String, String>,
}

impl ResolvedPoint {
    /// Build a point. Returns `None` if `values` is empty.
    pub fn new(
        timestamp: i64,
        series: impl Into<String>,
        values: BTreeMap<String, Numeric>,
        tags: BTreeMap<String, String>,
    ) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            timestamp,
            series: series.into(),
            values,
            tags,
        })
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn values(&self) -> &BTreeMap<String, Numeric> {
        &self.values
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

/// Points built from one chunk, written in a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    precision: Precision,
    points: Vec<ResolvedPoint>,
}

impl Batch {
    pub fn new(precision: Precision) -> Self {
        Self {
            precision,
            points: Vec::new(),
        }
    }

    pub fn with_capacity(precision: Precision, capacity: usize) -> Self {
        Self {
            precision,
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: ResolvedPoint) {
        self.points.push(point);
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn points(&self) -> &[ResolvedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_requires_values() {
        assert!(ResolvedPoint::new(1, "m", BTreeMap::new(), BTreeMap::new()).is_none());

        let mut values = BTreeMap::new();
        values.insert("v".to_string(), Numeric::Integer(1));
        let point = ResolvedPoint::new(1, "m", values, BTreeMap::new()).expect("point");
        assert_eq!(point.series(), "m");
        assert_eq!(point.timestamp(), 1);
    }

    #[test]
    fn test_precision_epoch() {
        let t = DateTime::from_timestamp(1_619_870_400, 123_456_789).unwrap();
        assert_eq!(Precision::Seconds.epoch(&t), 1_619_870_400);
        assert_eq!(Precision::Milliseconds.epoch(&t), 1_619_870_400_123);
        assert_eq!(Precision::Microseconds.epoch(&t), 1_619_870_400_123_456);
        assert_eq!(Precision::Nanoseconds.epoch(&t), 1_619_870_400_123_456_789);
        assert_eq!(Precision::Minutes.epoch(&t), 26_997_840);
        assert_eq!(Precision::Hours.epoch(&t), 449_964);
    }

    #[test]
    fn test_precision_names() {
        for p in [
            Precision::Nanoseconds,
            Precision::Microseconds,
            Precision::Milliseconds,
            Precision::Seconds,
            Precision::Minutes,
            Precision::Hours,
        ] {
            let parsed: Precision = serde_yaml::from_str(p.as_str()).unwrap();
            assert_eq!(parsed, p);
        }
        let alias: Precision = serde_yaml::from_str("n").unwrap();
        assert_eq!(alias, Precision::Nanoseconds);
        assert!(serde_yaml::from_str::<Precision>("d").is_err());
        assert_eq!(Precision::default(), Precision::Seconds);
    }
}
