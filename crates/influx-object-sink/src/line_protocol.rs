// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB Line Protocol encoding of batches.
//!
//! ```text
//! series,tag1=val1,tag2=val2 field1=1i,field2=2.5 timestamp
//! ```
//!
//! Tags and fields are emitted in key order. Integers carry the `i` suffix.
//!
//! See: <https://docs.influxdata.com/influxdb/v1/write_protocols/line_protocol_reference/>

use crate::point::{Batch, ResolvedPoint};
use crate::value::Numeric;

/// Encode a numeric field value.
pub fn encode_value(value: &Numeric) -> String {
    match value {
        Numeric::Integer(v) => format!("{}i", v),
        Numeric::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{:.1}", v),
        Numeric::Float(v) => format!("{}", v),
    }
}

/// Encode one point as a single line (without the trailing newline).
pub fn encode_point(point: &ResolvedPoint) -> String {
    let mut line = escape_series(point.series());

    for (key, value) in point.tags() {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    for (i, (key, value)) in point.values().iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&encode_value(value));
    }

    line.push(' ');
    line.push_str(&point.timestamp().to_string());
    line
}

/// Encode a whole batch, one line per point.
pub fn encode_batch(batch: &Batch) -> String {
    batch
        .points()
        .iter()
        .map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Series names escape commas and spaces. Line breaks are written as `\n`
/// and `\r` so a point never spans two lines.
fn escape_series(s: &str) -> String {
    s.replace(',', "\\,")
        .replace(' ', "\\ ")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Tag keys, tag values and field keys also escape equals signs.
fn escape_key(s: &str) -> String {
    escape_series(s).replace('=', "\\=")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Precision;
    use std::collections::BTreeMap;

    fn point(
        series: &str,
        tags: &[(&str, &str)],
        values: &[(&str, Numeric)],
        ts: i64,
    ) -> ResolvedPoint {
        let tags: BTreeMap<String, String> = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let values: BTreeMap<String, Numeric> =
            values.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        ResolvedPoint::new(ts, series, values, tags).expect("point")
    }

    #[test]
    fn test_encode_values() {
        assert_eq!(encode_value(&Numeric::Integer(42)), "42i");
        assert_eq!(encode_value(&Numeric::Integer(-1)), "-1i");
        assert_eq!(encode_value(&Numeric::Float(3.25)), "3.25");
        assert_eq!(encode_value(&Numeric::Float(2.0)), "2.0");
    }

    #[test]
    fn test_encode_point_sorted_tags() {
        let p = point(
            "app.logs",
            &[("zone", "b"), ("region", "us-east")],
            &[("latency_ms", Numeric::Integer(42))],
            1_619_870_400,
        );
        assert_eq!(
            encode_point(&p),
            "app.logs,region=us-east,zone=b latency_ms=42i 1619870400"
        );
    }

    #[test]
    fn test_encode_point_without_tags() {
        let p = point(
            "cpu",
            &[],
            &[("idle", Numeric::Float(0.5)), ("busy", Numeric::Float(0.25))],
            7,
        );
        assert_eq!(encode_point(&p), "cpu busy=0.25,idle=0.5 7");
    }

    #[test]
    fn test_escape_special_chars() {
        let p = point(
            "my series",
            &[("tag key", "a,b=c")],
            &[("field=key", Numeric::Integer(1))],
            3,
        );
        assert_eq!(
            encode_point(&p),
            "my\\ series,tag\\ key=a\\,b\\=c field\\=key=1i 3"
        );

        // Backslashes are kept as is
        let p = point("disk", &[("path", "C:\\tmp")], &[("free", Numeric::Integer(1))], 4);
        assert_eq!(encode_point(&p), "disk,path=C:\\tmp free=1i 4");
    }

    #[test]
    fn test_line_breaks_stay_on_one_line() {
        let p = point(
            "app\nlogs",
            &[("region", "us\neast"), ("host\r", "a")],
            &[("v\n", Numeric::Integer(1))],
            5,
        );
        let line = encode_point(&p);
        assert_eq!(line.lines().count(), 1);
        assert!(!line.contains('\r'));
        assert_eq!(line, "app\\nlogs,host\\r=a,region=us\\neast v\\n=1i 5");
    }

    #[test]
    fn test_encode_batch() {
        let mut batch = Batch::new(Precision::Seconds);
        batch.push(point("a", &[], &[("v", Numeric::Integer(1))], 1));
        batch.push(point("b", &[], &[("v", Numeric::Integer(2))], 2));
        assert_eq!(encode_batch(&batch), "a v=1i 1\nb v=2i 2");
    }
}
