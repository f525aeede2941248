// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB Object Sink CLI
//!
//! Reads JSON lines, groups them into chunks and writes each chunk to the
//! store as one batch of points.
//!
//! # Usage
//!
//! ```bash
//! # Read records from stdin; chunks are flushed at end of input
//! cat app.jsonl | influx-object-sink --config sink.yaml --tag app.logs
//!
//! # Replay a file in chunks of 500 records
//! influx-object-sink --config sink.yaml --input events.jsonl --chunk-size 500
//!
//! # Print line protocol instead of writing
//! influx-object-sink --config sink.yaml --input events.jsonl --dry-run
//! ```
//!
//! Each input line is either an envelope or a bare record:
//!
//! ```text
//! {"tag": "app.logs", "time": 1619870400, "record": {"latency_ms": 42}}
//! {"latency_ms": 42, "region": "us-east"}
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use influx_object_sink::{
    check_database, ChunkEntry, HttpPointWriter, ObjectSink, PointWriter, SinkConfig, StdoutWriter,
};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "influx-object-sink")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Write structured records to InfluxDB as time-series points")]
#[command(long_about = None)]
struct Cli {
    /// Sink configuration file (YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Input file with one JSON record per line (use - for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Tag for records without an envelope
    #[arg(short, long, default_value = "influx.object")]
    tag: String,

    /// Maximum number of records per chunk
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: u64,

    /// Print line protocol to stdout instead of writing to the store
    #[arg(long)]
    dry_run: bool,

    /// Do not check that the database exists at startup
    #[arg(long)]
    skip_db_check: bool,

    /// Verbose mode (debug logs)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("influx_object_sink=debug")
    } else {
        EnvFilter::new("influx_object_sink=info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = SinkConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        dbname = %config.dbname,
        precision = %config.time_precision,
        dry_run = cli.dry_run,
        "Starting InfluxDB object sink"
    );

    let writer: Arc<dyn PointWriter> = if cli.dry_run {
        Arc::new(StdoutWriter)
    } else {
        let http = HttpPointWriter::from_config(&config).context("Failed to create store client")?;
        if !cli.skip_db_check {
            check_database(&http, &config.user)?;
        }
        Arc::new(http)
    };

    let sink = ObjectSink::from_config(&config, writer).context("Failed to create sink")?;

    let reader: Box<dyn BufRead> = if cli.input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&cli.input)
            .with_context(|| format!("Failed to open input {}", cli.input.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut chunker = Chunker::new(cli.chunk_size as usize);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let Some((tag, entry)) = parse_line(&line, &cli.tag, Utc::now()) else {
            tracing::warn!(line = lineno + 1, "skipping input line that is not JSON");
            continue;
        };
        if let Some((tag, entries)) = chunker.push(tag, entry) {
            write_chunk(&sink, &tag, &entries)?;
        }
    }
    if let Some((tag, entries)) = chunker.finish() {
        write_chunk(&sink, &tag, &entries)?;
    }

    let stats = sink.stats();
    tracing::info!(
        chunks = stats.chunks_processed,
        records = stats.records_seen,
        discarded = stats.records_discarded,
        malformed = stats.records_malformed,
        time_parse_failures = stats.time_parse_failures,
        points_written = stats.points_written,
        "Sink shutdown complete"
    );

    Ok(())
}

fn write_chunk(sink: &ObjectSink, tag: &str, entries: &[ChunkEntry]) -> Result<()> {
    sink.process_chunk(tag, entries)
        .with_context(|| format!("Failed to write chunk for tag {}", tag))?;
    Ok(())
}

/// Decode one input line into its tag and chunk entry.
///
/// Objects with a `record` object member are envelopes; anything else is a
/// bare record under `default_tag`, timestamped `now`.
fn parse_line(line: &str, default_tag: &str, now: DateTime<Utc>) -> Option<(String, ChunkEntry)> {
    let value: Value = serde_json::from_str(line).ok()?;

    if let Value::Object(ref map) = value {
        if let Some(record) = map.get("record").filter(|r| r.is_object()) {
            let tag = map
                .get("tag")
                .and_then(Value::as_str)
                .unwrap_or(default_tag)
                .to_string();
            let time = map.get("time").and_then(epoch_time).unwrap_or(now);
            return Some((tag, ChunkEntry::new(time, record.clone())));
        }
    }

    Some((default_tag.to_string(), ChunkEntry::new(now, value)))
}

fn epoch_time(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(secs) = value.as_i64() {
        return DateTime::from_timestamp(secs, 0);
    }
    let secs = value.as_f64()?;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

/// Groups consecutive entries with the same tag, up to `limit` per chunk.
struct Chunker {
    limit: usize,
    tag: String,
    entries: Vec<ChunkEntry>,
}

impl Chunker {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            tag: String::new(),
            entries: Vec::new(),
        }
    }

    /// Add an entry. Returns the previous chunk when it is complete.
    fn push(&mut self, tag: String, entry: ChunkEntry) -> Option<(String, Vec<ChunkEntry>)> {
        let mut done = None;
        if !self.entries.is_empty() && (tag != self.tag || self.entries.len() >= self.limit) {
            done = self.take();
        }
        self.tag = tag;
        self.entries.push(entry);
        done
    }

    fn finish(&mut self) -> Option<(String, Vec<ChunkEntry>)> {
        self.take()
    }

    fn take(&mut self) -> Option<(String, Vec<ChunkEntry>)> {
        if self.entries.is_empty() {
            return None;
        }
        Some((std::mem::take(&mut self.tag), std::mem::take(&mut self.entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_envelope() {
        let line = r#"{"tag":"app.logs","time":1619870400,"record":{"latency_ms":42}}"#;
        let (tag, entry) = parse_line(line, "default", now()).unwrap();
        assert_eq!(tag, "app.logs");
        assert_eq!(entry.time.timestamp(), 1_619_870_400);
        assert_eq!(entry.record, json!({"latency_ms": 42}));
    }

    #[test]
    fn test_parse_envelope_defaults() {
        let line = r#"{"record":{"v":1}}"#;
        let (tag, entry) = parse_line(line, "default", now()).unwrap();
        assert_eq!(tag, "default");
        assert_eq!(entry.time, now());
    }

    #[test]
    fn test_parse_fractional_time() {
        let line = r#"{"tag":"t","time":1619870400.5,"record":{"v":1}}"#;
        let (_, entry) = parse_line(line, "default", now()).unwrap();
        assert_eq!(entry.time.timestamp_millis(), 1_619_870_400_500);
    }

    #[test]
    fn test_parse_bare_record() {
        let line = r#"{"latency_ms":42,"record":"not an object"}"#;
        let (tag, entry) = parse_line(line, "default", now()).unwrap();
        assert_eq!(tag, "default");
        assert_eq!(entry.record["latency_ms"], json!(42));
        assert_eq!(entry.time, now());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_line("{not json", "default", now()).is_none());
    }

    #[test]
    fn test_chunker_splits_on_tag_and_size() {
        let mut chunker = Chunker::new(2);
        let entry = || ChunkEntry::new(now(), json!({"v": 1}));

        assert!(chunker.push("a".into(), entry()).is_none());
        assert!(chunker.push("a".into(), entry()).is_none());

        // Size limit reached
        let (tag, entries) = chunker.push("a".into(), entry()).unwrap();
        assert_eq!(tag, "a");
        assert_eq!(entries.len(), 2);

        // Tag change
        let (tag, entries) = chunker.push("b".into(), entry()).unwrap();
        assert_eq!(tag, "a");
        assert_eq!(entries.len(), 1);

        let (tag, entries) = chunker.finish().unwrap();
        assert_eq!(tag, "b");
        assert_eq!(entries.len(), 1);
        assert!(chunker.finish().is_none());
    }
}
