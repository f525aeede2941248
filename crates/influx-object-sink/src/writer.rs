// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Store write capability.
//!
//! [`PointWriter`] is the only thing the sink needs from the store. The
//! HTTP implementation speaks the InfluxDB 1.x API:
//!
//! ```text
//! POST /write?db=<db>&precision=<p>&u=<user>&p=<password>   (line protocol body)
//! GET  /query?q=SHOW DATABASES&u=<user>&p=<password>
//! ```
//!
//! Writers never retry; a failed write is returned to the caller as is.

use crate::config::{ConfigError, SinkConfig};
use crate::line_protocol::encode_batch;
use crate::point::Batch;
use reqwest::StatusCode;
use serde::Deserialize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Store write errors.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("not authorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("store rejected request ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("unexpected store response: {0}")]
    Decode(String),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

/// Writes a batch of points in one call.
pub trait PointWriter: Send + Sync {
    fn write_points(&self, batch: &Batch) -> Result<(), WriteError>;
}

/// InfluxDB 1.x HTTP writer.
///
/// With several hosts configured, consecutive calls rotate through them.
pub struct HttpPointWriter {
    client: reqwest::blocking::Client,
    endpoints: Vec<String>,
    next: AtomicUsize,
    dbname: String,
    user: String,
    password: String,
}

impl HttpPointWriter {
    pub fn from_config(config: &SinkConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let scheme = if config.use_ssl { "https" } else { "http" };
        let endpoints = config
            .hosts()
            .into_iter()
            .map(|host| format!("{}://{}:{}", scheme, host, config.port))
            .collect();

        let mut builder =
            reqwest::blocking::Client::builder().danger_accept_invalid_certs(!config.verify_ssl);
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        Ok(Self {
            client: builder.build()?,
            endpoints,
            next: AtomicUsize::new(0),
            dbname: config.dbname.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// Base URLs, one per configured host.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    fn endpoint(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[i]
    }

    /// Names of the databases visible to the configured user.
    pub fn list_databases(&self) -> Result<Vec<String>, WriteError> {
        let url = format!("{}/query", self.endpoint());
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", "SHOW DATABASES"),
                ("u", self.user.as_str()),
                ("p", self.password.as_str()),
            ])
            .send()?;
        let body = check_status(response)?;

        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| WriteError::Decode(e.to_string()))?;

        let mut names = Vec::new();
        for result in parsed.results {
            if let Some(error) = result.error {
                return Err(WriteError::Decode(error));
            }
            for series in result.series {
                names.extend(
                    series
                        .values
                        .into_iter()
                        .filter_map(|row| row.into_iter().next())
                        .filter_map(|v| v.as_str().map(str::to_string)),
                );
            }
        }
        Ok(names)
    }
}

impl PointWriter for HttpPointWriter {
    fn write_points(&self, batch: &Batch) -> Result<(), WriteError> {
        let url = format!("{}/write", self.endpoint());
        tracing::debug!(url = %url, points = batch.len(), "writing batch");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("db", self.dbname.as_str()),
                ("precision", batch.precision().as_str()),
                ("u", self.user.as_str()),
                ("p", self.password.as_str()),
            ])
            .body(encode_batch(batch))
            .send()?;
        check_status(response)?;
        Ok(())
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<String, WriteError> {
    let status = response.status();
    let body = response.text()?;
    if status.is_success() {
        return Ok(body);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(WriteError::Unauthorized {
            status: status.as_u16(),
            body,
        }),
        _ => Err(WriteError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    series: Vec<QuerySeries>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct QuerySeries {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Prints each batch as line protocol on stdout.
#[derive(Debug, Default)]
pub struct StdoutWriter;

impl PointWriter for StdoutWriter {
    fn write_points(&self, batch: &Batch) -> Result<(), WriteError> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", encode_batch(batch))?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_from_config() {
        let config = SinkConfig {
            host: "a, b".to_string(),
            port: 9999,
            use_ssl: true,
            ..Default::default()
        };
        let writer = HttpPointWriter::from_config(&config).expect("writer");
        assert_eq!(writer.endpoints(), &["https://a:9999", "https://b:9999"]);
        assert_eq!(writer.dbname(), "fluentd");
    }

    #[test]
    fn test_endpoint_rotation() {
        let config = SinkConfig {
            host: "a,b,c".to_string(),
            ..Default::default()
        };
        let writer = HttpPointWriter::from_config(&config).expect("writer");
        let picked: Vec<String> = (0..4).map(|_| writer.endpoint().to_string()).collect();
        assert_eq!(
            picked,
            vec![
                "http://a:8086",
                "http://b:8086",
                "http://c:8086",
                "http://a:8086"
            ]
        );
    }

    #[test]
    fn test_from_config_validates() {
        let config = SinkConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            HttpPointWriter::from_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_query_response_parsing() {
        let body = r#"{"results":[{"statement_id":0,"series":[{"name":"databases","columns":["name"],"values":[["_internal"],["fluentd"]]}]}]}"#;
        let parsed: QueryResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].series[0].values.len(), 2);
    }
}
