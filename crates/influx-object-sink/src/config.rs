// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML configuration for the sink.
//!
//! ```yaml
//! host: "influx-a,influx-b"
//! port: 8086
//! dbname: telemetry
//! measurement: null        # use the chunk tag as series name
//! time_key: time
//! time_key_format: "%Y-%m-%dT%H:%M:%S%z"
//! time_precision: ms
//! tag_keys: [region, host]
//! ```

use crate::diagnostics::DEFAULT_ERROR_TAG;
use crate::point::Precision;
use crate::time::{TimeSpec, DEFAULT_TIME_KEY};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Database {dbname} doesn't exist. Create it first, please. Existing databases: {}", .existing.join(","))]
    MissingDatabase {
        dbname: String,
        existing: Vec<String>,
    },
}

/// Sink configuration. Immutable once a sink is built from it.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    /// Store host, or a comma-separated list of hosts.
    pub host: String,
    /// Store HTTP port.
    pub port: u16,
    /// Target database.
    pub dbname: String,
    /// Series name for every point. `None` uses the chunk tag.
    pub measurement: Option<String>,
    pub user: String,
    pub password: String,
    /// Record field holding the time.
    pub time_key: String,
    /// Explicit strptime format for the time field.
    pub time_key_format: Option<String>,
    /// Timestamp precision of written points.
    pub time_precision: Precision,
    pub use_ssl: bool,
    pub verify_ssl: bool,
    /// Record fields copied into point tags.
    pub tag_keys: Vec<String>,
    /// Tag under which time parse failures are reported.
    pub time_parse_error_tag: String,
    /// Store request timeout. `None` keeps the HTTP client default.
    pub timeout_ms: Option<u64>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8086,
            dbname: "fluentd".to_string(),
            measurement: None,
            user: "root".to_string(),
            password: "root".to_string(),
            time_key: DEFAULT_TIME_KEY.to_string(),
            time_key_format: None,
            time_precision: Precision::Seconds,
            use_ssl: false,
            verify_ssl: true,
            tag_keys: Vec::new(),
            time_parse_error_tag: DEFAULT_ERROR_TAG.to_string(),
            timeout_ms: None,
        }
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("measurement", &self.measurement)
            .field("user", &self.user)
            .field("password", &"***")
            .field("time_key", &self.time_key)
            .field("time_key_format", &self.time_key_format)
            .field("time_precision", &self.time_precision)
            .field("use_ssl", &self.use_ssl)
            .field("verify_ssl", &self.verify_ssl)
            .field("tag_keys", &self.tag_keys)
            .field("time_parse_error_tag", &self.time_parse_error_tag)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl SinkConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: SinkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".into()));
        }
        if self.dbname.trim().is_empty() {
            return Err(ConfigError::Invalid("dbname must not be empty".into()));
        }
        if self.time_key.is_empty() {
            return Err(ConfigError::Invalid("time_key must not be empty".into()));
        }
        if matches!(self.time_key_format.as_deref(), Some("")) {
            return Err(ConfigError::Invalid(
                "time_key_format must not be empty when set".into(),
            ));
        }
        Ok(())
    }

    /// Hosts listed in `host`, trimmed, empty entries dropped.
    pub fn hosts(&self) -> Vec<&str> {
        self.host
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .collect()
    }

    pub fn time_spec(&self) -> TimeSpec {
        TimeSpec {
            key: self.time_key.clone(),
            format: self.time_key_format.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_YAML: &str = r#"
host: "influx-a, influx-b"
port: 8087
dbname: telemetry
measurement: requests
user: writer
password: s3cret
time_key: ts
time_key_format: "%Y-%m-%dT%H:%M:%S%z"
time_precision: ms
use_ssl: true
verify_ssl: false
tag_keys:
  - region
  - host
time_parse_error_tag: sink.error
timeout_ms: 2500
"#;

    #[test]
    fn test_config_defaults() {
        let config = SinkConfig::from_yaml("{}").expect("parse empty yaml");

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8086);
        assert_eq!(config.dbname, "fluentd");
        assert!(config.measurement.is_none());
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "root");
        assert_eq!(config.time_key, "time");
        assert!(config.time_key_format.is_none());
        assert_eq!(config.time_precision, Precision::Seconds);
        assert!(!config.use_ssl);
        assert!(config.verify_ssl);
        assert!(config.tag_keys.is_empty());
        assert_eq!(config.time_parse_error_tag, "influxdb.time_parse_error");
        assert!(config.timeout_ms.is_none());
    }

    #[test]
    fn test_config_parse_all_fields() {
        let config = SinkConfig::from_yaml(FULL_YAML).expect("parse full yaml");

        assert_eq!(config.hosts(), vec!["influx-a", "influx-b"]);
        assert_eq!(config.port, 8087);
        assert_eq!(config.dbname, "telemetry");
        assert_eq!(config.measurement.as_deref(), Some("requests"));
        assert_eq!(config.user, "writer");
        assert_eq!(config.time_precision, Precision::Milliseconds);
        assert!(config.use_ssl);
        assert!(!config.verify_ssl);
        assert_eq!(config.tag_keys, vec!["region", "host"]);
        assert_eq!(config.time_parse_error_tag, "sink.error");
        assert_eq!(config.timeout_ms, Some(2500));

        let spec = config.time_spec();
        assert_eq!(spec.key, "ts");
        assert_eq!(spec.format.as_deref(), Some("%Y-%m-%dT%H:%M:%S%z"));
    }

    #[test]
    fn test_config_rejects_invalid() {
        assert!(matches!(
            SinkConfig::from_yaml("host: ' , '"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SinkConfig::from_yaml("port: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SinkConfig::from_yaml("dbname: ''"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SinkConfig::from_yaml("time_precision: d"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            SinkConfig::from_yaml("unknown_key: 1"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config = SinkConfig::from_yaml(FULL_YAML).expect("parse full yaml");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(FULL_YAML.as_bytes()).expect("write");

        let config = SinkConfig::from_file(file.path()).expect("load");
        assert_eq!(config.dbname, "telemetry");

        let missing = SinkConfig::from_file("/nonexistent/sink.yaml");
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_missing_database_message() {
        let err = ConfigError::MissingDatabase {
            dbname: "metrics".into(),
            existing: vec!["_internal".into(), "fluentd".into()],
        };
        assert_eq!(
            err.to_string(),
            "Database metrics doesn't exist. Create it first, please. Existing databases: _internal,fluentd"
        );
    }
}
