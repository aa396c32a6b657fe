// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::bucket::ProcessingZone;
use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "WORKER_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/worker.toml";
pub const DEFAULT_JSON_PATH: &str = "config/worker.json";

/// Upper bound on concurrent events (and on the ingest backlog derived from it).
pub const MAX_IN_FLIGHT_LIMIT: usize = 4096;

/// Where inbound tweets come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON lines on standard input.
    #[default]
    Stdin,
    /// `POST /tweets` on the HTTP server.
    Http,
}

/// Where outbound score messages go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Http,
    /// Write messages to the log only (dry run).
    #[default]
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierProvider {
    #[default]
    Http,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    pub provider: ClassifierProvider,
    pub endpoint: Option<String>,
    /// "ENV" means: read from CLASSIFIER_API_KEY.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// "UTC" | "local" | numeric offset like "+02:00".
    pub processing_zone: String,
    pub source: SourceKind,
    pub sink: SinkKind,
    pub sink_endpoint: Option<String>,
    pub http_bind: String,
    pub max_in_flight: usize,
    pub classify_timeout_ms: u64,
    pub publish_timeout_ms: u64,
    pub classifier: ClassifierConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            processing_zone: "UTC".to_string(),
            source: SourceKind::default(),
            sink: SinkKind::default(),
            sink_endpoint: None,
            http_bind: "0.0.0.0:8080".to_string(),
            max_in_flight: 16,
            classify_timeout_ms: 10_000,
            publish_timeout_ms: 5_000,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn zone(&self) -> Result<ProcessingZone, ConfigError> {
        self.processing_zone.parse()
    }

    /// Apply environment-style overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PROCESSING_ZONE") {
            self.processing_zone = v;
        }
        if let Some(v) = lookup("CLASSIFIER_ENDPOINT") {
            self.classifier.endpoint = Some(v);
        }
        if let Some(v) = lookup("SINK_ENDPOINT") {
            self.sink_endpoint = Some(v);
        }
        if let Some(v) = lookup("HTTP_BIND") {
            self.http_bind = v;
        }
        if let Some(v) = lookup("WORKER_SOURCE") {
            self.source = match v.to_ascii_lowercase().as_str() {
                "stdin" => SourceKind::Stdin,
                "http" => SourceKind::Http,
                other => return Err(ConfigError::Invalid(format!("unknown source {other:?}"))),
            };
        }
        if let Some(v) = lookup("WORKER_SINK") {
            self.sink = match v.to_ascii_lowercase().as_str() {
                "http" => SinkKind::Http,
                "log" => SinkKind::Log,
                other => return Err(ConfigError::Invalid(format!("unknown sink {other:?}"))),
            };
        }
        if lookup("CLASSIFIER_TEST_MODE").is_some_and(|v| v == "mock") {
            self.classifier.provider = ClassifierProvider::Mock;
        }
        if let Some(v) = lookup("MAX_IN_FLIGHT") {
            self.max_in_flight = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("MAX_IN_FLIGHT={v:?}")))?;
        }

        // Resolve api key if "ENV"; an explicit env key always wins.
        let from_env = lookup("CLASSIFIER_API_KEY");
        let wants_env = self
            .classifier
            .api_key
            .as_deref()
            .is_some_and(|k| k.trim().eq_ignore_ascii_case("env"));
        match (from_env, wants_env) {
            (Some(k), _) => self.classifier.api_key = Some(k),
            (None, true) => {
                return Err(ConfigError::Invalid(
                    "classifier.api_key is \"ENV\" but CLASSIFIER_API_KEY is unset".into(),
                ))
            }
            (None, false) => {}
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;
        if self.max_in_flight == 0 || self.max_in_flight > MAX_IN_FLIGHT_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_in_flight must be in 1..={MAX_IN_FLIGHT_LIMIT}"
            )));
        }
        if self.classifier.provider == ClassifierProvider::Http
            && self.classifier.endpoint.as_deref().unwrap_or("").trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "http classifier requires classifier.endpoint".into(),
            ));
        }
        if self.sink == SinkKind::Http && self.sink_endpoint.as_deref().unwrap_or("").trim().is_empty()
        {
            return Err(ConfigError::Invalid("http sink requires sink_endpoint".into()));
        }
        Ok(())
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<WorkerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading worker config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing worker config {}", path.display()))
}

/// Load config using env var + fallbacks, then apply env overrides and validate:
/// 1) $WORKER_CONFIG_PATH
/// 2) config/worker.toml
/// 3) config/worker.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<WorkerConfig> {
    let mut cfg = load_file_default()?;
    cfg.apply_overrides(|k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

fn load_file_default() -> Result<WorkerConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    for p in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
    }
    Ok(WorkerConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WorkerConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => {
            if let Ok(v) = serde_json::from_str(s) {
                return Ok(v);
            }
            toml::from_str(s).map_err(|e| anyhow!("unsupported worker config format: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn toml_and_json_parse_with_defaults() {
        let t = r#"
processing_zone = "+02:00"
sink = "http"
sink_endpoint = "http://sink.local/publish"

[classifier]
provider = "mock"
"#;
        let cfg = parse_config(t, "toml").unwrap();
        assert_eq!(cfg.processing_zone, "+02:00");
        assert_eq!(cfg.sink, SinkKind::Http);
        assert_eq!(cfg.classifier.provider, ClassifierProvider::Mock);
        assert_eq!(cfg.max_in_flight, 16);
        cfg.validate().unwrap();

        let j = r#"{"source":"http","classifier":{"endpoint":"http://c.local"}}"#;
        let cfg = parse_config(j, "").unwrap();
        assert_eq!(cfg.source, SourceKind::Http);
        assert_eq!(cfg.processing_zone, "UTC");
        cfg.validate().unwrap();
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = WorkerConfig::default();
        cfg.apply_overrides(env(&[
            ("PROCESSING_ZONE", "local"),
            ("WORKER_SINK", "HTTP"),
            ("SINK_ENDPOINT", "http://s"),
            ("MAX_IN_FLIGHT", "4"),
        ]))
        .unwrap();
        assert_eq!(cfg.zone().unwrap(), ProcessingZone::Local);
        assert_eq!(cfg.sink, SinkKind::Http);
        assert_eq!(cfg.max_in_flight, 4);
    }

    #[test]
    fn api_key_env_marker_requires_variable() {
        let mut cfg = WorkerConfig::default();
        cfg.classifier.api_key = Some("ENV".into());
        assert!(cfg.clone().apply_overrides(env(&[])).is_err());

        cfg.apply_overrides(env(&[("CLASSIFIER_API_KEY", "secret")]))
            .unwrap();
        assert_eq!(cfg.classifier.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn validation_rejects_incomplete_setups() {
        let cfg = WorkerConfig::default();
        // default classifier is http without endpoint
        assert!(cfg.validate().is_err());

        let mut cfg = WorkerConfig::default();
        cfg.classifier.provider = ClassifierProvider::Mock;
        cfg.validate().unwrap();

        cfg.processing_zone = "Mars/Olympus".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Zone(_))));

        cfg.processing_zone = "UTC".into();
        cfg.max_in_flight = 0;
        assert!(cfg.validate().is_err());

        cfg.max_in_flight = MAX_IN_FLIGHT_LIMIT + 1;
        assert!(cfg.validate().is_err());
        cfg.max_in_flight = usize::MAX;
        assert!(cfg.validate().is_err());

        cfg.max_in_flight = 1;
        cfg.sink = SinkKind::Http;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn mock_test_mode_needs_no_classifier_endpoint() {
        let mut cfg = WorkerConfig::default();
        cfg.apply_overrides(env(&[("CLASSIFIER_TEST_MODE", "mock")]))
            .unwrap();
        assert_eq!(cfg.classifier.provider, ClassifierProvider::Mock);
        cfg.validate().unwrap();

        let mut cfg = WorkerConfig::default();
        cfg.apply_overrides(env(&[("CLASSIFIER_TEST_MODE", "off")]))
            .unwrap();
        assert_eq!(cfg.classifier.provider, ClassifierProvider::Http);
        assert!(cfg.validate().is_err());
    }
}
