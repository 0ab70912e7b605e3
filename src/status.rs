//! Builds the `_status` health-check report served by web applications.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};
use std::path::Path;

use crate::formats::DATE_FORMAT;
use crate::runtime::Runtime;

/// Config keys with this prefix are reported as feature flags.
pub const FEATURE_FLAGS_PREFIX: &str = "FEATURE_FLAGS_";

/// Minimum percentage of free disk space for an instance to be healthy.
pub const DEFAULT_LOW_DISK_PERCENT_THRESHOLD: u8 = 5;

const VERSION_LABEL_FILE: &str = "version_label";

/// Reads `<dir>/version_label`, trimmed. `None` if it cannot be read.
pub fn version_label<R: Runtime>(runtime: &R, dir: &Path) -> Option<String> {
    match runtime.read_to_string(&dir.join(VERSION_LABEL_FILE)) {
        Ok(label) => Some(label.trim().to_string()),
        Err(e) => {
            debug!("No version label: {}", e);
            None
        }
    }
}

/// Every config entry whose key starts with [`FEATURE_FLAGS_PREFIX`].
pub fn feature_flags(config: &Map<String, Value>) -> Map<String, Value> {
    config
        .iter()
        .filter(|(key, _)| key.starts_with(FEATURE_FLAGS_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskHealth {
    Ok,
    Low,
}

impl std::fmt::Display for DiskHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskHealth::Ok => write!(f, "OK"),
            DiskHealth::Low => write!(f, "LOW"),
        }
    }
}

/// Health of the root file system and its free space as a whole
/// percentage, rounded up.
pub fn disk_space_status<R: Runtime>(
    runtime: &R,
    low_disk_percent_threshold: u8,
) -> Result<(DiskHealth, u8)> {
    let usage = runtime.disk_usage(Path::new("/"))?;
    if usage.total_blocks == 0 {
        anyhow::bail!("File system reports zero blocks");
    }

    let free_percent = (usage.free_blocks.saturating_mul(100)).div_ceil(usage.total_blocks);
    let free_percent = u8::try_from(free_percent.min(100)).unwrap_or(100);

    let health = if free_percent >= low_disk_percent_threshold {
        DiskHealth::Ok
    } else {
        DiskHealth::Low
    };
    Ok((health, free_percent))
}

/// Validates a feature's `YYYY-MM-DD` enable date. Empty input means the
/// feature is not enabled.
pub fn enabled_since(date: Option<&str>) -> Result<Option<String>, chrono::ParseError> {
    match date {
        Some(date) if !date.is_empty() => {
            chrono::NaiveDate::parse_from_str(date, DATE_FORMAT)?;
            Ok(Some(date.to_string()))
        }
        _ => Ok(None),
    }
}

/// Raised by an additional status check to fail the report. The message
/// should identify the dependency that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub message: String,
}

impl StatusError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StatusError {}

/// Anything that can report its own `_status` document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn get_status(&self) -> Option<Map<String, Value>>;
}

/// Fetches the `_status` document of another service over HTTP.
pub struct HttpStatusSource {
    client: Client,
    url: String,
    auth_token: Option<String>,
}

impl HttpStatusSource {
    /// `base_url` is the service root; `/_status` is appended.
    pub fn new(client: Client, base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client,
            url: format!("{}/_status", base_url.trim_end_matches('/')),
            auth_token,
        }
    }

    async fn fetch(&self) -> Result<Map<String, Value>> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send status request")?;

        // Unhealthy services answer 500 with a status document; keep it.
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse status response ({})", status))?;

        match body {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("Status response is not a JSON object"),
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    #[tracing::instrument(skip(self))]
    async fn get_status(&self) -> Option<Map<String, Value>> {
        match self.fetch().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Status check for {} failed: {:#}", self.url, e);
                None
            }
        }
    }
}

/// A service the app depends on, reported under `key`.
pub struct Dependency<'a> {
    pub key: &'static str,
    pub name: &'static str,
    pub source: &'a dyn StatusSource,
}

impl<'a> Dependency<'a> {
    pub fn data_api(source: &'a dyn StatusSource) -> Self {
        Self {
            key: "api_status",
            name: "Data API",
            source,
        }
    }

    pub fn search_api(source: &'a dyn StatusSource) -> Self {
        Self {
            key: "search_api_status",
            name: "Search API",
            source,
        }
    }
}

/// An extra check whose mapping is merged into the report.
pub type AdditionalCheck = Box<dyn Fn() -> Result<Map<String, Value>, StatusError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct StatusOptions {
    pub version: String,
    pub config: Map<String, Value>,
    /// Only check that the app is routable and has disk space.
    pub ignore_dependencies: bool,
    pub low_disk_percent_threshold: u8,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            version: String::new(),
            config: Map::new(),
            ignore_dependencies: false,
            low_disk_percent_threshold: DEFAULT_LOW_DISK_PERCENT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub body: Value,
    pub status: StatusCode,
}

impl StatusReport {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Builds the `_status` document: `"status"` is `"ok"` (HTTP 200) unless
/// some check failed, in which case it is `"error"` (HTTP 500) and
/// `"message"` lists what went wrong.
#[tracing::instrument(skip_all)]
pub async fn app_status<R: Runtime>(
    runtime: &R,
    options: &StatusOptions,
    dependencies: &[Dependency<'_>],
    additional_checks: &[AdditionalCheck],
) -> Result<StatusReport> {
    let mut error_messages = Vec::new();
    let mut response = Map::new();
    response.insert("status".to_string(), json!("ok"));

    let (disk_health, free_percent) =
        disk_space_status(runtime, options.low_disk_percent_threshold)?;
    response.insert(
        "disk".to_string(),
        json!(format!("{} ({}% free)", disk_health, free_percent)),
    );
    if disk_health != DiskHealth::Ok {
        error_messages.push(format!("Disk space low: {}% remaining.", free_percent));
    }

    if !options.ignore_dependencies {
        response.insert("version".to_string(), json!(options.version));
        response.insert(
            "flags".to_string(),
            Value::Object(feature_flags(&options.config)),
        );

        for dependency in dependencies {
            let status = dependency
                .source
                .get_status()
                .await
                .unwrap_or_else(|| json_map(json!({"status": "n/a"})));

            let healthy = status
                .get("status")
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case("ok"));
            if !healthy {
                error_messages.push(format!("Error connecting to the {}.", dependency.name));
            }
            response.insert(dependency.key.to_string(), Value::Object(status));
        }

        for check in additional_checks {
            match check() {
                Ok(data) => response.extend(data),
                Err(e) => error_messages.push(e.message),
            }
        }
    }

    let status = if error_messages.is_empty() {
        StatusCode::OK
    } else {
        response.insert("status".to_string(), json!("error"));
        response.insert("message".to_string(), json!(error_messages));
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(StatusReport {
        body: Value::Object(response),
        status,
    })
}

fn json_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
