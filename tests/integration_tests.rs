//! Integration tests for the unified logger
//!
//! These tests verify:
//! - Failure isolation between sinks
//! - Per-sink level filtering
//! - Configuration-driven construction
//! - Delivery policy and reporting
//! - Log injection prevention

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use unified_logger::core::config::LoggerConfig;
use unified_logger::sinks::{DiscordSink, RetryPolicy, WebhookResponse, WebhookTransport};
use unified_logger::{
    LocalSink, LogLevel, LoggerError, Metadata, OutputFormat, Result, SinkFailure, SinkKind,
    UnifiedLogger,
};

const WEBHOOK: &str = "https://discord.com/api/webhooks/42/secret";

/// Answers every post with a fixed status and records the bodies
struct FixedStatus {
    status: u16,
    posts: Mutex<Vec<String>>,
}

impl FixedStatus {
    fn new(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            posts: Mutex::new(Vec::new()),
        })
    }

    fn post_count(&self) -> usize {
        self.posts.lock().len()
    }
}

#[async_trait]
impl WebhookTransport for FixedStatus {
    async fn post_json(&self, _url: &str, body: String) -> Result<WebhookResponse> {
        self.posts.lock().push(body);
        Ok(WebhookResponse::new(self.status, ""))
    }
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        max_retry_after: Duration::from_millis(5),
    }
}

fn local_config(dir: &TempDir) -> LoggerConfig {
    let mut config = LoggerConfig::default();
    config.local.path = dir.path().join("app.log");
    config
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read log file")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_local_only_makes_no_network_calls() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = local_config(&temp_dir);
    let transport = FixedStatus::new(204);

    let logger = UnifiedLogger::from_config_with_transport(&config, transport.clone())
        .expect("Failed to build logger");
    let report = logger.info("started").await.expect("log failed");

    assert!(report.delivered_to("local"));
    assert_eq!(read_lines(&config.local.path).len(), 1);
    assert!(read_lines(&config.local.path)[0].ends_with(" - INFO - started"));
    assert_eq!(transport.post_count(), 0);
}

#[tokio::test]
async fn test_failing_webhook_does_not_block_local() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");
    let transport = FixedStatus::new(500);

    let logger = UnifiedLogger::builder()
        .sink(
            DiscordSink::with_transport(WEBHOOK, transport.clone())
                .with_retry_policy(fast_retry(2)),
        )
        .sink(LocalSink::new(&log_file).expect("Failed to create sink"))
        .build();

    let report = logger.error("database unreachable").await.expect("log failed");

    assert!(report.failed_on("discord"));
    assert!(report.delivered_to("local"));
    assert_eq!(transport.post_count(), 3, "first attempt plus two retries");
    assert_eq!(read_lines(&log_file).len(), 1);
}

#[tokio::test]
async fn test_unwritable_local_is_a_startup_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let transport = FixedStatus::new(204);

    let mut config = LoggerConfig::default();
    config.local.path = temp_dir.path().to_path_buf();
    config.discord.enabled = true;
    config.discord.webhook_url = Some(WEBHOOK.to_string());

    // A directory is not a valid log file: construction must fail loudly.
    let err = UnifiedLogger::from_config_with_transport(&config, transport.clone()).unwrap_err();
    assert!(matches!(err, LoggerError::LocalSink { .. }));

    config.local.enabled = false;
    let logger = UnifiedLogger::from_config_with_transport(&config, transport.clone())
        .expect("Failed to build logger");
    let report = logger.warn("disk almost full").await.expect("log failed");

    assert!(report.delivered_to("discord"));
    assert_eq!(transport.post_count(), 1);
    let body: serde_json::Value =
        serde_json::from_str(&transport.posts.lock()[0]).expect("payload is JSON");
    assert_eq!(body["username"], "unified_logger");
    assert_eq!(body["embeds"][0]["title"], "WARN Log");
}

#[tokio::test]
async fn test_sink_levels_are_independent() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = local_config(&temp_dir);
    config.min_level = LogLevel::Debug;
    config.discord.enabled = true;
    config.discord.webhook_url = Some(WEBHOOK.to_string());
    config.discord.min_level = LogLevel::Error;
    let transport = FixedStatus::new(204);

    let logger = UnifiedLogger::from_config_with_transport(&config, transport.clone())
        .expect("Failed to build logger");

    logger.debug("cache warmed").await.expect("log failed");
    logger.info("request served").await.expect("log failed");
    let report = logger.error("request failed").await.expect("log failed");

    assert_eq!(read_lines(&config.local.path).len(), 3);
    assert_eq!(transport.post_count(), 1);
    assert!(report.delivered_to("discord"));
    assert_eq!(logger.sink_names(), vec!["local", "discord"]);
}

#[tokio::test]
async fn test_require_delivery_when_all_sinks_fail() {
    let transport = FixedStatus::new(404);
    let mut config = LoggerConfig::default();
    config.local.enabled = false;
    config.discord.enabled = true;
    config.discord.webhook_url = Some(WEBHOOK.to_string());
    config.discord.max_retries = 0;
    config.require_delivery = true;

    let logger = UnifiedLogger::from_config_with_transport(&config, transport)
        .expect("Failed to build logger");

    let err = logger.critical("nobody hears this").await.unwrap_err();
    assert!(matches!(err, LoggerError::NoDelivery { attempted: 1 }));
    assert_eq!(logger.metrics().sink_failures(), 1);
}

#[tokio::test]
async fn test_failure_callback_sees_each_failure() {
    let failures: Arc<Mutex<Vec<SinkFailure>>> = Arc::new(Mutex::new(Vec::new()));
    let failures_clone = Arc::clone(&failures);

    let logger = UnifiedLogger::builder()
        .sink(
            DiscordSink::with_transport(WEBHOOK, FixedStatus::new(401))
                .with_retry_policy(fast_retry(0)),
        )
        .on_failure(Arc::new(move |failure: &SinkFailure| {
            failures_clone.lock().push(failure.clone());
        }))
        .build();

    logger.info("one").await.expect("log failed");
    logger.info("two").await.expect("log failed");

    let seen = failures.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].kind, SinkKind::Discord);
    assert!(seen[0].error.contains("401"));
}

#[tokio::test]
async fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection_test.log");

    let logger = UnifiedLogger::builder()
        .sink(LocalSink::new(&log_file).expect("Failed to create sink"))
        .build();

    let malicious = "User login\nERROR - Fake error injected\nINFO Continuation";
    logger.info(malicious).await.expect("log failed");

    let lines = read_lines(&log_file);
    assert_eq!(lines.len(), 1, "Log should be a single line, not multiple");
    assert!(lines[0].contains("User login\\nERROR - Fake error injected"));
}

#[tokio::test]
async fn test_filter_patterns_suppress_before_sinks() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = local_config(&temp_dir);
    config.filter_patterns = vec!["healthcheck".to_string()];

    let logger = UnifiedLogger::from_config(&config).expect("Failed to build logger");

    assert!(logger.info("GET /HealthCheck 200").await.unwrap().suppressed);
    assert!(!logger.info("GET /orders 200").await.unwrap().suppressed);

    assert_eq!(read_lines(&config.local.path).len(), 1);
    assert_eq!(logger.metrics().suppressed(), 1);
}

#[tokio::test]
async fn test_message_length_cap() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = local_config(&temp_dir);
    config.max_message_length = 20;
    config.local.format = OutputFormat::Json;

    let logger = UnifiedLogger::from_config(&config).expect("Failed to build logger");
    logger.info("x".repeat(100)).await.expect("log failed");

    let line = &read_lines(&config.local.path)[0];
    let json: serde_json::Value = serde_json::from_str(line).expect("JSON line");
    let message = json["message"].as_str().expect("message is a string");
    assert_eq!(message.chars().count(), 20);
    assert!(message.ends_with("..."));
}

#[tokio::test]
async fn test_level_guard_scopes_debug_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = local_config(&temp_dir);
    let logger = UnifiedLogger::from_config(&config).expect("Failed to build logger");

    logger.debug("hidden").await.expect("log failed");
    {
        let _guard = logger.with_level(LogLevel::Debug);
        logger.debug("visible").await.expect("log failed");
    }
    logger.debug("hidden again").await.expect("log failed");

    let lines = read_lines(&config.local.path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("visible"));
}

#[derive(Debug)]
struct Outer(std::io::Error);

impl std::fmt::Display for Outer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("config reload failed")
    }
}

impl std::error::Error for Outer {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[tokio::test]
async fn test_exception_and_result_data() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = local_config(&temp_dir);
    config.local.format = OutputFormat::Json;
    let logger = UnifiedLogger::from_config(&config).expect("Failed to build logger");

    let err = Outer(std::io::Error::new(std::io::ErrorKind::NotFound, "settings.json missing"));
    logger.exception(&err, "startup").await.expect("log failed");
    logger
        .result_data(&serde_json::json!({ "processed": 12, "failed": 0 }))
        .await
        .expect("log failed");

    let lines = read_lines(&config.local.path);
    let exception: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(exception["level"], "ERROR");
    assert_eq!(
        exception["message"],
        "startup: config reload failed\nCaused by: settings.json missing"
    );

    let data: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(data["level"], "INFO");
    assert!(data["message"]
        .as_str()
        .unwrap()
        .starts_with("Result Data: {\n  \"failed\": 0"));
}

#[tokio::test]
async fn test_metadata_reaches_every_sink() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");
    let transport = FixedStatus::new(204);

    let logger = UnifiedLogger::builder()
        .sink(LocalSink::new(&log_file).expect("Failed to create sink"))
        .sink(DiscordSink::with_transport(WEBHOOK, transport.clone()))
        .build();

    let metadata = Metadata::new()
        .with_field("job", "nightly-sync")
        .with_field("rows", 1500i64);
    logger
        .log(LogLevel::Info, "sync finished", Some(metadata))
        .await
        .expect("log failed");

    assert!(read_lines(&log_file)[0].ends_with("sync finished | job=nightly-sync rows=1500"));
    let body: serde_json::Value = serde_json::from_str(&transport.posts.lock()[0]).unwrap();
    assert_eq!(body["embeds"][0]["fields"][0]["name"], "job");
    assert_eq!(body["embeds"][0]["fields"][1]["value"], "1500");
}

#[tokio::test]
async fn test_initialize_drops_unverified_webhook() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = local_config(&temp_dir);
    config.discord.enabled = true;
    config.discord.webhook_url = Some(WEBHOOK.to_string());

    let mut logger = UnifiedLogger::from_config_with_transport(&config, FixedStatus::new(401))
        .expect("Failed to build logger");
    let removed = logger.verify_sinks().await;

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].sink, "discord");
    assert_eq!(logger.sink_names(), vec!["local"]);
}
