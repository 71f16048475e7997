//! Discord webhook sink
//!
//! Posts each record as an embed to a webhook. Delivery is best effort: a
//! failed attempt (network error, timeout, non-2xx status) is retried a
//! bounded number of times and then reported to the caller as an error.

use super::transport::{HttpsTransport, WebhookResponse, WebhookTransport};
use crate::core::config::{is_discord_webhook_url, DiscordConfig};
use crate::core::formatter::{WebhookPayload, DEFAULT_MAX_EMBED_LENGTH};
use crate::core::{LogLevel, LogRecord, LoggerError, LoggerMetrics, Result, Sink, SinkKind};
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How failed webhook posts are retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first; total attempts = `max_retries + 1`
    pub max_retries: u32,

    /// Linear backoff step: the n-th retry waits `base_delay * n`
    pub base_delay: Duration,

    /// Cap for a server-requested `retry_after`
    pub max_retry_after: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-indexed), plus up to 10% jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self.base_delay.saturating_mul(retry.max(1));
        let jitter_ms = (base.as_millis() / 10) as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Delay for a rate-limited attempt; the server's hint wins when present
    pub fn rate_limited(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(self.max_retry_after),
            None => self.backoff(retry),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_retry_after: Duration::from_secs(30),
        }
    }
}

/// Result of a single POST
enum Attempt {
    Delivered,
    Failed {
        error: LoggerError,
        retry_after: Option<Duration>,
        rate_limited: bool,
    },
}

/// Sink that delivers records to a Discord channel through a webhook
///
/// # Example
///
/// ```no_run
/// use unified_logger::sinks::DiscordSink;
/// use unified_logger::prelude::*;
///
/// # async fn run() -> unified_logger::Result<()> {
/// let sink = DiscordSink::new("https://discord.com/api/webhooks/123/token")?
///     .with_min_level(LogLevel::Warn)
///     .with_username("deploy-bot");
///
/// let logger = UnifiedLogger::builder().sink(sink).build();
/// logger.warn("replica lag above 30s").await?;
/// # Ok(())
/// # }
/// ```
pub struct DiscordSink {
    name: String,
    webhook_url: String,
    username: String,
    min_level: LogLevel,
    max_embed_length: usize,
    timeout: Duration,
    retry: RetryPolicy,
    transport: Arc<dyn WebhookTransport>,
    requests: AtomicU64,
    metrics: Option<Arc<LoggerMetrics>>,
}

impl DiscordSink {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Sink posting over HTTPS
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        Ok(Self::with_transport(webhook_url, Arc::new(HttpsTransport::new()?)))
    }

    /// Sink posting through a caller-supplied transport
    pub fn with_transport(
        webhook_url: impl Into<String>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self {
            name: SinkKind::Discord.as_str().to_string(),
            webhook_url: webhook_url.into(),
            username: "unified_logger".to_string(),
            min_level: LogLevel::Info,
            max_embed_length: DEFAULT_MAX_EMBED_LENGTH,
            timeout: Self::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            transport,
            requests: AtomicU64::new(0),
            metrics: None,
        }
    }

    /// Build from the `discord` configuration section
    pub fn from_config(
        config: &DiscordConfig,
        username: &str,
        transport: Arc<dyn WebhookTransport>,
    ) -> Result<Self> {
        let url = config
            .webhook_url
            .clone()
            .ok_or_else(|| LoggerError::config("discord", "enabled without a webhook_url"))?;

        Ok(Self::with_transport(url, transport)
            .with_min_level(config.min_level)
            .with_username(username)
            .with_max_embed_length(config.max_embed_length)
            .with_timeout(config.timeout())
            .with_retry_policy(RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_delay(),
                max_retry_after: config.max_retry_after(),
            }))
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    #[must_use]
    pub fn with_max_embed_length(mut self, max: usize) -> Self {
        self.max_embed_length = max;
        self
    }

    /// Deadline for each individual attempt
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Count retries in the logger's shared metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<LoggerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// HTTP requests issued so far, retries included
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Post a payload, retrying per the policy
    async fn deliver(&self, body: String) -> Result<()> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let (error, retry_after, rate_limited) = match self.post_once(&body).await {
                Attempt::Delivered => return Ok(()),
                Attempt::Failed {
                    error,
                    retry_after,
                    rate_limited,
                } => (error, retry_after, rate_limited),
            };

            if attempts > self.retry.max_retries {
                return Err(if attempts == 1 {
                    error
                } else {
                    LoggerError::retries_exhausted(attempts, error)
                });
            }

            let delay = if rate_limited {
                self.retry.rate_limited(attempts, retry_after)
            } else {
                self.retry.backoff(attempts)
            };

            if let Some(ref metrics) = self.metrics {
                metrics.record_webhook_retry();
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn post_once(&self, body: &str) -> Attempt {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let sent = tokio::time::timeout(
            self.timeout,
            self.transport.post_json(&self.webhook_url, body.to_string()),
        )
        .await;

        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                return Attempt::Failed {
                    error,
                    retry_after: None,
                    rate_limited: false,
                }
            }
            Err(_) => {
                return Attempt::Failed {
                    error: LoggerError::WebhookTimeout(self.timeout),
                    retry_after: None,
                    rate_limited: false,
                }
            }
        };

        if response.is_success() {
            return Attempt::Delivered;
        }

        let rate_limited = response.status == 429;
        Attempt::Failed {
            retry_after: if rate_limited {
                parse_retry_after(&response)
            } else {
                None
            },
            rate_limited,
            error: LoggerError::webhook_status(response.status, response.body),
        }
    }
}

/// Discord puts the wait in seconds (fractional) in the JSON body
fn parse_retry_after(response: &WebhookResponse) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_str(&response.body).ok()?;
    let seconds = value.get("retry_after")?.as_f64()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    // Saturate; the policy caps the wait at `max_retry_after`.
    Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
}

#[async_trait]
impl Sink for DiscordSink {
    async fn emit(&self, record: &LogRecord) -> Result<()> {
        let body = WebhookPayload::from_record(record, &self.username, self.max_embed_length)
            .to_json();
        self.deliver(body).await
    }

    async fn flush(&self) -> Result<()> {
        // Nothing is buffered; every emit completes its own request.
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Discord
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Single probe post, no retries
    async fn verify(&self) -> Result<()> {
        if !is_discord_webhook_url(&self.webhook_url) {
            return Err(LoggerError::config(
                "discord",
                format!("'{}' is not a Discord webhook URL", self.webhook_url),
            ));
        }

        match self.post_once(&WebhookPayload::probe(&self.username).to_json()).await {
            Attempt::Delivered => Ok(()),
            Attempt::Failed { error, .. } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const URL: &str = "https://discord.com/api/webhooks/1/token";

    /// Replays canned responses, then answers 204
    struct Scripted {
        responses: Mutex<Vec<Result<WebhookResponse>>>,
        bodies: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<WebhookResponse>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                bodies: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WebhookTransport for Scripted {
        async fn post_json(&self, _url: &str, body: String) -> Result<WebhookResponse> {
            self.bodies.lock().push(body);
            self.responses
                .lock()
                .pop()
                .unwrap_or_else(|| Ok(WebhookResponse::new(204, "")))
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_retry_after: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_emit_posts_embed() {
        let transport = Scripted::new(vec![]);
        let sink = DiscordSink::with_transport(URL, transport.clone()).with_username("ops");

        sink.emit(&LogRecord::new(LogLevel::Warn, "disk 91%"))
            .await
            .unwrap();

        let bodies = transport.bodies.lock();
        assert_eq!(bodies.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(json["username"], "ops");
        assert_eq!(json["embeds"][0]["title"], "WARN Log");
        assert_eq!(json["embeds"][0]["description"], "disk 91%");
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let transport = Scripted::new(vec![
            Ok(WebhookResponse::new(502, "bad gateway")),
            Err(LoggerError::transport("connection reset")),
        ]);
        let sink = DiscordSink::with_transport(URL, transport).with_retry_policy(fast_retry(3));

        sink.emit(&LogRecord::new(LogLevel::Error, "x")).await.unwrap();
        assert_eq!(sink.request_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_bound() {
        let transport = Scripted::new((0..10).map(|_| Ok(WebhookResponse::new(500, "err"))).collect());
        let sink = DiscordSink::with_transport(URL, transport).with_retry_policy(fast_retry(2));

        let err = sink.emit(&LogRecord::new(LogLevel::Error, "x")).await.unwrap_err();
        assert!(matches!(err, LoggerError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(sink.request_count(), 3);
    }

    #[tokio::test]
    async fn test_no_retry_returns_raw_error() {
        let transport = Scripted::new(vec![Ok(WebhookResponse::new(404, "Unknown Webhook"))]);
        let sink = DiscordSink::with_transport(URL, transport).with_retry_policy(fast_retry(0));

        let err = sink.emit(&LogRecord::new(LogLevel::Info, "x")).await.unwrap_err();
        assert!(matches!(err, LoggerError::WebhookStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_uses_retry_after() {
        let transport = Scripted::new(vec![Ok(WebhookResponse::new(
            429,
            r#"{"message":"You are being rate limited.","retry_after":0.002,"global":false}"#,
        ))]);
        let metrics = Arc::new(LoggerMetrics::new());
        let sink = DiscordSink::with_transport(URL, transport)
            .with_retry_policy(fast_retry(1))
            .with_metrics(Arc::clone(&metrics));

        sink.emit(&LogRecord::new(LogLevel::Info, "x")).await.unwrap();
        assert_eq!(metrics.webhook_retries(), 1);
    }

    #[tokio::test]
    async fn test_oversized_retry_after_is_capped() {
        let transport = Scripted::new(vec![Ok(WebhookResponse::new(
            429,
            r#"{"message":"You are being rate limited.","retry_after":1e30,"global":false}"#,
        ))]);
        let sink = DiscordSink::with_transport(URL, transport).with_retry_policy(fast_retry(1));

        sink.emit(&LogRecord::new(LogLevel::Info, "x")).await.unwrap();
        assert_eq!(sink.request_count(), 2);
        assert_eq!(
            sink.retry_policy().rate_limited(1, Some(Duration::MAX)),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn test_parse_retry_after() {
        let parse = |body: &str| parse_retry_after(&WebhookResponse::new(429, body));
        assert_eq!(parse(r#"{"retry_after":1.5}"#), Some(Duration::from_millis(1500)));
        assert_eq!(parse(r#"{"retry_after":1e30}"#), Some(Duration::MAX));
        assert_eq!(parse(r#"{"retry_after":-2}"#), None);
        assert_eq!(parse("not json"), None);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        struct Hanging;

        #[async_trait]
        impl WebhookTransport for Hanging {
            async fn post_json(&self, _url: &str, _body: String) -> Result<WebhookResponse> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(WebhookResponse::new(204, ""))
            }
        }

        let sink = DiscordSink::with_transport(URL, Arc::new(Hanging))
            .with_timeout(Duration::from_millis(20))
            .with_retry_policy(fast_retry(0));

        let err = sink.emit(&LogRecord::new(LogLevel::Info, "x")).await.unwrap_err();
        assert!(matches!(err, LoggerError::WebhookTimeout(_)));
    }

    #[tokio::test]
    async fn test_verify() {
        let ok = DiscordSink::with_transport(URL, Scripted::new(vec![]));
        assert!(ok.verify().await.is_ok());

        let unauthorized = DiscordSink::with_transport(
            URL,
            Scripted::new(vec![Ok(WebhookResponse::new(401, "Unauthorized"))]),
        );
        assert!(unauthorized.verify().await.is_err());
        assert_eq!(unauthorized.request_count(), 1);

        let bad_url = DiscordSink::with_transport("https://example.com/x", Scripted::new(vec![]));
        assert!(bad_url.verify().await.unwrap_err().is_config());
        assert_eq!(bad_url.request_count(), 0);
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_retry_after: Duration::from_secs(1),
        };
        for retry in 1..=3u32 {
            let delay = policy.backoff(retry);
            let floor = Duration::from_millis(100 * retry as u64);
            assert!(delay >= floor && delay <= floor + floor / 10, "{:?}", delay);
        }
        assert_eq!(
            policy.rate_limited(1, Some(Duration::from_secs(90))),
            Duration::from_secs(1)
        );
    }
}
