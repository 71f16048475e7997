//! Unified logger: fans one log call out to every configured sink

use super::{
    config::LoggerConfig,
    error::{LoggerError, Result},
    formatter::MessageFormatter,
    log_level::LogLevel,
    log_record::LogRecord,
    metadata::Metadata,
    metrics::LoggerMetrics,
    report::{DispatchReport, FailureCallback, SinkFailure},
    sink::{Sink, SinkKind},
};
use crate::sinks::{DiscordSink, HttpsTransport, LocalSink, TerminalSink, WebhookTransport};
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Dispatches records to a set of sinks with per-sink failure isolation
///
/// Sinks are invoked one after another, in the order they were added. An
/// error or panic in one sink is reported and never stops the others.
///
/// # Example
///
/// ```no_run
/// use unified_logger::prelude::*;
/// use unified_logger::sinks::LocalSink;
///
/// # async fn run() -> unified_logger::Result<()> {
/// let logger = UnifiedLogger::builder()
///     .min_level(LogLevel::Debug)
///     .sink(LocalSink::new("logs/app.log")?)
///     .build();
///
/// let report = logger.info("service started").await?;
/// assert!(report.delivered_to("local"));
/// # Ok(())
/// # }
/// ```
pub struct UnifiedLogger {
    name: String,
    min_level: Arc<RwLock<LogLevel>>,
    sinks: Vec<Box<dyn Sink>>,
    formatter: MessageFormatter,
    require_delivery: bool,
    metrics: Arc<LoggerMetrics>,
    on_failure: Option<FailureCallback>,
}

impl UnifiedLogger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "unified_logger".to_string(),
            min_level: Arc::new(RwLock::new(LogLevel::Info)),
            sinks: Vec::new(),
            formatter: MessageFormatter::default(),
            require_delivery: false,
            metrics: Arc::new(LoggerMetrics::new()),
            on_failure: None,
        }
    }

    #[must_use]
    pub fn builder() -> UnifiedLoggerBuilder {
        UnifiedLoggerBuilder::new()
    }

    /// Build the sinks a configuration enables, without touching the network
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        let mut config = config.clone();
        config.validate()?;

        let transport: Option<Arc<dyn WebhookTransport>> = if config.discord.enabled {
            Some(Arc::new(HttpsTransport::new()?))
        } else {
            None
        };
        Self::assemble(config, transport)
    }

    /// Like [`from_config`](Self::from_config), posting webhooks through `transport`
    pub fn from_config_with_transport(
        config: &LoggerConfig,
        transport: Arc<dyn WebhookTransport>,
    ) -> Result<Self> {
        let mut config = config.clone();
        config.validate()?;
        Self::assemble(config, Some(transport))
    }

    /// Build from configuration, then probe the webhook if `verify_on_start` is set
    ///
    /// A Discord sink that fails verification is removed with a warning; the
    /// remaining sinks keep working.
    pub async fn initialize(config: &LoggerConfig) -> Result<Self> {
        let mut logger = Self::from_config(config)?;
        if config.discord.verify_on_start {
            logger.verify_sinks().await;
        }
        Ok(logger)
    }

    fn assemble(config: LoggerConfig, transport: Option<Arc<dyn WebhookTransport>>) -> Result<Self> {
        let metrics = Arc::new(LoggerMetrics::new());
        let mut builder = Self::builder()
            .name(&config.logger_name)
            .min_level(config.min_level)
            .max_message_length(config.max_message_length)
            .filter_patterns(config.filter_patterns.clone())
            .require_delivery(config.require_delivery)
            .metrics(Arc::clone(&metrics));

        for kind in config.enabled_sinks() {
            builder = match kind {
                SinkKind::Local => builder.sink(LocalSink::from_config(&config.local)?),
                SinkKind::Discord => {
                    let transport = transport.clone().ok_or_else(|| {
                        LoggerError::config("discord", "no webhook transport available")
                    })?;
                    builder.sink(
                        DiscordSink::from_config(
                            &config.discord,
                            config.discord_username(),
                            transport,
                        )?
                        .with_metrics(Arc::clone(&metrics)),
                    )
                }
                SinkKind::Terminal => builder.sink(TerminalSink::from_config(&config.terminal)),
            };
        }

        Ok(builder.build())
    }

    /// Run every sink's `verify`, dropping those that fail
    ///
    /// Returns the failures that caused sinks to be removed.
    pub async fn verify_sinks(&mut self) -> Vec<SinkFailure> {
        let mut failures = Vec::new();
        let mut kept = Vec::with_capacity(self.sinks.len());

        for sink in std::mem::take(&mut self.sinks) {
            let outcome = AssertUnwindSafe(async { sink.verify().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(LoggerError::sink_panic(sink.name(), panic_message(&panic)))
                });

            match outcome {
                Ok(()) => kept.push(sink),
                Err(e) => {
                    eprintln!(
                        "[LOGGER WARNING] Sink '{}' failed verification and was disabled: {}",
                        sink.name(),
                        e
                    );
                    failures.push(SinkFailure::new(sink.name(), sink.kind(), &e));
                }
            }
        }

        self.sinks = kept;
        failures
    }

    pub fn add_sink(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    /// Override the global level until the returned guard drops
    ///
    /// # Example
    ///
    /// ```
    /// use unified_logger::prelude::*;
    ///
    /// let logger = UnifiedLogger::new();
    /// {
    ///     let _debug = logger.with_level(LogLevel::Debug);
    ///     assert_eq!(logger.min_level(), LogLevel::Debug);
    /// }
    /// assert_eq!(logger.min_level(), LogLevel::Info);
    /// ```
    #[must_use = "the previous level is restored when the guard drops"]
    pub fn with_level(&self, level: LogLevel) -> LevelGuard {
        let previous = std::mem::replace(&mut *self.min_level.write(), level);
        LevelGuard {
            slot: Arc::clone(&self.min_level),
            previous,
        }
    }

    pub fn set_require_delivery(&mut self, required: bool) {
        self.require_delivery = required;
    }

    /// Register a callback invoked for every sink failure
    pub fn on_failure(&mut self, callback: FailureCallback) {
        self.on_failure = Some(callback);
    }

    pub fn sink(&self, name: &str) -> Option<&dyn Sink> {
        self.sinks
            .iter()
            .find(|sink| sink.name() == name)
            .map(|sink| sink.as_ref())
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Dispatch one message to every sink whose level filter admits it
    ///
    /// Sink failures are collected in the report, not returned as errors.
    /// The call fails only with [`LoggerError::NoDelivery`], when delivery
    /// is required and every attempted sink failed.
    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        metadata: Option<Metadata>,
    ) -> Result<DispatchReport> {
        if level < self.min_level() {
            self.metrics.record_suppressed();
            return Ok(DispatchReport::suppressed());
        }

        let message = message.into();
        let Some(message) = self.formatter.process_message(&message) else {
            self.metrics.record_suppressed();
            return Ok(DispatchReport::suppressed());
        };

        let mut record = LogRecord::new(level, message);
        if let Some(metadata) = metadata {
            record = record.with_metadata(metadata);
        }

        self.metrics.record_dispatched();
        let report = self.dispatch(&record).await;

        if self.require_delivery && report.attempted() > 0 && !report.any_delivered() {
            return Err(LoggerError::NoDelivery {
                attempted: report.attempted(),
            });
        }
        Ok(report)
    }

    async fn dispatch(&self, record: &LogRecord) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sink in &self.sinks {
            if !sink.accepts(record.level()) {
                report.skipped.push(sink.name().to_string());
                continue;
            }

            let outcome = AssertUnwindSafe(async { sink.emit(record).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {
                    self.metrics.record_delivery();
                    report.delivered.push(sink.name().to_string());
                }
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink.name(), e);
                    report.failed.push(self.report_failure(sink.as_ref(), &e));
                }
                Err(panic) => {
                    let message = panic_message(&panic);
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked: {}. \
                         Other sinks continue to function.",
                        sink.name(),
                        message
                    );
                    let e = LoggerError::sink_panic(sink.name(), message);
                    report.failed.push(self.report_failure(sink.as_ref(), &e));
                }
            }
        }

        report
    }

    fn report_failure(&self, sink: &dyn Sink, error: &LoggerError) -> SinkFailure {
        self.metrics.record_sink_failure();
        let failure = SinkFailure::new(sink.name(), sink.kind(), error);
        if let Some(ref callback) = self.on_failure {
            callback(&failure);
        }
        failure
    }

    #[inline]
    pub async fn debug(&self, message: impl Into<String>) -> Result<DispatchReport> {
        self.log(LogLevel::Debug, message, None).await
    }

    #[inline]
    pub async fn info(&self, message: impl Into<String>) -> Result<DispatchReport> {
        self.log(LogLevel::Info, message, None).await
    }

    #[inline]
    pub async fn warn(&self, message: impl Into<String>) -> Result<DispatchReport> {
        self.log(LogLevel::Warn, message, None).await
    }

    #[inline]
    pub async fn error(&self, message: impl Into<String>) -> Result<DispatchReport> {
        self.log(LogLevel::Error, message, None).await
    }

    #[inline]
    pub async fn critical(&self, message: impl Into<String>) -> Result<DispatchReport> {
        self.log(LogLevel::Critical, message, None).await
    }

    /// Log an error and its `source()` chain at `ERROR`
    ///
    /// The first line is `"{message}: {err}"` (just `err` when `message` is
    /// empty), followed by one `Caused by: ...` line per underlying cause.
    pub async fn exception<E>(&self, err: &E, message: &str) -> Result<DispatchReport>
    where
        E: std::error::Error + ?Sized,
    {
        let mut text = if message.is_empty() {
            err.to_string()
        } else {
            format!("{}: {}", message, err)
        };

        let mut cause = err.source();
        while let Some(inner) = cause {
            text.push_str("\nCaused by: ");
            text.push_str(&inner.to_string());
            cause = inner.source();
        }

        self.log(LogLevel::Error, text, None).await
    }

    /// Log serializable data at `INFO` as `Result Data: {pretty json}`
    pub async fn result_data<T>(&self, data: &T) -> Result<DispatchReport>
    where
        T: Serialize + ?Sized,
    {
        let formatted = MessageFormatter::format_data(data)?;
        self.log(LogLevel::Info, format!("Result Data: {}", formatted), None)
            .await
    }

    /// Flush every sink; a failing sink does not stop the others
    ///
    /// Returns the first failure, after all sinks have been flushed.
    pub async fn flush(&self) -> Result<()> {
        let mut first_error = None;

        for sink in &self.sinks {
            let outcome = AssertUnwindSafe(async { sink.flush().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(LoggerError::sink_panic(sink.name(), panic_message(&panic)))
                });

            if let Err(e) = outcome {
                eprintln!("[LOGGER ERROR] Sink '{}' flush failed: {}", sink.name(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flush and release every sink
    ///
    /// Later calls to `log` reach no sink. Returns `true` if every flush
    /// succeeded.
    pub async fn shutdown(&mut self) -> bool {
        let flushed = match self.flush().await {
            Ok(()) => true,
            Err(e) => {
                eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
                false
            }
        };
        self.sinks.clear();
        flushed
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl Default for UnifiedLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnifiedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UnifiedLogger(name={}, sinks=[{}], level={})",
            self.name,
            self.sink_names().join(", "),
            self.min_level()
        )
    }
}

impl Drop for UnifiedLogger {
    fn drop(&mut self) {
        let failures = self.metrics.sink_failures();
        if failures > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down with {} sink failures (failure rate: {:.2}%)",
                self.name,
                failures,
                self.metrics.failure_rate()
            );
        }
    }
}

/// Restores the global level it replaced when dropped
pub struct LevelGuard {
    slot: Arc<RwLock<LogLevel>>,
    previous: LogLevel,
}

impl LevelGuard {
    pub fn previous(&self) -> LogLevel {
        self.previous
    }
}

impl Drop for LevelGuard {
    fn drop(&mut self) {
        *self.slot.write() = self.previous;
    }
}

pub struct UnifiedLoggerBuilder {
    name: String,
    min_level: LogLevel,
    sinks: Vec<Box<dyn Sink>>,
    max_message_length: usize,
    filter_patterns: Vec<String>,
    require_delivery: bool,
    metrics: Option<Arc<LoggerMetrics>>,
    on_failure: Option<FailureCallback>,
}

impl UnifiedLoggerBuilder {
    pub fn new() -> Self {
        Self {
            name: "unified_logger".to_string(),
            min_level: LogLevel::Info,
            sinks: Vec::new(),
            max_message_length: MessageFormatter::default().max_message_length(),
            filter_patterns: Vec::new(),
            require_delivery: false,
            metrics: None,
            on_failure: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = max;
        self
    }

    /// Messages containing any of these, ignoring case, are dropped
    #[must_use = "builder methods return a new value"]
    pub fn filter_patterns(mut self, patterns: Vec<String>) -> Self {
        self.filter_patterns = patterns;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn require_delivery(mut self, required: bool) -> Self {
        self.require_delivery = required;
        self
    }

    /// Share counters with sinks built elsewhere
    #[must_use = "builder methods return a new value"]
    pub fn metrics(mut self, metrics: Arc<LoggerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn on_failure(mut self, callback: FailureCallback) -> Self {
        self.on_failure = Some(callback);
        self
    }

    pub fn build(self) -> UnifiedLogger {
        UnifiedLogger {
            name: self.name,
            min_level: Arc::new(RwLock::new(self.min_level)),
            sinks: self.sinks,
            formatter: MessageFormatter::new(self.max_message_length, &self.filter_patterns),
            require_delivery: self.require_delivery,
            metrics: self.metrics.unwrap_or_default(),
            on_failure: self.on_failure,
        }
    }
}

impl Default for UnifiedLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
