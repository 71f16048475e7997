//! Terminal sink

use crate::core::config::TerminalConfig;
use crate::core::formatter::escape_line;
use crate::core::{LogLevel, LogRecord, Result, Sink, SinkKind, TimestampFormat};
use async_trait::async_trait;
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;

/// Writes records to the terminal
///
/// `ERROR` and `CRITICAL` go to stderr, everything else to stdout.
pub struct TerminalSink {
    name: String,
    min_level: LogLevel,
    use_colors: bool,
    timestamp_format: TimestampFormat,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self {
            name: SinkKind::Terminal.as_str().to_string(),
            min_level: LogLevel::Warn,
            use_colors: cfg!(feature = "console"),
            timestamp_format: TimestampFormat::default(),
        }
    }

    pub fn from_config(config: &TerminalConfig) -> Self {
        Self::new()
            .with_min_level(config.min_level)
            .with_colors(config.colors)
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Colored level names; no effect without the `console` feature
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors && cfg!(feature = "console");
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// `[timestamp] [LEVEL] message key=value`
    pub fn format_line(&self, record: &LogRecord) -> String {
        let level = format!("{:8}", record.level().to_str());
        #[cfg(feature = "console")]
        let level = if self.use_colors {
            level.color(record.level().color_code()).to_string()
        } else {
            level
        };

        let mut line = format!(
            "[{}] [{}] {}",
            self.timestamp_format.format(record.timestamp()),
            level,
            escape_line(record.message())
        );

        if let Some(metadata) = record.metadata() {
            line.push(' ');
            line.push_str(&escape_line(&metadata.format_fields()));
        }
        line
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for TerminalSink {
    async fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.format_line(record);
        match record.level() {
            LogLevel::Error | LogLevel::Critical => {
                writeln!(std::io::stderr().lock(), "{}", line)?
            }
            _ => writeln!(std::io::stdout().lock(), "{}", line)?,
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Terminal
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
