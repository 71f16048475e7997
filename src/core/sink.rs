//! Sink trait for log output destinations

use super::{error::LoggerError, error::Result, log_level::LogLevel, log_record::LogRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Destination kinds known to the unified logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Local,
    Discord,
    Terminal,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Local => "local",
            SinkKind::Discord => "discord",
            SinkKind::Terminal => "terminal",
        }
    }

    /// Parse a comma-separated list such as `"local, discord"`
    ///
    /// Empty items are skipped; unknown names are a configuration error.
    pub fn parse_list(list: &str) -> Result<BTreeSet<SinkKind>> {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<SinkKind>()
                    .map_err(|message| LoggerError::config("sinks", message))
            })
            .collect()
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "file" => Ok(SinkKind::Local),
            "discord" => Ok(SinkKind::Discord),
            "terminal" | "console" => Ok(SinkKind::Terminal),
            other => Err(format!(
                "unknown sink '{}' (expected local, discord or terminal)",
                other
            )),
        }
    }
}

/// A destination that accepts formatted records
///
/// `emit` takes `&self`; sinks keep whatever mutable state they need behind
/// their own locks so one logger can be shared across tasks.
///
/// # Example
///
/// ```no_run
/// use unified_logger::core::{LogLevel, LogRecord, Result, Sink, SinkKind};
/// use async_trait::async_trait;
///
/// struct StdoutSink;
///
/// #[async_trait]
/// impl Sink for StdoutSink {
///     async fn emit(&self, record: &LogRecord) -> Result<()> {
///         println!("{}", record.message());
///         Ok(())
///     }
///
///     async fn flush(&self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     fn kind(&self) -> SinkKind {
///         SinkKind::Terminal
///     }
///
///     fn min_level(&self) -> LogLevel {
///         LogLevel::Debug
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Attempt delivery of one record
    async fn emit(&self, record: &LogRecord) -> Result<()>;

    /// Push out anything buffered
    async fn flush(&self) -> Result<()>;

    fn name(&self) -> &str;

    fn kind(&self) -> SinkKind;

    /// Records below this level are never passed to `emit`
    fn min_level(&self) -> LogLevel;

    fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level()
    }

    /// Check the destination is reachable before first use
    async fn verify(&self) -> Result<()> {
        Ok(())
    }
}
