//! Core logger types and traits

pub mod config;
pub mod error;
pub mod formatter;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metadata;
pub mod metrics;
pub mod report;
pub mod sink;
pub mod timestamp;

pub use config::{DiscordConfig, LocalConfig, LoggerConfig, TerminalConfig};
pub use error::{LoggerError, Result};
pub use formatter::{MessageFormatter, OutputFormat, WebhookPayload};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use logger::{LevelGuard, UnifiedLogger, UnifiedLoggerBuilder};
pub use metadata::{FieldValue, Metadata};
pub use metrics::LoggerMetrics;
pub use report::{DispatchReport, FailureCallback, SinkFailure};
pub use sink::{Sink, SinkKind};
pub use timestamp::TimestampFormat;
