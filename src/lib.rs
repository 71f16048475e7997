//! # Unified Logger
//!
//! Formats and dispatches log records to several destinations through one
//! call: a local file, a Discord channel via webhook, and the terminal.
//!
//! ## Features
//!
//! - **Failure Isolation**: a failing or panicking sink never stops the others
//! - **Per-Sink Levels**: every sink filters records on its own threshold
//! - **Bounded Retries**: webhook posts retry with backoff and honour rate limits
//! - **Dispatch Reports**: every call tells you which sinks delivered
//!
//! ## Quick Start
//!
//! ```no_run
//! use unified_logger::prelude::*;
//!
//! # async fn run() -> unified_logger::Result<()> {
//! let config = LoggerConfig::from_env()?;
//! let logger = UnifiedLogger::initialize(&config).await?;
//!
//! unified_logger::info!(logger, "worker {} started", 3).await?;
//! logger
//!     .log(
//!         LogLevel::Warn,
//!         "queue backlog",
//!         Some(Metadata::new().with_field("depth", 1200i64)),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        DispatchReport, FieldValue, LevelGuard, LogLevel, LogRecord, LoggerConfig, LoggerError,
        LoggerMetrics, Metadata, OutputFormat, Result, Sink, SinkFailure, SinkKind,
        TimestampFormat, UnifiedLogger, UnifiedLoggerBuilder,
    };
}

pub use core::{
    DispatchReport, FailureCallback, FieldValue, LevelGuard, LogLevel, LogRecord, LoggerConfig,
    LoggerError, LoggerMetrics, MessageFormatter, Metadata, OutputFormat, Result, Sink,
    SinkFailure, SinkKind, TimestampFormat, UnifiedLogger, UnifiedLoggerBuilder,
};
pub use sinks::{DiscordSink, LocalSink, TerminalSink};
