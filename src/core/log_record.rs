//! Log record structure

use super::log_level::LogLevel;
use super::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single log event, immutable once built.
///
/// Every sink receives the same `&LogRecord`; none of them can change it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self::at(Utc::now(), level, message, None)
    }

    /// Build a record with an explicit timestamp
    pub fn at(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            // An empty mapping carries no information; keep one representation.
            metadata: metadata.filter(|m| !m.is_empty()),
        }
    }

    #[must_use]
    pub fn with_metadata(self, metadata: Metadata) -> Self {
        Self::at(self.timestamp, self.level, self.message, Some(metadata))
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}
