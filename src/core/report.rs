//! Aggregate outcome of one dispatch

use super::error::LoggerError;
use super::sink::SinkKind;
use std::fmt;
use std::sync::Arc;

/// One sink's failed delivery attempt
#[derive(Debug, Clone)]
pub struct SinkFailure {
    pub sink: String,
    pub kind: SinkKind,
    pub error: String,
}

impl SinkFailure {
    pub fn new(sink: impl Into<String>, kind: SinkKind, error: &LoggerError) -> Self {
        Self {
            sink: sink.into(),
            kind,
            error: error.to_string(),
        }
    }
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.sink, self.kind, self.error)
    }
}

/// Callback invoked for every sink failure
pub type FailureCallback = Arc<dyn Fn(&SinkFailure) + Send + Sync>;

/// Which sinks delivered, failed, or were skipped for a single record
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Dropped before dispatch by the global level or a filter pattern
    pub suppressed: bool,
    pub delivered: Vec<String>,
    pub failed: Vec<SinkFailure>,
    /// Sinks whose level filter rejected the record
    pub skipped: Vec<String>,
}

impl DispatchReport {
    pub(crate) fn suppressed() -> Self {
        Self {
            suppressed: true,
            ..Self::default()
        }
    }

    /// Number of sinks `emit` was called on
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn any_delivered(&self) -> bool {
        !self.delivered.is_empty()
    }

    pub fn delivered_to(&self, sink: &str) -> bool {
        self.delivered.iter().any(|name| name == sink)
    }

    pub fn failed_on(&self, sink: &str) -> bool {
        self.failed.iter().any(|failure| failure.sink == sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = DispatchReport::default();
        report.delivered.push("local".to_string());
        report.failed.push(SinkFailure::new(
            "discord",
            SinkKind::Discord,
            &LoggerError::webhook_status(500, "oops"),
        ));
        report.skipped.push("terminal".to_string());

        assert_eq!(report.attempted(), 2);
        assert!(!report.is_success());
        assert!(report.delivered_to("local"));
        assert!(report.failed_on("discord"));
        assert!(!report.failed_on("terminal"));
    }

    #[test]
    fn test_failure_display() {
        let failure = SinkFailure::new(
            "discord",
            SinkKind::Discord,
            &LoggerError::transport("connection refused"),
        );
        assert_eq!(
            failure.to_string(),
            "discord (discord): Webhook transport error: connection refused"
        );
    }
}
