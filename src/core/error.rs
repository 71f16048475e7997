//! Error types for the unified logger

use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid or missing configuration, fatal at startup
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Local sink could not open or write its file
    #[error("Local sink I/O failure on '{}': {source}", path.display())]
    LocalSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Webhook answered with a non-2xx status
    #[error("Webhook responded with HTTP {status}: {body}")]
    WebhookStatus { status: u16, body: String },

    /// Connection, TLS or protocol failure while posting to the webhook
    #[error("Webhook transport error: {0}")]
    WebhookTransport(String),

    /// A single webhook attempt exceeded its deadline
    #[error("Webhook request timed out after {0:?}")]
    WebhookTimeout(Duration),

    /// Every attempt failed; `last` is the final attempt's error
    #[error("Webhook delivery failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<LoggerError>,
    },

    /// No sink accepted the record while delivery was required
    #[error("No sink delivered the record ({attempted} attempted)")]
    NoDelivery { attempted: usize },

    /// A sink panicked while handling a record
    #[error("Sink '{sink}' panicked: {message}")]
    SinkPanic { sink: String, message: String },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a local sink error for the given path
    pub fn local_sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoggerError::LocalSink {
            path: path.into(),
            source,
        }
    }

    pub fn webhook_status(status: u16, body: impl Into<String>) -> Self {
        LoggerError::WebhookStatus {
            status,
            body: body.into(),
        }
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        LoggerError::WebhookTransport(msg.into())
    }

    pub fn retries_exhausted(attempts: u32, last: LoggerError) -> Self {
        LoggerError::RetriesExhausted {
            attempts,
            last: Box::new(last),
        }
    }

    pub fn sink_panic(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkPanic {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from configuration rather than delivery
    pub fn is_config(&self) -> bool {
        matches!(self, LoggerError::InvalidConfiguration { .. })
    }
}
