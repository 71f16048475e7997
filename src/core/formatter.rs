//! Message pre-processing and per-sink rendering
//!
//! - [`MessageFormatter`]: filter patterns and the global length cap, applied
//!   once per `log` call before any sink sees the message
//! - [`OutputFormat`]: text or JSON lines for file and terminal output
//! - [`WebhookPayload`]: the Discord webhook body
//!
//! Every renderer is a pure function of its inputs.

use super::error::Result;
use super::log_record::LogRecord;
use super::sink::SinkKind;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Discord caps embed descriptions at 4096; the lower default leaves room
/// for metadata fields inside the embed total.
pub const DEFAULT_MAX_EMBED_LENGTH: usize = 1900;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 10_000;

const MAX_EMBED_FIELDS: usize = 25;
const MAX_FIELD_NAME: usize = 256;
const MAX_FIELD_VALUE: usize = 1024;
/// Discord rejects an embed whose title, description and fields exceed this
const MAX_EMBED_TOTAL: usize = 6000;
const ELLIPSIS: &str = "...";

/// Truncate to at most `max` characters, marking the cut with `...`
pub fn truncate_chars(text: &str, max: usize) -> Cow<'_, str> {
    if text.chars().count() <= max {
        return Cow::Borrowed(text);
    }
    if max < ELLIPSIS.len() {
        return Cow::Owned(text.chars().take(max).collect());
    }
    let mut out: String = text.chars().take(max - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Escape line breaks and tabs so one record stays on one line
pub fn escape_line(text: &str) -> Cow<'_, str> {
    if !text.contains(['\n', '\r', '\t']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t"),
    )
}

/// Stage applied to raw messages before a record is built
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    max_message_length: usize,
    filter_patterns: Vec<String>,
}

impl MessageFormatter {
    pub fn new(max_message_length: usize, filter_patterns: &[String]) -> Self {
        Self {
            max_message_length,
            filter_patterns: filter_patterns
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    /// Returns `None` when the message matches a filter pattern
    /// (case-insensitive substring), otherwise the length-capped message.
    pub fn process_message(&self, message: &str) -> Option<String> {
        if !self.filter_patterns.is_empty() {
            let lowered = message.to_lowercase();
            if self.filter_patterns.iter().any(|p| lowered.contains(p.as_str())) {
                return None;
            }
        }
        Some(truncate_chars(message, self.max_message_length).into_owned())
    }

    /// Pretty JSON rendering for structured result data
    pub fn format_data<T: Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Render a record with each sink kind's default settings
    pub fn render(record: &LogRecord, kind: SinkKind) -> String {
        match kind {
            SinkKind::Local | SinkKind::Terminal => {
                OutputFormat::Text.render(record, &TimestampFormat::default())
            }
            SinkKind::Discord => {
                WebhookPayload::from_record(record, "unified_logger", DEFAULT_MAX_EMBED_LENGTH)
                    .to_json()
            }
        }
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_LENGTH, &[])
    }
}

/// Line format for file and terminal output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `2025-01-08T10:30:45.123Z - [4242] - INFO - Request processed | user=7`
    #[default]
    Text,

    /// `{"timestamp":"2025-01-08T10:30:45.123Z","level":"INFO","message":"Request processed"}`
    Json,
}

impl OutputFormat {
    /// Render one line, without the trailing newline
    pub fn render(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Text => Self::format_text(record, timestamp_format),
            OutputFormat::Json => Self::format_json(record, timestamp_format),
        }
    }

    fn format_text(record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        let mut line = format!(
            "{} - [{}] - {} - {}",
            timestamp_format.format(record.timestamp()),
            std::process::id(),
            record.level().to_str(),
            record.message()
        );

        if let Some(metadata) = record.metadata() {
            line.push_str(" | ");
            line.push_str(&metadata.format_fields());
        }

        escape_line(&line).into_owned()
    }

    fn format_json(record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        let mut json_obj = serde_json::Map::new();

        let timestamp = match timestamp_format {
            TimestampFormat::UnixMillis => {
                serde_json::Value::Number(record.timestamp().timestamp_millis().into())
            }
            _ => serde_json::Value::String(timestamp_format.format(record.timestamp())),
        };
        json_obj.insert("timestamp".to_string(), timestamp);
        json_obj.insert(
            "level".to_string(),
            serde_json::Value::String(record.level().to_str().to_string()),
        );
        json_obj.insert(
            "message".to_string(),
            serde_json::Value::String(record.message().to_string()),
        );
        if let Some(metadata) = record.metadata() {
            json_obj.insert("metadata".to_string(), metadata.to_json_value());
        }

        // A map of plain JSON values always serializes.
        serde_json::to_string(&serde_json::Value::Object(json_obj)).unwrap_or_default()
    }
}

/// Body of a Discord webhook execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub username: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl WebhookPayload {
    pub fn from_record(record: &LogRecord, username: &str, max_embed_length: usize) -> Self {
        let fields = record
            .metadata()
            .map(|metadata| {
                metadata
                    .iter()
                    .take(MAX_EMBED_FIELDS)
                    .map(|(name, value)| {
                        let value = value.to_string();
                        EmbedField {
                            name: truncate_chars(name, MAX_FIELD_NAME).into_owned(),
                            value: if value.is_empty() {
                                "-".to_string()
                            } else {
                                truncate_chars(&value, MAX_FIELD_VALUE).into_owned()
                            },
                            inline: true,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let title = format!("{} Log", record.level().to_str());
        let description = truncate_chars(record.message(), max_embed_length).into_owned();
        let used = title.chars().count() + description.chars().count();
        let fields = fit_fields(fields, MAX_EMBED_TOTAL.saturating_sub(used));

        Self {
            username: username.to_string(),
            embeds: vec![Embed {
                title,
                description,
                color: record.level().embed_color(),
                timestamp: Some(
                    record
                        .timestamp()
                        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                ),
                fields,
            }],
        }
    }

    /// Characters Discord counts against the embed total
    pub fn embed_chars(&self) -> usize {
        self.embeds
            .iter()
            .map(|embed| {
                embed.title.chars().count()
                    + embed.description.chars().count()
                    + embed
                        .fields
                        .iter()
                        .map(|f| f.name.chars().count() + f.value.chars().count())
                        .sum::<usize>()
            })
            .sum()
    }

    /// Connectivity probe sent by webhook verification
    pub fn probe(username: &str) -> Self {
        Self {
            username: username.to_string(),
            embeds: vec![Embed {
                title: "Logger Initialization".to_string(),
                description: "Testing webhook connectivity".to_string(),
                color: super::LogLevel::Info.embed_color(),
                timestamp: None,
                fields: Vec::new(),
            }],
        }
    }

    pub fn to_json(&self) -> String {
        // Strings, integers and bools only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Keep fields in order while they fit in `budget` characters
///
/// The first field that overflows keeps its name and a shortened value if
/// room remains; it and everything after it are otherwise dropped.
fn fit_fields(fields: Vec<EmbedField>, mut budget: usize) -> Vec<EmbedField> {
    let mut kept = Vec::with_capacity(fields.len());
    for mut field in fields {
        let name_len = field.name.chars().count();
        let cost = name_len + field.value.chars().count();
        if cost <= budget {
            budget -= cost;
            kept.push(field);
            continue;
        }
        if budget > name_len {
            field.value = truncate_chars(&field.value, budget - name_len).into_owned();
            kept.push(field);
        }
        break;
    }
    kept
}
