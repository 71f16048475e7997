//! Logger configuration
//!
//! Loaded from a JSON file, the environment, or built in code. Every field
//! has a default, so `{}` is a valid configuration file (local sink only).

use super::error::{LoggerError, Result};
use super::formatter::{OutputFormat, DEFAULT_MAX_EMBED_LENGTH, DEFAULT_MAX_MESSAGE_LENGTH};
use super::log_level::LogLevel;
use super::sink::SinkKind;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_SINKS: &str = "UNIFIED_LOGGER_SINKS";
pub const ENV_MIN_LEVEL: &str = "UNIFIED_LOGGER_MIN_LEVEL";
pub const ENV_LOG_FILE: &str = "UNIFIED_LOGGER_LOG_FILE";
pub const ENV_DISCORD_WEBHOOK: &str = "UNIFIED_LOGGER_DISCORD_WEBHOOK";
pub const ENV_REQUIRE_DELIVERY: &str = "UNIFIED_LOGGER_REQUIRE_DELIVERY";

const WEBHOOK_PREFIXES: [&str; 2] = [
    "https://discord.com/api/webhooks/",
    "https://discordapp.com/api/webhooks/",
];

/// Whether `url` has the shape of a Discord webhook execution URL
pub fn is_discord_webhook_url(url: &str) -> bool {
    WEBHOOK_PREFIXES
        .iter()
        .any(|prefix| url.len() > prefix.len() && url.starts_with(prefix))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    pub logger_name: String,
    /// Global threshold, checked before any sink
    pub min_level: LogLevel,
    pub max_message_length: usize,
    /// Messages containing any of these (case-insensitive) are suppressed
    pub filter_patterns: Vec<String>,
    /// Fail `log` when sinks were attempted and none delivered
    pub require_delivery: bool,
    pub local: LocalConfig,
    pub discord: DiscordConfig,
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub min_level: LogLevel,
    pub format: OutputFormat,
    pub timestamp_format: TimestampFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub min_level: LogLevel,
    /// Display name on posted messages; falls back to `logger_name`
    pub username: Option<String>,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Upper bound on a server-requested `retry_after`
    pub max_retry_after_ms: u64,
    pub timeout_ms: u64,
    pub max_embed_length: usize,
    /// Probe the webhook once during `UnifiedLogger::initialize`
    pub verify_on_start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerminalConfig {
    pub enabled: bool,
    pub min_level: LogLevel,
    pub colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            logger_name: "unified_logger".to_string(),
            min_level: LogLevel::Info,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            filter_patterns: Vec::new(),
            require_delivery: false,
            local: LocalConfig::default(),
            discord: DiscordConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("logs").join("app.log"),
            min_level: LogLevel::Debug,
            format: OutputFormat::Text,
            timestamp_format: TimestampFormat::Iso8601,
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            min_level: LogLevel::Info,
            username: None,
            max_retries: 3,
            retry_delay_ms: 1_000,
            max_retry_after_ms: 30_000,
            timeout_ms: 5_000,
            max_embed_length: DEFAULT_MAX_EMBED_LENGTH,
            verify_on_start: false,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_level: LogLevel::Warn,
            colors: true,
        }
    }
}

impl DiscordConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_retry_after(&self) -> Duration {
        Duration::from_millis(self.max_retry_after_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LoggerConfig {
    /// Read a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::config("config file", format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&raw)
            .map_err(|e| LoggerError::config("config file", format!("'{}': {}", path.display(), e)))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| LoggerError::config("config", e.to_string()))
    }

    /// Defaults overridden by `UNIFIED_LOGGER_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(sinks) = lookup(ENV_SINKS) {
            self.enable_only(&SinkKind::parse_list(&sinks)?);
        }
        if let Some(level) = lookup(ENV_MIN_LEVEL) {
            self.min_level = level
                .parse::<LogLevel>()
                .map_err(|message| LoggerError::config(ENV_MIN_LEVEL, message))?;
        }
        if let Some(path) = lookup(ENV_LOG_FILE) {
            self.local.path = PathBuf::from(path);
        }
        if let Some(url) = lookup(ENV_DISCORD_WEBHOOK) {
            self.discord.webhook_url = Some(url);
        }
        if let Some(flag) = lookup(ENV_REQUIRE_DELIVERY) {
            self.require_delivery = parse_flag(&flag).ok_or_else(|| {
                LoggerError::config(ENV_REQUIRE_DELIVERY, format!("not a boolean: '{}'", flag))
            })?;
        }
        Ok(())
    }

    /// Enable exactly the given sinks and disable the rest
    pub fn enable_only(&mut self, kinds: &BTreeSet<SinkKind>) {
        self.local.enabled = kinds.contains(&SinkKind::Local);
        self.discord.enabled = kinds.contains(&SinkKind::Discord);
        self.terminal.enabled = kinds.contains(&SinkKind::Terminal);
    }

    /// Enabled sinks in dispatch order
    pub fn enabled_sinks(&self) -> Vec<SinkKind> {
        [
            (SinkKind::Local, self.local.enabled),
            (SinkKind::Discord, self.discord.enabled),
            (SinkKind::Terminal, self.terminal.enabled),
        ]
        .into_iter()
        .filter_map(|(kind, enabled)| enabled.then_some(kind))
        .collect()
    }

    pub fn discord_username(&self) -> &str {
        self.discord
            .username
            .as_deref()
            .unwrap_or(&self.logger_name)
    }

    /// Check the configuration and normalize sink levels
    ///
    /// A terminal threshold below the global one is raised to match it.
    pub fn validate(&mut self) -> Result<()> {
        if self.enabled_sinks().is_empty() {
            return Err(LoggerError::config("sinks", "at least one sink must be enabled"));
        }
        if self.max_message_length == 0 {
            return Err(LoggerError::config("max_message_length", "must be positive"));
        }
        if self.local.enabled && self.local.path.as_os_str().is_empty() {
            return Err(LoggerError::config("local", "enabled without a log file path"));
        }
        if self.discord.enabled {
            match self.discord.webhook_url.as_deref() {
                None | Some("") => {
                    return Err(LoggerError::config("discord", "enabled without a webhook_url"))
                }
                Some(url) if !is_discord_webhook_url(url) => {
                    return Err(LoggerError::config(
                        "discord",
                        format!("'{}' is not a Discord webhook URL", url),
                    ))
                }
                Some(_) => {}
            }
            if !(4..=4096).contains(&self.discord.max_embed_length) {
                return Err(LoggerError::config(
                    "discord",
                    "max_embed_length must be between 4 and 4096",
                ));
            }
            if self.discord.timeout_ms == 0 {
                return Err(LoggerError::config("discord", "timeout_ms must be positive"));
            }
        }
        if self.terminal.enabled && self.terminal.min_level < self.min_level {
            self.terminal.min_level = self.min_level;
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
