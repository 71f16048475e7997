//! Local file sink

use crate::core::config::LocalConfig;
use crate::core::{
    LogLevel, LogRecord, LoggerError, OutputFormat, Result, Sink, SinkKind, TimestampFormat,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends one line per record to a file
///
/// Lines are written whole under a mutex, and under an advisory exclusive
/// lock on the file when the `file-lock` feature is on, so concurrent
/// writers never interleave. The buffer is flushed after every record.
pub struct LocalSink {
    name: String,
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    min_level: LogLevel,
    format: OutputFormat,
    timestamp_format: TimestampFormat,
}

impl LocalSink {
    /// Open `path` for appending, creating it and its parent directories
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LoggerError::local_sink(&path, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoggerError::local_sink(&path, e))?;

        Ok(Self {
            name: SinkKind::Local.as_str().to_string(),
            path,
            writer: Mutex::new(BufWriter::new(file)),
            min_level: LogLevel::Debug,
            format: OutputFormat::Text,
            timestamp_format: TimestampFormat::default(),
        })
    }

    pub fn from_config(config: &LocalConfig) -> Result<Self> {
        Ok(Self::new(&config.path)?
            .with_min_level(config.min_level)
            .with_format(config.format)
            .with_timestamp_format(config.timestamp_format.clone()))
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Set the line format
    ///
    /// # Example
    ///
    /// ```no_run
    /// use unified_logger::sinks::LocalSink;
    /// use unified_logger::OutputFormat;
    ///
    /// let sink = LocalSink::new("logs/app.jsonl")
    ///     .unwrap()
    ///     .with_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock();

        #[cfg(feature = "file-lock")]
        fs2::FileExt::lock_exclusive(writer.get_ref())
            .map_err(|e| LoggerError::local_sink(&self.path, e))?;

        let written = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"));
        // Flush even after a failed write so a partial line is not left buffered.
        let flushed = writer.flush();

        #[cfg(feature = "file-lock")]
        let _ = fs2::FileExt::unlock(writer.get_ref());

        written
            .and(flushed)
            .map_err(|e| LoggerError::local_sink(&self.path, e))
    }
}

#[async_trait]
impl Sink for LocalSink {
    async fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.format.render(record, &self.timestamp_format);
        self.write_line(&line)
    }

    async fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| LoggerError::local_sink(&self.path, e))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Local
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

impl Drop for LocalSink {
    fn drop(&mut self) {
        let _ = self.writer.get_mut().flush();
    }
}
