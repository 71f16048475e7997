use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use unified_logger::core::config::LoggerConfig;
use unified_logger::{FieldValue, LogLevel, LoggerError, Metadata, SinkKind, UnifiedLogger};

#[derive(Parser, Debug)]
#[command(version, long_version = "")]
#[command(about = "Send one log record to a local file, Discord and/or the terminal.", long_about = None)]
struct Args {
    #[arg(short, long, help = "JSON configuration file. Environment variables override it.")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "LIST",
        help = "Comma-separated sinks to enable: local, discord, terminal."
    )]
    sinks: Option<String>,

    #[arg(long, value_name = "PATH", help = "Path of the local log file.")]
    log_file: Option<PathBuf>,

    #[arg(long, value_name = "URL", help = "Discord webhook URL.")]
    webhook_url: Option<String>,

    #[arg(long, value_name = "LEVEL", help = "Global minimum level.")]
    min_level: Option<LogLevel>,

    #[arg(
        short,
        long = "meta",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Metadata field attached to the record. Repeatable."
    )]
    meta: Vec<(String, String)>,

    #[arg(long, help = "Exit with an error when no sink delivers the record.")]
    require_delivery: bool,

    #[arg(help = "Level of the record: debug, info, warning, error, critical.")]
    level: LogLevel,

    #[arg(help = "Message text.")]
    message: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

impl Args {
    fn load_config(&self) -> unified_logger::Result<LoggerConfig> {
        let mut config = match self.config {
            Some(ref path) => LoggerConfig::from_file(path)?,
            None => LoggerConfig::default(),
        };
        config.apply_env()?;

        if let Some(ref sinks) = self.sinks {
            config.enable_only(&SinkKind::parse_list(sinks)?);
        }
        if let Some(ref path) = self.log_file {
            config.local.path = path.clone();
        }
        if let Some(ref url) = self.webhook_url {
            config.discord.webhook_url = Some(url.clone());
        }
        if let Some(level) = self.min_level {
            config.min_level = level;
        }
        if self.require_delivery {
            config.require_delivery = true;
        }
        Ok(config)
    }

    fn metadata(&self) -> Option<Metadata> {
        if self.meta.is_empty() {
            return None;
        }
        Some(
            self.meta
                .iter()
                .map(|(key, value)| (key.clone(), FieldValue::parse_loose(value)))
                .collect(),
        )
    }
}

async fn run(args: Args) -> unified_logger::Result<()> {
    let config = args.load_config()?;
    let logger = UnifiedLogger::initialize(&config).await?;

    let report = logger
        .log(args.level, args.message.clone(), args.metadata())
        .await?;

    for failure in &report.failed {
        eprintln!("Sink failed: {}", failure);
    }
    // Flush failures are already reported on stderr by the logger.
    let _ = logger.flush().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Err(err) => {
            eprint!("\x1b[31m");
            eprintln!("Error: {}", err);
            if let LoggerError::NoDelivery { .. } = err {
                eprintln!("Every enabled sink failed; see the messages above.");
            }
            eprint!("\x1b[0m");
            ExitCode::from(1)
        }
        Ok(()) => ExitCode::from(0),
    }
}
