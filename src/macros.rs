//! Logging macros with `format!`-style arguments.
//!
//! Each macro expands to the logger's async `log` call, so the result is a
//! future: `.await` it to dispatch.
//!
//! # Examples
//!
//! ```
//! use unified_logger::prelude::*;
//! use unified_logger::info;
//!
//! # tokio_test::block_on(async {
//! let logger = UnifiedLogger::new();
//!
//! let port = 8080;
//! let report = info!(logger, "Server listening on port {}", port).await.unwrap();
//! assert_eq!(report.attempted(), 0);
//! # });
//! ```

/// Log a message at the given level.
///
/// # Examples
///
/// ```
/// # use unified_logger::prelude::*;
/// use unified_logger::log;
/// # tokio_test::block_on(async {
/// # let logger = UnifiedLogger::new();
/// log!(logger, LogLevel::Error, "Error code: {}", 500).await.unwrap();
/// # });
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+), None)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # use unified_logger::prelude::*;
/// use unified_logger::critical;
/// # tokio_test::block_on(async {
/// # let logger = UnifiedLogger::new();
/// critical!(logger, "Replica {} unreachable", "db-2").await.unwrap();
/// # });
/// ```
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}
