// gom/src/logging/logging.rs
use std::collections::VecDeque;
use std::io::{Result, Write};
use std::cell::RefCell;
use flexi_logger::*;
use log::{Level, Record};
use crate::storage::gom_config::{log_dir, GomConfig};

/// How many messages the per-thread status buffer keeps.
pub const RECENT_LOG_CAPACITY: usize = 64;

/// One message as seen by the status buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub channel: String,
    pub level: Level,
    pub message: String,
}

thread_local! {
    // Most recent messages, oldest first.
    static RECENT_LOGS: RefCell<VecDeque<LogRecord>> = RefCell::new(VecDeque::new());
}

/// Helper macro that sends a message to the `log` facade on a channel
/// and keeps it in the status buffer.
#[macro_export]
macro_rules! gom_log {
    ($lvl:expr, $channel:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log::log!(target: $channel, $lvl, "{}", message);
        $crate::logging::logging::push_recent_log($channel, $lvl, message);
    }};
}

/// Logs an error on a channel.
#[macro_export]
macro_rules! gom_err   { ($channel:expr, $($arg:tt)*) => { $crate::gom_log!($crate::log::Level::Error, $channel, $($arg)*) }; }

/// Logs a warning on a channel.
#[macro_export]
macro_rules! gom_warn  { ($channel:expr, $($arg:tt)*) => { $crate::gom_log!($crate::log::Level::Warn,  $channel, $($arg)*) }; }

/// Logs an informative message on a channel.
#[macro_export]
macro_rules! gom_info  { ($channel:expr, $($arg:tt)*) => { $crate::gom_log!($crate::log::Level::Info,  $channel, $($arg)*) }; }

/// Logs a debug message on a channel.
#[macro_export]
macro_rules! gom_debug { ($channel:expr, $($arg:tt)*) => { $crate::gom_log!($crate::log::Level::Debug, $channel, $($arg)*) }; }

#[doc(hidden)]
pub fn push_recent_log(channel: &str, level: Level, message: String) {
    RECENT_LOGS.with(|logs| {
        let mut logs = logs.borrow_mut();
        if logs.len() == RECENT_LOG_CAPACITY {
            logs.pop_front();
        }
        logs.push_back(LogRecord { channel: channel.to_string(), level, message });
    });
}

/// The last message logged on this thread, if any.
pub fn last_log() -> Option<LogRecord> {
    RECENT_LOGS.with(|logs| logs.borrow().back().cloned())
}

/// All buffered messages logged on this thread, oldest first.
pub fn recent_logs() -> Vec<LogRecord> {
    RECENT_LOGS.with(|logs| logs.borrow().iter().cloned().collect())
}

/// Empties the status buffer of this thread.
pub fn clear_recent_logs() {
    RECENT_LOGS.with(|logs| logs.borrow_mut().clear());
}

/// Initializes the system logger from the config. The returned handle
/// must be kept alive for as long as messages should be written.
pub fn init_logger(config: &GomConfig) -> std::result::Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_str(&config.log_level)?.format(gom_formatter);

    let handle = if config.log_to_file {
        let log_dir = log_dir(config);
        let file_spec = FileSpec::default()
            .directory(&log_dir)
            .basename("gom")
            .suffix("log");

        let handle = logger
            .log_to_file(file_spec)
            .duplicate_to_stderr(Duplicate::Warn)
            .rotate(
                Criterion::Size(5_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(5),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .start()?;
        crate::gom_info!("GOM", "Log dir: {}.", log_dir.display());
        handle
    } else {
        logger.log_to_stderr().start()?
    };

    Ok(handle)
}

fn gom_formatter(
    write: &mut dyn Write,
    now: &mut DeferredNow,
    record: &Record
) -> Result<()> {
    write!(
        write,
        "{} {:5} [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.target(),
        &record.args()
    )
}
