//! Console and file logger.
//!
//! This module implements the [`log`] crate's logging facade, writing log
//! messages to the console (terminal/debug output) and, optionally, to a file
//! such as one on the V5 Brain's SD card.
//!
//! # Usage
//!
//! Initialize the logger once at the start of your program:
//!
//! ```ignore
//! use log::{info, LevelFilter};
//! use odonav::fs::logger;
//!
//! logger::init_with_file(LevelFilter::Debug, "odom.txt").expect("Logger init failed");
//!
//! info!("Program started");
//! ```
//!
//! # Log Output
//!
//! Each log entry includes:
//! - Log level (TRACE, DEBUG, INFO, WARN, ERROR)
//! - Timestamp (time since the logger was initialized)
//! - Target (module path)
//! - Message
//!
//! Example output:
//! ```text
//! INFO [2s 120ms] odonav::motion::pid::movement - turn_to: settled after 64 cycles, error 0.018
//! WARN [2s 135ms] odonav::drivetrain - Motor Command Error: device on port 3 is disconnected
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
    sync::{Mutex, OnceLock},
    time::Instant,
};

use humantime::{format_duration, FormattedDuration};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// A console logger with an optional file copy.
///
/// The file is created/truncated when the logger is initialized.
pub struct OdoLogger {
    start:       Instant,
    /// Buffered file writer for log output.
    ///
    /// `None` when no file was requested or it could not be opened (e.g., no
    /// SD card present).
    file_writer: Mutex<Option<BufWriter<File>>>,
}

impl OdoLogger {
    fn new(path: Option<&Path>) -> Self {
        let file_writer = path.and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .ok()
                .map(BufWriter::new)
        });

        Self {
            start:       Instant::now(),
            file_writer: Mutex::new(file_writer),
        }
    }

    fn uptime(&self) -> FormattedDuration {
        let elapsed = self.start.elapsed();
        // Millisecond resolution keeps lines short.
        format_duration(std::time::Duration::from_millis(elapsed.as_millis() as u64))
    }

    fn format(&self, record: &Record) -> String {
        format!(
            "{} [{}] {} - {}\n",
            record.level(),
            self.uptime(),
            record.target(),
            record.args()
        )
    }
}

impl log::Log for OdoLogger {
    fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= log::max_level() }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_line = self.format(record);

            print!("{}", log_line);

            if let Ok(mut writer_guard) = self.file_writer.lock() {
                if let Some(ref mut writer) = *writer_guard {
                    let _ = writer.write_all(log_line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut writer_guard) = self.file_writer.lock() {
            if let Some(ref mut writer) = *writer_guard {
                let _ = writer.flush();
            }
        }
    }
}

static LOGGER: OnceLock<OdoLogger> = OnceLock::new();

/// Initializes a console-only logger.
///
/// # Arguments
///
/// * `level` - The minimum log level to record. Use [`LevelFilter::Trace`] to
///   see every control cycle or [`LevelFilter::Info`] for one line per
///   movement.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> { install(level, None) }

/// Initializes a logger that also writes to the file at `path`.
///
/// A file that cannot be opened is skipped and logging continues on the
/// console.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init_with_file(level: LevelFilter, path: impl AsRef<Path>) -> Result<(), SetLoggerError> {
    install(level, Some(path.as_ref()))
}

fn install(level: LevelFilter, path: Option<&Path>) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| OdoLogger::new(path));
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

#[cfg(test)]
mod tests {
    use log::{Level, LevelFilter};

    use super::*;

    #[test]
    fn line_has_level_target_and_message() {
        let logger = OdoLogger::new(None);
        let line = logger.format(
            &Record::builder()
                .level(Level::Warn)
                .target("odonav::drivetrain")
                .args(format_args!("Motor Command Error: {}", 3))
                .build(),
        );
        assert!(line.starts_with("WARN ["));
        assert!(line.ends_with("] odonav::drivetrain - Motor Command Error: 3\n"));
    }

    #[test]
    fn writes_to_file() {
        let path = std::env::temp_dir().join(format!("odonav-log-{}.txt", std::process::id()));
        let logger = OdoLogger::new(Some(&path));
        log::set_max_level(LevelFilter::Trace);
        log::Log::log(
            &logger,
            &Record::builder()
                .level(Level::Error)
                .target("test")
                .args(format_args!("written"))
                .build(),
        );
        log::Log::flush(&logger);
        let contents = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(contents.contains("test - written"));
    }

    #[test]
    #[ignore = "installs the global logger"]
    fn log_full_test() {
        init(LevelFilter::Trace).expect("Failed to initialize logger");

        log::trace!("This is a trace message");
        log::info!("This is an info message");
        log::warn!("This is a warning message");

        log::logger().flush();
        assert!(log::logger().enabled(&Metadata::builder().level(Level::Error).target("test").build()));
    }
}
