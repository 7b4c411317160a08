//! Filesystem utilities.
//!
//! # Logging
//!
//! The `logger` submodule provides a logger that prints to the console and
//! can copy every line to a file, such as `log.txt` on the V5 Brain's SD card.
//! This is useful for debugging issues that only occur on the robot.
//!
//! # Example
//!
//! ```ignore
//! use log::{info, LevelFilter};
//! use odonav::fs::logger;
//!
//! // Initialize the logger at program start
//! logger::init_with_file(LevelFilter::Debug, "log.txt").expect("Failed to initialize logger");
//!
//! // Now you can use standard logging macros
//! info!("Robot initialized successfully");
//! ```

/// Console and file logging.
pub mod logger;
