//! # Host logging
//!
//! The library crates only emit records through the [`log`] facade. Binaries
//! pick a backend; this crate provides a minimal one that writes
//!
//! ```text
//! [LEVEL] target: message
//! ```
//!
//! lines to standard error.
//!
//! ## Configuration
//!
//! * The `VZ_LOG` environment variable selects the level for
//!   [`StderrLogger::from_env`] (`off`, `error`, `warn`, `info`, `debug`,
//!   `trace`; case-insensitive). Unset or unparsable values fall back to
//!   `info`.
//! * Disabling the default `enabled` feature turns every record into a no-op.
//!
//! ```rust,no_run
//! use vz_logger::StderrLogger;
//!
//! StderrLogger::from_env().init().expect("logger initialization");
//! log::info!("ready");
//! ```

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::sync::OnceLock;

/// Environment variable holding the log level.
pub const LOG_LEVEL_ENV: &str = "VZ_LOG";

const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Reads the level from [`LOG_LEVEL_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(parse_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref()))
    }

    #[must_use]
    pub const fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// Installs the logger. Call this once during startup.
    ///
    /// # Errors
    /// Fails if a logger was already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

        let max_level = self.max_level;
        let logger = LOGGER.get_or_init(|| self);
        log::set_logger(logger)?;
        log::set_max_level(max_level);
        Ok(())
    }
}

/// Maps a `VZ_LOG` value to a level filter.
fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_LEVEL)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    #[cfg(feature = "enabled")]
    fn log(&self, record: &Record) {
        use std::io::Write;

        if !self.enabled(record.metadata()) {
            return;
        }

        // Best effort; a closed stderr is not worth failing over.
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    #[cfg(not(feature = "enabled"))]
    fn log(&self, _record: &Record) {}

    fn flush(&self) {
        // stderr is unbuffered
    }
}
