/*!
 * Log Facade Bridge
 * Routes `log` crate records through the fallback logger
 */

use super::fallback::FallbackLogger;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log::Log` implementation that forwards to a [`FallbackLogger`].
///
/// The record target becomes the tag.
pub struct LogBridge {
    logger: FallbackLogger,
    max_level: LevelFilter,
}

impl LogBridge {
    pub fn new(logger: FallbackLogger, max_level: LevelFilter) -> Self {
        Self { logger, max_level }
    }

    /// Install as the process-wide `log` logger.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.logger.log(
            record.level().into(),
            record.target(),
            &record.args().to_string(),
        );
    }

    fn flush(&self) {}
}
