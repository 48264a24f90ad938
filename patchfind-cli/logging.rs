use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Log to stderr at the level from `RUST_LOG`, or `base_level` when unset.
/// Keep the returned handle alive for as long as logging is needed.
pub fn setup_logging(base_level: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(base_level)?
        .log_to_stderr()
        .format(flexi_logger::detailed_format)
        .start()
}
