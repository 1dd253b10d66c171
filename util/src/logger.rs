//! Generic logger utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::{self, info};
use colored::{ColoredString, Colorize};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Logger configuration for one executable.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Level below which records are discarded, must be at least `INFO`.
    pub min_level: LevelFilter,

    /// Per-target overrides of `min_level`, for example to quieten a chatty
    /// thread.
    pub target_levels: Vec<(String, LevelFilter)>,

    /// Prefix removed from the target shown on debug and trace lines, usually
    /// the executable's own library crate.
    pub strip_target_prefix: Option<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LoggerConfig {
    pub fn new(min_level: LevelFilter) -> Self {
        Self {
            min_level,
            target_levels: Vec::new(),
            strip_target_prefix: None,
        }
    }

    /// Override the level of a single target (and its children).
    pub fn with_target_level(mut self, target: &str, level: LevelFilter) -> Self {
        self.target_levels.push((target.to_string(), level));
        self
    }

    /// Shorten targets starting with `prefix` on debug and trace lines.
    pub fn strip_prefix(mut self, prefix: &str) -> Self {
        self.strip_target_prefix = Some(prefix.to_string());
        self
    }

    /// The target as it should appear in the log.
    fn display_target<'a>(&self, target: &'a str) -> &'a str {
        match self.strip_target_prefix {
            Some(ref prefix) => match target.strip_prefix(prefix.as_str()) {
                Some(t) => t.trim_start_matches("::"),
                None => target
            },
            None => target
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `config.min_level` must be greater than `log::Level::Info`.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    config: LoggerConfig,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if config.min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(config.min_level))
    }

    let min_level = config.min_level;
    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new().level(min_level);
    for (target, level) in config.target_levels.iter() {
        dispatch = dispatch.level_for(target.clone(), *level);
    }

    let format_config = config.clone();
    dispatch
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}",
                session::get_elapsed_seconds(),
                level_to_str(record.level()),
                format_body(&format_config, record.level(), record.target(), message)
            ))
        })
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    for (target, level) in config.target_levels.iter() {
        info!("    Log level for {}: {:?}", target, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Message part of a log line. Debug and trace lines are prefixed with their
/// target.
fn format_body(
    config: &LoggerConfig,
    level: log::Level,
    target: &str,
    message: &std::fmt::Arguments
) -> String {
    if level > log::Level::Info {
        format!("{}: {}", config.display_target(target), message)
    }
    else {
        format!("{}", message)
    }
}

/// Get the string representation of a log level
pub(crate) fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_level_tags() {
        colored::control::set_override(false);
        assert_eq!(level_to_str(log::Level::Info).to_string(), "INF");
        assert_eq!(level_to_str(log::Level::Warn).to_string(), "WRN");
        assert_eq!(level_to_str(log::Level::Trace).to_string(), "TRC");
    }

    #[test]
    fn test_display_target() {
        let plain = LoggerConfig::new(LevelFilter::Debug);
        assert_eq!(plain.display_target("auton_lib::telem"), "auton_lib::telem");

        let stripped = LoggerConfig::new(LevelFilter::Debug).strip_prefix("auton_lib");
        assert_eq!(stripped.display_target("auton_lib::telem"), "telem");
        assert_eq!(stripped.display_target("auton_lib"), "");
        assert_eq!(stripped.display_target("util::session"), "util::session");
    }

    #[test]
    fn test_format_body() {
        let config = LoggerConfig::new(LevelFilter::Trace)
            .strip_prefix("auton_lib")
            .with_target_level("auton_lib::telem", LevelFilter::Info);
        assert_eq!(config.target_levels.len(), 1);

        assert_eq!(
            format_body(&config, log::Level::Debug, "auton_lib::dispatch", &format_args!("edge {}", 1)),
            "dispatch: edge 1"
        );
        assert_eq!(
            format_body(&config, log::Level::Info, "auton_lib::dispatch", &format_args!("edge {}", 1)),
            "edge 1"
        );
    }
}
