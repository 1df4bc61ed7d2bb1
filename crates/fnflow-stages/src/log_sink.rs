//! Log handlers selected by name at configuration time.
use chrono::{SecondsFormat, Utc};
use fnflow_core::{StepError, StepResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(StepError::invalid_input(format!("unknown log level: {}", s))),
        }
    }
}

/// Where a log line goes. Every sink formats the line its own way and
/// forwards it to `tracing` under the `fnflow::log` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    Console,
    File,
    Api,
}

impl LogSink {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::File => "file",
            Self::Api => "api",
        }
    }

    /// `production` logs to the API, anything else to the console.
    pub fn for_environment(environment: &str) -> Self {
        if environment.eq_ignore_ascii_case("production") {
            Self::Api
        } else {
            Self::Console
        }
    }

    /// Formats `message` for this sink, emits it and returns the line.
    pub fn emit(&self, level: Level, message: &str) -> String {
        let tag = level.as_str().to_uppercase();
        let line = match self {
            Self::Console => format!(
                "[{}] {} - {}",
                tag,
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                message
            ),
            Self::File => format!("[FILE LOG] [{}] {}", tag, message),
            Self::Api => format!("[SEND TO API] [{}] {}", tag, message),
        };

        let sink = self.as_str();
        match level {
            Level::Debug => tracing::debug!(target: "fnflow::log", sink, "{}", line),
            Level::Info => tracing::info!(target: "fnflow::log", sink, "{}", line),
            Level::Warn => tracing::warn!(target: "fnflow::log", sink, "{}", line),
            Level::Error => tracing::error!(target: "fnflow::log", sink, "{}", line),
        }
        line
    }

    /// Parses the level name first, so a typo fails before anything is logged.
    pub fn emit_named(&self, level: &str, message: &str) -> StepResult<String> {
        let level = level.parse::<Level>()?;
        Ok(self.emit(level, message))
    }
}

impl fmt::Display for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogSink {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "file" => Ok(Self::File),
            "api" => Ok(Self::Api),
            _ => Err(StepError::invalid_input(format!(
                "log handler {:?} not found",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_formats() {
        let line = LogSink::File.emit(Level::Warn, "Disk space is low!");
        assert_eq!(line, "[FILE LOG] [WARN] Disk space is low!");

        let line = LogSink::Api.emit(Level::Error, "Database connection failed.");
        assert_eq!(line, "[SEND TO API] [ERROR] Database connection failed.");

        let line = LogSink::Console.emit(Level::Info, "User logged in successfully.");
        assert!(line.starts_with("[INFO] "));
        assert!(line.ends_with(" - User logged in successfully."));
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!("file".parse::<LogSink>(), Ok(LogSink::File));
        assert!("syslog".parse::<LogSink>().is_err());
        assert_eq!(LogSink::for_environment("PRODUCTION"), LogSink::Api);
        assert_eq!(LogSink::for_environment("dev"), LogSink::Console);
    }

    #[test]
    fn test_emit_named_rejects_unknown_level() {
        assert!(LogSink::Api.emit_named("loud", "x").is_err());
        assert_eq!(
            LogSink::Api.emit_named("warning", "x"),
            Ok("[SEND TO API] [WARN] x".to_string())
        );
    }
}
