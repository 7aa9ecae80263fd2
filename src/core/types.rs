/*!
 * Core Types
 * Handles, command requests and log levels shared across the bridge
 */

use super::errors::{BridgeError, BridgeResult};
use std::fmt;

/// Exit code reported by the remote process owner
pub type ExitCode = i32;

/// Log tag used by the process control facade
pub const FACADE_TAG: &str = "AdbBridge";

/// Log tag used by the POSIX-compatibility adapter
pub const ADAPTER_TAG: &str = "ProcessCompat";

/// Opaque handle for a process owned by the remote side.
///
/// Always positive. The remote owner may reuse a value once the previous
/// holder has been cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessHandle(i32);

impl ProcessHandle {
    /// Wrap a raw value returned across the boundary; `None` unless positive.
    pub fn new(raw: i32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    #[inline]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated argv for the recognised command family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    argv: Vec<String>,
}

impl CommandRequest {
    /// Accepts `argv` only if its first element equals `family`.
    pub fn new<I, S>(argv: I, family: &str) -> BridgeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();

        match argv.first() {
            None => Err(BridgeError::InvalidCommand("empty argv".to_string())),
            Some(program) if program.is_empty() => {
                Err(BridgeError::InvalidCommand("empty command name".to_string()))
            }
            Some(program) if program != family => Err(BridgeError::InvalidCommand(format!(
                "'{}' is not '{}'",
                program, family
            ))),
            Some(_) => Ok(Self { argv }),
        }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Everything after the command name; this is what crosses the boundary.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Map an Android log priority (`ANDROID_LOG_VERBOSE` = 2 ..
    /// `ANDROID_LOG_ERROR` = 6).
    pub fn from_priority(priority: i32) -> Option<Self> {
        match priority {
            2 => Some(LogLevel::Verbose),
            3 => Some(LogLevel::Debug),
            4 => Some(LogLevel::Info),
            5 => Some(LogLevel::Warn),
            6 => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn priority(self) -> i32 {
        match self {
            LogLevel::Verbose => 2,
            LogLevel::Debug => 3,
            LogLevel::Info => 4,
            LogLevel::Warn => 5,
            LogLevel::Error => 6,
        }
    }

    /// Single-character code understood by the remote log sink
    pub fn code(self) -> &'static str {
        match self {
            LogLevel::Verbose => "V",
            LogLevel::Debug => "D",
            LogLevel::Info => "I",
            LogLevel::Warn => "W",
            LogLevel::Error => "E",
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => LogLevel::Verbose,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Info => LogLevel::Info,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Error => LogLevel::Error,
        }
    }
}
