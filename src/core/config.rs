/*!
 * Bridge Configuration
 * Command family and host class names, overridable from the environment
 *
 * Precedence: ADB_BRIDGE_* variables, then the JSON file named by
 * ADB_BRIDGE_CONFIG, then built-in defaults.
 */

use super::errors::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub const DEFAULT_COMMAND_FAMILY: &str = "adb";
pub const DEFAULT_OWNER_CLASS: &str = "com/mobile/scrcpy/android/core/adb/AdbBridge";
pub const DEFAULT_LOG_SINK_CLASS: &str = "com/mobile/scrcpy/android/common/LogManager";

/// Bridge configuration
///
/// Environment variables:
/// - ADB_BRIDGE_CONFIG: JSON file with any subset of the fields below
/// - ADB_BRIDGE_COMMAND: recognised argv[0] (default: adb)
/// - ADB_BRIDGE_OWNER_CLASS: host class owning the processes
/// - ADB_BRIDGE_LOG_CLASS: host class receiving raw log lines
/// - ADB_BRIDGE_LOOPBACK_PROGRAM: program the loopback runtime spawns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BridgeConfig {
    pub command_family: String,
    pub owner_class: String,
    pub log_sink_class: String,
    pub loopback_program: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command_family: DEFAULT_COMMAND_FAMILY.to_string(),
            owner_class: DEFAULT_OWNER_CLASS.to_string(),
            log_sink_class: DEFAULT_LOG_SINK_CLASS.to_string(),
            loopback_program: DEFAULT_COMMAND_FAMILY.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = match get("ADB_BRIDGE_CONFIG") {
            Some(path) => Self::from_file(&path).unwrap_or_else(|e| {
                warn!(path = %path, error = %e, "Ignoring bridge config file");
                Self::default()
            }),
            None => Self::default(),
        };

        Self {
            command_family: get("ADB_BRIDGE_COMMAND").unwrap_or(defaults.command_family),
            owner_class: get("ADB_BRIDGE_OWNER_CLASS").unwrap_or(defaults.owner_class),
            log_sink_class: get("ADB_BRIDGE_LOG_CLASS").unwrap_or(defaults.log_sink_class),
            loopback_program: get("ADB_BRIDGE_LOOPBACK_PROGRAM")
                .unwrap_or(defaults.loopback_program),
        }
    }

    pub fn with_loopback_program(mut self, program: impl Into<String>) -> Self {
        self.loopback_program = program.into();
        self
    }
}
