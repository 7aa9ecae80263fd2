/*!
 * Error Types
 * Bridge error taxonomy with thiserror and miette diagnostics
 */

use super::types::ProcessHandle;
use miette::Diagnostic;
use thiserror::Error;

/// Bridge operation result
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised inside the bridge.
///
/// None of these cross the C surface: `ffi` turns every variant into the
/// sentinel the POSIX-shaped caller expects.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum BridgeError {
    #[error("Boundary unavailable: {0}")]
    #[diagnostic(
        code(boundary::unavailable),
        help("The foreign runtime is not loaded, was unloaded, or refused to attach this thread.")
    )]
    BoundaryUnavailable(String),

    #[error("Boundary already loaded")]
    #[diagnostic(
        code(boundary::already_loaded),
        help("Unload the current runtime before loading another one.")
    )]
    AlreadyLoaded,

    #[error("Failed to resolve {entry}: {reason}")]
    #[diagnostic(
        code(boundary::resolution_failed),
        help("Check the class name and method signatures exported by the host runtime.")
    )]
    ResolutionFailed { entry: String, reason: String },

    #[error("Remote call {call} raised: {reason}")]
    #[diagnostic(code(boundary::remote_fault))]
    RemoteFault { call: &'static str, reason: String },

    #[error("Invalid command: {0}")]
    #[diagnostic(
        code(process::invalid_command),
        help("Only the configured command family is accepted as argv[0].")
    )]
    InvalidCommand(String),

    #[error("Spawn failed: remote owner returned handle {0}")]
    #[diagnostic(code(process::spawn_failed))]
    SpawnFailed(i32),

    #[error("Operation interrupted")]
    #[diagnostic(code(process::interrupted))]
    Interrupted,

    #[error("Unknown or released process handle: {0}")]
    #[diagnostic(
        code(process::unknown_handle),
        help("The handle was never issued by this adapter or has already been cleaned up.")
    )]
    UnknownHandle(ProcessHandle),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("ADB_BRIDGE_CONFIG must point to a JSON object with bridge settings.")
    )]
    Config(String),

    #[error("Pipe error: {0}")]
    #[diagnostic(code(process::pipe))]
    Pipe(String),
}

impl BridgeError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        BridgeError::BoundaryUnavailable(reason.into())
    }

    pub fn resolution(entry: impl Into<String>, reason: impl ToString) -> Self {
        BridgeError::ResolutionFailed {
            entry: entry.into(),
            reason: reason.to_string(),
        }
    }

    pub fn remote(call: &'static str, reason: impl ToString) -> Self {
        BridgeError::RemoteFault {
            call,
            reason: reason.to_string(),
        }
    }
}

impl From<nix::Error> for BridgeError {
    fn from(err: nix::Error) -> Self {
        BridgeError::Pipe(err.desc().to_string())
    }
}
