/*!
 * Process Types
 * Flags, interrupt signal and per-invocation state for the adapter
 */

use crate::core::types::ExitCode;
use bitflags::bitflags;
use std::os::fd::OwnedFd;
use std::sync::atomic::{AtomicBool, Ordering};

bitflags! {
    /// Which standard streams the caller does not want a descriptor for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProcessFlags: u32 {
        const NO_STDOUT = 1 << 0;
        const NO_STDERR = 1 << 1;
        const NO_STDIN = 1 << 2;
    }
}

/// Descriptors the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipeRequest {
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: bool,
}

impl PipeRequest {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn stdout() -> Self {
        Self {
            stdout: true,
            ..Self::default()
        }
    }
}

/// Cancellation flag checked before a blocking read starts
#[derive(Debug, Default)]
pub struct Interrupt {
    interrupted: AtomicBool,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Where a live invocation is in its lifecycle.
///
/// Rejected requests never get a handle, and cleaned ones are dropped from
/// the table, so only the in-between states are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Spawned,
    Waiting,
    Exited(ExitCode),
    Terminated,
}

/// Result of a successful spawn
#[derive(Debug)]
pub struct SpawnedProcess {
    pub handle: crate::core::types::ProcessHandle,
    /// Placeholder read ends; they only ever yield EOF
    pub stdout: Option<OwnedFd>,
    pub stderr: Option<OwnedFd>,
}
