/*!
 * POSIX-Compatibility Adapter
 * Local-process shaped API on top of the remote process facade
 *
 * The adapter validates requests before anything crosses the boundary and
 * tracks every handle it issued. A handle is dropped from the table before
 * its remote cleanup starts, so no call is ever made for a released handle.
 */

use super::facade::ProcessFacade;
use super::pipe::{self, PipePlaceholder};
use super::types::{Interrupt, InvocationState, PipeRequest, ProcessFlags, SpawnedProcess};
use crate::boundary::BoundaryManager;
use crate::core::config::BridgeConfig;
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::types::{CommandRequest, ExitCode, ProcessHandle, ADAPTER_TAG};
use crate::logging::{bridge_log, FallbackLogger};
use dashmap::DashMap;
use std::os::fd::{OwnedFd, RawFd};
use std::sync::Arc;

/// Process API with local-process semantics backed by the remote owner
pub struct ProcessAdapter {
    facade: ProcessFacade,
    family: String,
    handles: DashMap<ProcessHandle, InvocationState>,
}

impl ProcessAdapter {
    pub fn new(facade: ProcessFacade, family: impl Into<String>) -> Self {
        Self {
            facade,
            family: family.into(),
            handles: DashMap::new(),
        }
    }

    /// Adapter with the default tracing-backed local log
    pub fn from_config(boundary: Arc<BoundaryManager>, config: &BridgeConfig) -> Self {
        let facade = ProcessFacade::new(FallbackLogger::new(boundary));
        Self::new(facade, config.command_family.clone())
    }

    pub fn logger(&self) -> &FallbackLogger {
        self.facade.logger()
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Current lifecycle state, `None` once released or never issued
    pub fn state(&self, handle: ProcessHandle) -> Option<InvocationState> {
        self.handles.get(&handle).map(|entry| *entry)
    }

    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// Validate `argv` and start it through the remote owner.
    ///
    /// Placeholders are created before the remote call and dropped (closed)
    /// if the spawn fails.
    pub fn execute<S: AsRef<str>>(
        &self,
        argv: &[S],
        flags: ProcessFlags,
        pipes: PipeRequest,
    ) -> BridgeResult<SpawnedProcess> {
        let logger = self.logger();
        bridge_log!(logger, Debug, ADAPTER_TAG, "========== execute ==========");
        for (i, arg) in argv.iter().enumerate() {
            bridge_log!(logger, Debug, ADAPTER_TAG, "argv[{}]: {}", i, arg.as_ref());
        }

        let request = CommandRequest::new(argv.iter().map(|arg| arg.as_ref()), &self.family)
            .map_err(|e| {
                bridge_log!(logger, Error, ADAPTER_TAG, "Rejected: {}", e);
                e
            })?;

        let stdout = self.placeholder(pipes.stdout && !flags.contains(ProcessFlags::NO_STDOUT));
        let stderr = self.placeholder(pipes.stderr && !flags.contains(ProcessFlags::NO_STDERR));
        if pipes.stdin && !flags.contains(ProcessFlags::NO_STDIN) {
            bridge_log!(logger, Debug, ADAPTER_TAG, "stdin requested; remote owner has no input channel");
        }

        let raw = self.facade.execute(&request)?;
        let Some(handle) = ProcessHandle::new(raw) else {
            bridge_log!(logger, Error, ADAPTER_TAG, "Failed to execute command (handle {})", raw);
            return Err(BridgeError::SpawnFailed(raw));
        };

        if self.handles.insert(handle, InvocationState::Spawned).is_some() {
            bridge_log!(logger, Warn, ADAPTER_TAG, "Handle {} reissued while still tracked", handle);
        }
        bridge_log!(logger, Debug, ADAPTER_TAG, "Process started with handle {}", handle);

        Ok(SpawnedProcess {
            handle,
            stdout,
            stderr,
        })
    }

    /// Block until the process exits; release it afterwards if `close_after`.
    pub fn wait(&self, handle: ProcessHandle, close_after: bool) -> BridgeResult<ExitCode> {
        bridge_log!(self.logger(), Debug, ADAPTER_TAG, "wait: handle={}, close={}", handle, close_after);
        self.transition(handle, |state| match state {
            InvocationState::Spawned => InvocationState::Waiting,
            other => other,
        })?;

        let result = self.facade.wait(handle);
        if let Ok(code) = result {
            let _ = self.transition(handle, |state| match state {
                InvocationState::Terminated => InvocationState::Terminated,
                _ => InvocationState::Exited(code),
            });
        }

        if close_after {
            self.release(handle);
        }
        result
    }

    /// Ask the remote owner to kill the process; released on success.
    ///
    /// Returns exactly what the remote owner answered.
    pub fn terminate(&self, handle: ProcessHandle) -> BridgeResult<bool> {
        bridge_log!(self.logger(), Debug, ADAPTER_TAG, "terminate: handle={}", handle);
        self.require(handle)?;

        let terminated = self.facade.terminate(handle)?;
        if terminated {
            let _ = self.transition(handle, |_| InvocationState::Terminated);
            self.release(handle);
        }
        Ok(terminated)
    }

    /// Wait for the process and copy its captured output into `buf`.
    ///
    /// The interrupt is checked once, before anything blocks.
    pub fn read_all_interruptible(
        &self,
        intr: &Interrupt,
        handle: ProcessHandle,
        buf: &mut [u8],
    ) -> BridgeResult<usize> {
        bridge_log!(
            self.logger(),
            Debug,
            ADAPTER_TAG,
            "read_all_interruptible: handle={}, len={}",
            handle,
            buf.len()
        );
        if intr.is_interrupted() {
            bridge_log!(self.logger(), Debug, ADAPTER_TAG, "Operation interrupted");
            return Err(BridgeError::Interrupted);
        }

        self.wait(handle, false)?;
        let read = self.facade.read_output(handle, buf)?;

        bridge_log!(self.logger(), Debug, ADAPTER_TAG, "Read {} bytes from handle {}", read, handle);
        Ok(read)
    }

    pub fn close_pipe(&self, fd: RawFd) -> BridgeResult<()> {
        pipe::close(fd)
    }

    pub fn pipe_read(&self, fd: RawFd, buf: &mut [u8]) -> BridgeResult<usize> {
        pipe::read(fd, buf)
    }

    pub fn pipe_write(&self, fd: RawFd, buf: &[u8]) -> BridgeResult<usize> {
        pipe::write(fd, buf)
    }

    fn placeholder(&self, wanted: bool) -> Option<OwnedFd> {
        if !wanted {
            return None;
        }
        match PipePlaceholder::new() {
            Ok(placeholder) => Some(placeholder.into_fd()),
            Err(e) => {
                bridge_log!(self.logger(), Warn, ADAPTER_TAG, "Placeholder pipe unavailable: {}", e);
                None
            }
        }
    }

    fn require(&self, handle: ProcessHandle) -> BridgeResult<()> {
        if self.handles.contains_key(&handle) {
            Ok(())
        } else {
            bridge_log!(self.logger(), Error, ADAPTER_TAG, "Unknown handle {}", handle);
            Err(BridgeError::UnknownHandle(handle))
        }
    }

    fn transition(
        &self,
        handle: ProcessHandle,
        next: impl FnOnce(InvocationState) -> InvocationState,
    ) -> BridgeResult<()> {
        match self.handles.get_mut(&handle) {
            Some(mut state) => {
                *state = next(*state);
                Ok(())
            }
            None => {
                bridge_log!(self.logger(), Error, ADAPTER_TAG, "Unknown handle {}", handle);
                Err(BridgeError::UnknownHandle(handle))
            }
        }
    }

    /// Forget the handle, then clean it up remotely. Only the caller that
    /// removed the entry reaches the remote side.
    fn release(&self, handle: ProcessHandle) {
        if self.handles.remove(&handle).is_none() {
            return;
        }
        if let Err(e) = self.facade.cleanup(handle) {
            bridge_log!(self.logger(), Warn, ADAPTER_TAG, "cleanup of {} failed: {}", handle, e);
        }
    }
}
