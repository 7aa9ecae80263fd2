/*!
 * Process Control Facade
 * The five remote process operations, marshalled across the boundary
 *
 * Every operation acquires the calling thread's context first and blocks
 * until the remote owner answers. `wait` has no timeout.
 */

use crate::boundary::{BoundContext, BoundaryManager};
use crate::core::errors::BridgeResult;
use crate::core::types::{CommandRequest, ExitCode, ProcessHandle, FACADE_TAG};
use crate::logging::{bridge_log, FallbackLogger};
use std::sync::Arc;
use tracing::instrument;

/// Copy `src` into `dst`, truncating to `dst.len() - 1` bytes and writing a
/// zero terminator right after the copied bytes. Returns the bytes copied.
pub fn copy_terminated(src: &[u8], dst: &mut [u8]) -> usize {
    let Some(max) = dst.len().checked_sub(1) else {
        return 0;
    };
    let n = src.len().min(max);
    dst[..n].copy_from_slice(&src[..n]);
    dst[n] = 0;
    n
}

/// Synchronous RPC-style access to the remote process owner
#[derive(Clone)]
pub struct ProcessFacade {
    boundary: Arc<BoundaryManager>,
    logger: FallbackLogger,
}

impl ProcessFacade {
    pub fn new(logger: FallbackLogger) -> Self {
        Self {
            boundary: Arc::clone(logger.boundary()),
            logger,
        }
    }

    pub fn logger(&self) -> &FallbackLogger {
        &self.logger
    }

    fn bind(&self, call: &str) -> BridgeResult<BoundContext> {
        self.boundary.acquire_context().map_err(|e| {
            bridge_log!(self.logger, Error, FACADE_TAG, "{}: no execution context: {}", call, e);
            e
        })
    }

    /// Marshal everything after the command name and start the process.
    ///
    /// Returns the remote owner's raw reply, which may be `-1`.
    #[instrument(level = "debug", skip_all, fields(argc = request.args().len()))]
    pub fn execute(&self, request: &CommandRequest) -> BridgeResult<i32> {
        bridge_log!(self.logger, Debug, FACADE_TAG, "execute: argc {}", request.args().len());
        for (i, arg) in request.args().iter().enumerate() {
            bridge_log!(self.logger, Debug, FACADE_TAG, "arg[{}]: {}", i, arg);
        }

        let bound = self.bind("execute")?;
        let handle = bound
            .owner()
            .execute(bound.context(), request.args())
            .map_err(|e| {
                bridge_log!(self.logger, Error, FACADE_TAG, "execute failed: {}", e);
                e
            })?;

        bridge_log!(self.logger, Debug, FACADE_TAG, "Process started with handle {}", handle);
        Ok(handle)
    }

    /// Block until the remote process exits.
    #[instrument(level = "debug", skip_all, fields(handle = handle.get()))]
    pub fn wait(&self, handle: ProcessHandle) -> BridgeResult<ExitCode> {
        bridge_log!(self.logger, Debug, FACADE_TAG, "wait: {}", handle);

        let bound = self.bind("wait")?;
        let code = bound
            .owner()
            .wait(bound.context(), handle.get())
            .map_err(|e| {
                bridge_log!(self.logger, Error, FACADE_TAG, "wait on {} failed: {}", handle, e);
                e
            })?;

        bridge_log!(self.logger, Debug, FACADE_TAG, "Process {} exited with code: {}", handle, code);
        Ok(code)
    }

    /// Copy the captured output into `buf` (see [`copy_terminated`]).
    ///
    /// No output is `Ok(0)`, not an error.
    #[instrument(level = "debug", skip_all, fields(handle = handle.get(), capacity = buf.len()))]
    pub fn read_output(&self, handle: ProcessHandle, buf: &mut [u8]) -> BridgeResult<usize> {
        bridge_log!(self.logger, Debug, FACADE_TAG, "read_output: {}", handle);

        let bound = self.bind("read_output")?;
        let output = bound
            .owner()
            .read_output(bound.context(), handle.get())
            .map_err(|e| {
                bridge_log!(self.logger, Error, FACADE_TAG, "read_output on {} failed: {}", handle, e);
                e
            })?;

        let Some(output) = output else {
            bridge_log!(self.logger, Debug, FACADE_TAG, "No output for {}", handle);
            copy_terminated(&[], buf);
            return Ok(0);
        };

        let copied = copy_terminated(output.as_bytes(), buf);
        bridge_log!(self.logger, Debug, FACADE_TAG, "Read {} bytes from {}", copied, handle);
        Ok(copied)
    }

    #[instrument(level = "debug", skip_all, fields(handle = handle.get()))]
    pub fn terminate(&self, handle: ProcessHandle) -> BridgeResult<bool> {
        bridge_log!(self.logger, Debug, FACADE_TAG, "terminate: {}", handle);

        let bound = self.bind("terminate")?;
        bound
            .owner()
            .terminate(bound.context(), handle.get())
            .map_err(|e| {
                bridge_log!(self.logger, Error, FACADE_TAG, "terminate on {} failed: {}", handle, e);
                e
            })
    }

    /// Release the remote resources; best effort.
    #[instrument(level = "debug", skip_all, fields(handle = handle.get()))]
    pub fn cleanup(&self, handle: ProcessHandle) -> BridgeResult<()> {
        bridge_log!(self.logger, Debug, FACADE_TAG, "cleanup: {}", handle);

        let bound = self.bind("cleanup")?;
        bound
            .owner()
            .cleanup(bound.context(), handle.get())
            .map_err(|e| {
                bridge_log!(self.logger, Warn, FACADE_TAG, "cleanup on {} failed: {}", handle, e);
                e
            })
    }
}
