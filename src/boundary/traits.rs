/*!
 * Boundary Traits
 * What the bridge needs from the foreign runtime and its remote components
 */

use crate::core::errors::BridgeResult;
use crate::core::types::ExitCode;
use std::ffi::c_void;
use std::sync::Arc;

/// Per-thread handle into the foreign runtime (a `JNIEnv*` under JNI).
///
/// Holds a raw pointer, so it is neither `Send` nor `Sync`: a context is only
/// valid on the thread that obtained it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    raw: *mut c_void,
}

impl ExecutionContext {
    /// Wrap a runtime-provided pointer; `None` for null.
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        (!raw.is_null()).then_some(Self { raw })
    }

    #[inline]
    pub fn as_raw(&self) -> *mut c_void {
        self.raw
    }
}

/// Connection to the runtime on the far side of the boundary
pub trait ForeignRuntime: Send + Sync {
    /// Context already attached to the calling thread, if any.
    fn current_thread_context(&self) -> Option<ExecutionContext>;

    /// Attach the calling thread. The attachment lasts for the thread's life.
    fn attach_current_thread(&self) -> BridgeResult<ExecutionContext>;

    /// Resolve the five process-owner entry points on `class`.
    fn bind_process_owner(
        &self,
        cx: &ExecutionContext,
        class: &str,
    ) -> BridgeResult<Arc<dyn ProcessOwner>>;

    /// Resolve the raw-log entry point on `class`.
    fn bind_log_sink(&self, cx: &ExecutionContext, class: &str) -> BridgeResult<Arc<dyn LogSink>>;
}

/// Remote component that spawns and owns the OS processes.
///
/// Every call blocks the calling thread until the remote side answers.
pub trait ProcessOwner: Send + Sync {
    /// Start a process; the reply is the remote handle or `-1`.
    fn execute(&self, cx: &ExecutionContext, args: &[String]) -> BridgeResult<i32>;

    /// Block until the process exits.
    fn wait(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<ExitCode>;

    /// Captured output, `None` when the process produced nothing.
    fn read_output(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<Option<String>>;

    fn terminate(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<bool>;

    fn cleanup(&self, cx: &ExecutionContext, handle: i32) -> BridgeResult<()>;
}

/// Remote log persistence
pub trait LogSink: Send + Sync {
    fn write_raw_log(
        &self,
        cx: &ExecutionContext,
        level: &str,
        tag: &str,
        message: &str,
    ) -> BridgeResult<()>;
}
