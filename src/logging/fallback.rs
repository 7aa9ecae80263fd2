/*!
 * Fallback Logger
 * Dual-path logging that works before load, after unload, and in between
 *
 * Every record goes to the local log. When a remote sink was resolved at
 * load time and the calling thread can be attached, the record is also
 * forwarded across the boundary.
 */

use crate::boundary::BoundaryManager;
use crate::core::types::LogLevel;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

thread_local! {
    static IN_REMOTE_WRITE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the calling thread as inside a remote write until dropped
struct RemoteWriteGuard;

impl RemoteWriteGuard {
    /// `None` if this thread is already writing remotely
    fn enter() -> Option<Self> {
        IN_REMOTE_WRITE.with(|flag| (!flag.replace(true)).then_some(Self))
    }
}

impl Drop for RemoteWriteGuard {
    fn drop(&mut self) {
        IN_REMOTE_WRITE.with(|flag| flag.set(false));
    }
}

/// Local (in-process) log destination
pub trait LocalLog: Send + Sync {
    fn write(&self, level: LogLevel, tag: &str, message: &str);
}

/// Local log backed by `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LocalLog for TracingLog {
    fn write(&self, level: LogLevel, tag: &str, message: &str) {
        match level {
            LogLevel::Verbose => trace!(target: "adb_bridge::native", tag = tag, "{}", message),
            LogLevel::Debug => debug!(target: "adb_bridge::native", tag = tag, "{}", message),
            LogLevel::Info => info!(target: "adb_bridge::native", tag = tag, "{}", message),
            LogLevel::Warn => warn!(target: "adb_bridge::native", tag = tag, "{}", message),
            LogLevel::Error => error!(target: "adb_bridge::native", tag = tag, "{}", message),
        }
    }
}

/// Logger shared by the facade, the adapter and the C surface
#[derive(Clone)]
pub struct FallbackLogger {
    boundary: Arc<BoundaryManager>,
    local: Arc<dyn LocalLog>,
}

impl FallbackLogger {
    pub fn new(boundary: Arc<BoundaryManager>) -> Self {
        Self::with_local(boundary, Arc::new(TracingLog))
    }

    pub fn with_local(boundary: Arc<BoundaryManager>, local: Arc<dyn LocalLog>) -> Self {
        Self { boundary, local }
    }

    pub fn boundary(&self) -> &Arc<BoundaryManager> {
        &self.boundary
    }

    /// Write one record. Never blocks on a missing runtime and never fails.
    pub fn log(&self, level: LogLevel, tag: &str, message: &str) {
        self.local.write(level, tag, message);
        self.write_remote(level, tag, message);
    }

    /// Same as [`log`](Self::log) for a raw Android priority; unknown
    /// priorities are logged as INFO.
    pub fn log_priority(&self, priority: i32, tag: &str, message: &str) {
        let level = LogLevel::from_priority(priority).unwrap_or(LogLevel::Info);
        self.log(level, tag, message);
    }

    /// Returns whether the record reached the remote sink.
    fn write_remote(&self, level: LogLevel, tag: &str, message: &str) -> bool {
        // Sink missing (not loaded, or unresolved at load): local only.
        let has_sink = self
            .boundary
            .bindings()
            .is_some_and(|bindings| bindings.log_sink().is_some());
        if !has_sink || IN_REMOTE_WRITE.with(Cell::get) {
            return false;
        }

        let Ok(bound) = self.boundary.acquire_context() else {
            return false;
        };
        let Some(sink) = bound.log_sink() else {
            return false;
        };

        let Some(_guard) = RemoteWriteGuard::enter() else {
            return false;
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sink.write_raw_log(bound.context(), level.code(), tag, message)
        }));

        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Remote log write failed");
                false
            }
            Err(_) => {
                warn!("Remote log sink panicked");
                false
            }
        }
    }
}

/// Format and send a record through a [`FallbackLogger`]
macro_rules! bridge_log {
    ($logger:expr, $level:ident, $tag:expr, $($arg:tt)+) => {
        $logger.log(
            $crate::core::types::LogLevel::$level,
            $tag,
            &format!($($arg)+),
        )
    };
}

pub(crate) use bridge_log;
