/*!
 * ADB Bridge Library
 * POSIX-style process control delegated to a process owner in a foreign runtime
 */

pub mod boundary;
pub mod core;
pub mod ffi;
pub mod logging;
pub mod process;

// Re-exports
pub use boundary::{
    global, BoundaryManager, ExecutionContext, ForeignRuntime, LogSink, LoopbackRuntime, ProcessOwner,
};
pub use crate::core::{BridgeConfig, BridgeError, BridgeResult, CommandRequest, ExitCode, LogLevel, ProcessHandle};
pub use logging::{init_tracing, FallbackLogger, LogBridge};
pub use process::{Interrupt, PipeRequest, ProcessAdapter, ProcessFacade, ProcessFlags, SpawnedProcess};
