/*!
 * Boundary Module
 * Foreign runtime bindings, per-thread attachment and runtime backends
 */

#[cfg(feature = "jni")]
pub mod jvm;
pub mod loopback;
pub mod manager;
pub mod traits;

// Re-export for convenience
pub use loopback::{LoopbackOwner, LoopbackRuntime};
pub use manager::{global, BoundContext, BoundaryManager, Bindings, LogRoute};
pub use traits::{ExecutionContext, ForeignRuntime, LogSink, ProcessOwner};
