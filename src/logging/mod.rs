/*!
 * Logging Module
 * Fallback logger, `log` facade bridge and local tracing setup
 */

pub mod bridge;
pub mod fallback;
pub mod tracer;

pub(crate) use fallback::bridge_log;

// Re-export for convenience
pub use bridge::LogBridge;
pub use fallback::{FallbackLogger, LocalLog, TracingLog};
pub use tracer::init_tracing;
