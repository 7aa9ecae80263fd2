/*!
 * Process Module
 * Remote process facade and the POSIX-shaped adapter over it
 */

pub mod adapter;
pub mod facade;
pub mod pipe;
pub mod types;

// Re-export for convenience
pub use adapter::ProcessAdapter;
pub use facade::{copy_terminated, ProcessFacade};
pub use pipe::PipePlaceholder;
pub use types::{Interrupt, InvocationState, PipeRequest, ProcessFlags, SpawnedProcess};
