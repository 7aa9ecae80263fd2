/*!
 * Loopback Runtime
 * In-process stand-in for the remote side: owns real OS processes
 *
 * Lets the bridge run end to end on a desktop host without a JVM. The
 * "remote" process owner spawns the configured program locally and keeps
 * the children in a table keyed by monotonically increasing handles.
 */

use super::traits::{ExecutionContext, ForeignRuntime, LogSink, ProcessOwner};
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::types::ExitCode;
use dashmap::DashMap;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::ffi::c_void;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often a waiter polls its child once stdout is drained
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A process started by the loopback owner
#[derive(Debug)]
struct OwnedProcess {
    os_pid: u32,
    /// Never locked across a blocking call, so terminate can always reach it
    child: Arc<Mutex<Child>>,
    exit_code: Option<ExitCode>,
    output: Option<String>,
}

/// Spawns `program` with the marshalled arguments
pub struct LoopbackOwner {
    program: String,
    processes: DashMap<i32, OwnedProcess>,
    next_handle: AtomicI32,
}

impl LoopbackOwner {
    pub fn new(program: impl Into<String>) -> BridgeResult<Self> {
        let program = program.into();
        validate_program(&program)?;
        info!("Loopback owner initialized for '{}'", program);
        Ok(Self {
            program,
            processes: DashMap::new(),
            next_handle: AtomicI32::new(1),
        })
    }

    /// Number of handles not yet cleaned up
    pub fn count(&self) -> usize {
        self.processes.len()
    }

    /// Drain stdout, then poll until the child has exited.
    ///
    /// The status is cached inside `Child`, so a later `kill` on the same
    /// child is a no-op rather than a signal to a recycled PID.
    fn reap(handle: i32, child: &Mutex<Child>) -> BridgeResult<(ExitCode, Option<String>)> {
        let mut stdout = child.lock().stdout.take().ok_or_else(|| {
            BridgeError::remote("waitProcess", format!("process {} is already being waited", handle))
        })?;

        let mut captured = Vec::new();
        if let Err(e) = stdout.read_to_end(&mut captured) {
            warn!("Failed to read output of process {}: {}", handle, e);
        }

        let status = loop {
            match child.lock().try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(REAP_POLL_INTERVAL),
                Err(e) => {
                    error!("Failed to wait for process {}: {}", handle, e);
                    return Err(BridgeError::remote("waitProcess", e));
                }
            }
        };

        let code = exit_code(status);
        let output = (!captured.is_empty()).then(|| String::from_utf8_lossy(&captured).into_owned());
        info!("Process {} exited with code {}", handle, code);
        Ok((code, output))
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    status.code().unwrap_or(-1)
}

impl ProcessOwner for LoopbackOwner {
    fn execute(&self, _cx: &ExecutionContext, args: &[String]) -> BridgeResult<i32> {
        let child = match Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn '{}': {}", self.program, e);
                return Ok(-1);
            }
        };

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let os_pid = child.id();
        info!(
            "Spawned '{}' (handle: {}, OS PID: {})",
            self.program, handle, os_pid
        );

        self.processes.insert(
            handle,
            OwnedProcess {
                os_pid,
                child: Arc::new(Mutex::new(child)),
                exit_code: None,
                output: None,
            },
        );
        Ok(handle)
    }

    fn wait(&self, _cx: &ExecutionContext, handle: i32) -> BridgeResult<ExitCode> {
        // Released before reaping so the shard is not locked while it runs
        let child = {
            let entry = self.processes.get(&handle).ok_or_else(|| {
                BridgeError::remote("waitProcess", format!("no process {}", handle))
            })?;
            if let Some(code) = entry.exit_code {
                return Ok(code);
            }
            Arc::clone(&entry.child)
        };

        let (code, output) = Self::reap(handle, &child)?;

        if let Some(mut entry) = self.processes.get_mut(&handle) {
            entry.exit_code = Some(code);
            entry.output = output;
        }
        Ok(code)
    }

    fn read_output(&self, _cx: &ExecutionContext, handle: i32) -> BridgeResult<Option<String>> {
        Ok(self
            .processes
            .get(&handle)
            .and_then(|entry| entry.output.clone()))
    }

    fn terminate(&self, _cx: &ExecutionContext, handle: i32) -> BridgeResult<bool> {
        let (child, os_pid) = {
            let Some(entry) = self.processes.get(&handle) else {
                return Ok(false);
            };
            if entry.exit_code.is_some() {
                return Ok(false);
            }
            (Arc::clone(&entry.child), entry.os_pid)
        };

        let mut child = child.lock();
        match child.try_wait() {
            // Exited already, possibly reaped by a concurrent wait
            Ok(Some(_)) => return Ok(false),
            Ok(None) => {}
            Err(e) => {
                error!("Failed to query process {}: {}", handle, e);
                return Ok(false);
            }
        }

        match child.kill() {
            Ok(()) => {
                info!("Killed process {} (OS PID: {})", handle, os_pid);
                Ok(true)
            }
            Err(e) => {
                error!("Failed to kill process {}: {}", handle, e);
                Ok(false)
            }
        }
    }

    fn cleanup(&self, _cx: &ExecutionContext, handle: i32) -> BridgeResult<()> {
        if let Some((_, process)) = self.processes.remove(&handle) {
            let mut child = process.child.lock();
            if matches!(child.try_wait(), Ok(None)) {
                // Cleanup without a prior wait: do not leave a zombie behind
                let _ = child.kill();
                let _ = child.wait();
            }
        }
        Ok(())
    }
}

/// Emits remote log lines as trace events under `adb_bridge::remote`
pub struct LoopbackLogSink;

impl LogSink for LoopbackLogSink {
    fn write_raw_log(
        &self,
        _cx: &ExecutionContext,
        level: &str,
        tag: &str,
        message: &str,
    ) -> BridgeResult<()> {
        tracing::trace!(target: "adb_bridge::remote", remote_level = level, tag = tag, "{}", message);
        Ok(())
    }
}

/// Runtime whose "remote" side lives in this process
pub struct LoopbackRuntime {
    owner: Arc<LoopbackOwner>,
}

impl LoopbackRuntime {
    pub fn new(program: impl Into<String>) -> BridgeResult<Self> {
        Ok(Self {
            owner: Arc::new(LoopbackOwner::new(program)?),
        })
    }

    pub fn owner(&self) -> &Arc<LoopbackOwner> {
        &self.owner
    }
}

impl ForeignRuntime for LoopbackRuntime {
    fn current_thread_context(&self) -> Option<ExecutionContext> {
        // No real attachment: every thread shares the same dangling token
        ExecutionContext::from_raw(NonNull::<c_void>::dangling().as_ptr())
    }

    fn attach_current_thread(&self) -> BridgeResult<ExecutionContext> {
        self.current_thread_context()
            .ok_or_else(|| BridgeError::unavailable("loopback context"))
    }

    fn bind_process_owner(
        &self,
        _cx: &ExecutionContext,
        _class: &str,
    ) -> BridgeResult<Arc<dyn ProcessOwner>> {
        Ok(self.owner.clone())
    }

    fn bind_log_sink(&self, _cx: &ExecutionContext, _class: &str) -> BridgeResult<Arc<dyn LogSink>> {
        Ok(Arc::new(LoopbackLogSink))
    }
}

/// Reject program names that could smuggle a shell or escape a directory
fn validate_program(program: &str) -> BridgeResult<()> {
    if program.trim().is_empty() {
        return Err(BridgeError::InvalidCommand("empty program".to_string()));
    }

    let dangerous_chars = [';', '|', '&', '\n', '\r', '\0', '`', '$', '(', ')'];
    if dangerous_chars.iter().any(|&c| program.contains(c)) {
        return Err(BridgeError::InvalidCommand(
            "program contains dangerous characters".to_string(),
        ));
    }

    if program.contains("..") {
        return Err(BridgeError::InvalidCommand(
            "program contains path traversal".to_string(),
        ));
    }

    Ok(())
}
