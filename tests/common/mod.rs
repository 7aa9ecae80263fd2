/*!
 * Shared test doubles
 * Recording runtime, process owner, log sink and local log
 */

#![allow(dead_code)]

use adb_bridge::boundary::{BoundaryManager, ExecutionContext, ForeignRuntime, LogSink, ProcessOwner};
use adb_bridge::core::{BridgeConfig, BridgeError, BridgeResult, LogLevel};
use adb_bridge::logging::{FallbackLogger, LocalLog};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;

/// One call that reached the remote owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute(Vec<String>),
    Wait(i32),
    ReadOutput(i32),
    Terminate(i32),
    Cleanup(i32),
}

pub struct MockOwner {
    calls: Mutex<Vec<Call>>,
    next_handle: AtomicI32,
    pub exit_code: AtomicI32,
    pub output: Mutex<Option<String>>,
    pub terminate_result: AtomicBool,
    pub refuse_execute: AtomicBool,
    pub fail_wait: AtomicBool,
}

impl Default for MockOwner {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_handle: AtomicI32::new(1),
            exit_code: AtomicI32::new(0),
            output: Mutex::new(None),
            terminate_result: AtomicBool::new(true),
            refuse_execute: AtomicBool::new(false),
            fail_wait: AtomicBool::new(false),
        }
    }
}

impl MockOwner {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn set_output(&self, output: impl Into<String>) {
        *self.output.lock() = Some(output.into());
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl ProcessOwner for MockOwner {
    fn execute(&self, _: &ExecutionContext, args: &[String]) -> BridgeResult<i32> {
        self.record(Call::Execute(args.to_vec()));
        if self.refuse_execute.load(Ordering::SeqCst) {
            return Ok(-1);
        }
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    fn wait(&self, _: &ExecutionContext, handle: i32) -> BridgeResult<i32> {
        self.record(Call::Wait(handle));
        if self.fail_wait.load(Ordering::SeqCst) {
            return Err(BridgeError::remote("waitProcess", "InterruptedException"));
        }
        Ok(self.exit_code.load(Ordering::SeqCst))
    }

    fn read_output(&self, _: &ExecutionContext, handle: i32) -> BridgeResult<Option<String>> {
        self.record(Call::ReadOutput(handle));
        Ok(self.output.lock().clone())
    }

    fn terminate(&self, _: &ExecutionContext, handle: i32) -> BridgeResult<bool> {
        self.record(Call::Terminate(handle));
        Ok(self.terminate_result.load(Ordering::SeqCst))
    }

    fn cleanup(&self, _: &ExecutionContext, handle: i32) -> BridgeResult<()> {
        self.record(Call::Cleanup(handle));
        Ok(())
    }
}

/// Remote sink recording `(level code, tag, message)`
#[derive(Default)]
pub struct MockSink {
    pub records: Mutex<Vec<(String, String, String)>>,
    pub fail: AtomicBool,
    /// Panic on the next write, once
    pub panic_once: AtomicBool,
    /// Logger the sink writes back through on every record
    pub echo: OnceLock<FallbackLogger>,
}

impl LogSink for MockSink {
    fn write_raw_log(&self, _: &ExecutionContext, level: &str, tag: &str, message: &str) -> BridgeResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::remote("writeRawLogJNI", "sink closed"));
        }
        if self.panic_once.swap(false, Ordering::SeqCst) {
            panic!("log sink panicked");
        }
        self.records
            .lock()
            .push((level.to_string(), tag.to_string(), message.to_string()));
        if let Some(logger) = self.echo.get() {
            logger.log(LogLevel::Debug, "Echo", message);
        }
        Ok(())
    }
}

pub struct MockRuntime {
    pub owner: Arc<MockOwner>,
    pub sink: Option<Arc<MockSink>>,
    attached: Mutex<HashSet<ThreadId>>,
    pub attaches: AtomicUsize,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(Some(Arc::new(MockSink::default()))))
    }

    pub fn without_sink() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    fn build(sink: Option<Arc<MockSink>>) -> Self {
        Self {
            owner: Arc::new(MockOwner::default()),
            sink,
            attached: Mutex::new(HashSet::new()),
            attaches: AtomicUsize::new(0),
        }
    }

    fn token() -> Option<ExecutionContext> {
        ExecutionContext::from_raw(NonNull::<c_void>::dangling().as_ptr())
    }
}

impl ForeignRuntime for MockRuntime {
    fn current_thread_context(&self) -> Option<ExecutionContext> {
        if self.attached.lock().contains(&std::thread::current().id()) {
            Self::token()
        } else {
            None
        }
    }

    fn attach_current_thread(&self) -> BridgeResult<ExecutionContext> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        self.attached.lock().insert(std::thread::current().id());
        Self::token().ok_or_else(|| BridgeError::unavailable("null token"))
    }

    fn bind_process_owner(&self, _: &ExecutionContext, _: &str) -> BridgeResult<Arc<dyn ProcessOwner>> {
        Ok(self.owner.clone())
    }

    fn bind_log_sink(&self, _: &ExecutionContext, class: &str) -> BridgeResult<Arc<dyn LogSink>> {
        match &self.sink {
            Some(sink) => Ok(sink.clone()),
            None => Err(BridgeError::resolution(class, "class not found")),
        }
    }
}

/// Local log that keeps every record
#[derive(Default)]
pub struct Recorder {
    records: Mutex<Vec<(LogLevel, String, String)>>,
}

impl Recorder {
    pub fn records(&self) -> Vec<(LogLevel, String, String)> {
        self.records.lock().clone()
    }
}

impl LocalLog for Recorder {
    fn write(&self, level: LogLevel, tag: &str, message: &str) {
        self.records
            .lock()
            .push((level, tag.to_string(), message.to_string()));
    }
}

/// Fresh boundary loaded with `runtime`
pub fn loaded(runtime: Arc<dyn ForeignRuntime>) -> Arc<BoundaryManager> {
    let boundary = Arc::new(BoundaryManager::new());
    boundary
        .load(runtime, &BridgeConfig::default())
        .expect("load mock runtime");
    boundary
}

/// Logger over `boundary` whose local side is recorded
pub fn recording_logger(boundary: &Arc<BoundaryManager>) -> (FallbackLogger, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let logger = FallbackLogger::with_local(Arc::clone(boundary), recorder.clone());
    (logger, recorder)
}
