/*!
 * Fallback Logger Tests
 * Local-always, remote-when-bound routing
 */

use crate::common::{loaded, recording_logger, MockRuntime};
use adb_bridge::boundary::BoundaryManager;
use adb_bridge::core::LogLevel;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[test]
fn test_absent_sink_still_logs_locally() {
    let boundary = loaded(MockRuntime::without_sink());
    let (logger, recorder) = recording_logger(&boundary);

    logger.log(LogLevel::Error, "ProcessCompat", "spawn failed");

    assert_eq!(
        recorder.records(),
        vec![(LogLevel::Error, "ProcessCompat".to_string(), "spawn failed".to_string())]
    );
}

#[test]
fn test_bound_sink_gets_level_code() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, recorder) = recording_logger(&boundary);

    logger.log(LogLevel::Warn, "AdbBridge", "slow device");

    let sink = runtime.sink.as_ref().unwrap();
    assert_eq!(
        sink.records.lock().clone(),
        vec![("W".to_string(), "AdbBridge".to_string(), "slow device".to_string())]
    );
    assert_eq!(recorder.records().len(), 1);
}

#[test]
fn test_remote_failure_still_logs_locally() {
    let runtime = MockRuntime::new();
    let sink = runtime.sink.clone().unwrap();
    sink.fail.store(true, Ordering::SeqCst);
    let boundary = loaded(runtime.clone());
    let (logger, recorder) = recording_logger(&boundary);

    logger.log(LogLevel::Info, "AdbBridge", "kept");

    assert!(sink.records.lock().is_empty());
    assert_eq!(recorder.records()[0].2, "kept");
}

#[test]
fn test_unloaded_boundary_logs_locally() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, recorder) = recording_logger(&boundary);
    boundary.unload();

    logger.log(LogLevel::Debug, "AdbBridge", "after unload");

    assert!(runtime.sink.as_ref().unwrap().records.lock().is_empty());
    assert_eq!(recorder.records().len(), 1);

    let never_loaded = Arc::new(BoundaryManager::new());
    let (logger, recorder) = recording_logger(&never_loaded);
    logger.log(LogLevel::Verbose, "AdbBridge", "before load");
    assert_eq!(recorder.records().len(), 1);
}

#[test]
fn test_priorities_map_to_codes() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, recorder) = recording_logger(&boundary);

    for priority in [2, 3, 4, 5, 6, 42] {
        logger.log_priority(priority, "T", "m");
    }

    let codes: Vec<String> = runtime
        .sink
        .as_ref()
        .unwrap()
        .records
        .lock()
        .iter()
        .map(|(level, _, _)| level.clone())
        .collect();
    assert_eq!(codes, ["V", "D", "I", "W", "E", "I"]);
    assert_eq!(recorder.records()[5].0, LogLevel::Info);
}

#[test]
fn test_logging_from_new_thread_attaches_it() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, _) = recording_logger(&boundary);
    let before = runtime.attaches.load(Ordering::SeqCst);

    std::thread::spawn(move || {
        logger.log(LogLevel::Info, "T", "one");
        logger.log(LogLevel::Info, "T", "two");
    })
    .join()
    .unwrap();

    assert_eq!(runtime.attaches.load(Ordering::SeqCst), before + 1);
    assert_eq!(runtime.sink.as_ref().unwrap().records.lock().len(), 2);
}

#[test]
fn test_panicking_sink_keeps_local_and_later_remote_writes() {
    let runtime = MockRuntime::new();
    let sink = runtime.sink.clone().unwrap();
    sink.panic_once.store(true, Ordering::SeqCst);
    let boundary = loaded(runtime.clone());
    let (logger, recorder) = recording_logger(&boundary);

    logger.log(LogLevel::Error, "AdbBridge", "first");
    assert_eq!(recorder.records().len(), 1);
    assert!(sink.records.lock().is_empty());

    // Same thread: remote forwarding still works after the panic
    logger.log(LogLevel::Info, "AdbBridge", "second");
    assert_eq!(
        sink.records.lock().clone(),
        vec![("I".to_string(), "AdbBridge".to_string(), "second".to_string())]
    );
    assert_eq!(recorder.records().len(), 2);
}

#[test]
fn test_sink_logging_back_does_not_recurse() {
    let runtime = MockRuntime::new();
    let sink = runtime.sink.clone().unwrap();
    let boundary = loaded(runtime.clone());
    let (logger, recorder) = recording_logger(&boundary);
    assert!(sink.echo.set(logger.clone()).is_ok());

    logger.log(LogLevel::Info, "AdbBridge", "outer");

    // The echo stays local; only the outer record crossed
    assert_eq!(
        sink.records.lock().clone(),
        vec![("I".to_string(), "AdbBridge".to_string(), "outer".to_string())]
    );
    assert_eq!(
        recorder.records(),
        vec![
            (LogLevel::Info, "AdbBridge".to_string(), "outer".to_string()),
            (LogLevel::Debug, "Echo".to_string(), "outer".to_string()),
        ]
    );
}
