/*!
 * Process Facade Tests
 * Marshalling, truncation and boundary failures of the five remote calls
 */

use crate::common::{loaded, recording_logger, Call, MockRuntime};
use adb_bridge::core::{BridgeError, CommandRequest, ProcessHandle};
use adb_bridge::process::{copy_terminated, ProcessFacade};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn request(args: &[&str]) -> CommandRequest {
    let argv = std::iter::once("adb").chain(args.iter().copied());
    CommandRequest::new(argv, "adb").unwrap()
}

#[test]
fn test_execute_marshals_arguments_after_command_name() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, _) = recording_logger(&boundary);
    let facade = ProcessFacade::new(logger);

    let handle = facade.execute(&request(&["-s", "emulator-5554", "shell", "id"])).unwrap();

    assert_eq!(handle, 1);
    assert_eq!(
        runtime.owner.calls(),
        vec![Call::Execute(vec![
            "-s".to_string(),
            "emulator-5554".to_string(),
            "shell".to_string(),
            "id".to_string(),
        ])]
    );
}

#[test]
fn test_execute_wait_read_truncates_output() {
    let runtime = MockRuntime::new();
    runtime.owner.set_output("x".repeat(1000));
    runtime.owner.exit_code.store(3, Ordering::SeqCst);
    let boundary = loaded(runtime.clone());
    let (logger, _) = recording_logger(&boundary);
    let facade = ProcessFacade::new(logger);

    let handle = ProcessHandle::new(facade.execute(&request(&["devices"])).unwrap()).unwrap();
    assert_eq!(facade.wait(handle).unwrap(), 3);

    let mut buf = [0xffu8; 10];
    assert_eq!(facade.read_output(handle, &mut buf).unwrap(), 9);
    assert_eq!(&buf[..9], b"xxxxxxxxx");
    assert_eq!(buf[9], 0);
}

#[test]
fn test_read_without_output_is_zero() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, _) = recording_logger(&boundary);
    let facade = ProcessFacade::new(logger);

    let handle = ProcessHandle::new(facade.execute(&request(&[])).unwrap()).unwrap();
    let mut buf = [0xffu8; 4];
    assert_eq!(facade.read_output(handle, &mut buf).unwrap(), 0);
    assert_eq!(buf[0], 0);
}

#[test]
fn test_terminate_and_cleanup_pass_through() {
    let runtime = MockRuntime::new();
    runtime.owner.terminate_result.store(false, Ordering::SeqCst);
    let boundary = loaded(runtime.clone());
    let (logger, _) = recording_logger(&boundary);
    let facade = ProcessFacade::new(logger);

    let handle = ProcessHandle::new(5).unwrap();
    assert!(!facade.terminate(handle).unwrap());
    facade.cleanup(handle).unwrap();

    assert_eq!(runtime.owner.calls(), vec![Call::Terminate(5), Call::Cleanup(5)]);
}

#[test]
fn test_unloaded_boundary_is_unavailable() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, recorder) = recording_logger(&boundary);
    let facade = ProcessFacade::new(logger);
    boundary.unload();

    let err = facade.wait(ProcessHandle::new(1).unwrap()).unwrap_err();
    assert!(matches!(err, BridgeError::BoundaryUnavailable(_)));
    assert_eq!(runtime.owner.call_count(), 0);
    // The failure still reached the local log
    assert!(recorder
        .records()
        .iter()
        .any(|(_, tag, message)| tag == "AdbBridge" && message.contains("no execution context")));
}

#[test]
fn test_each_thread_attaches_once() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let (logger, _) = recording_logger(&boundary);
    let facade = ProcessFacade::new(logger);
    let after_load = runtime.attaches.load(Ordering::SeqCst);

    std::thread::scope(|scope| {
        for _ in 0..2 {
            scope.spawn(|| {
                facade.execute(&request(&["devices"])).unwrap();
                facade.execute(&request(&["devices"])).unwrap();
            });
        }
    });

    assert_eq!(runtime.attaches.load(Ordering::SeqCst), after_load + 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Copied bytes never exceed capacity - 1 and are always terminated
    #[test]
    fn prop_copy_terminated_fits(src in proptest::collection::vec(1u8..=255, 0..256), cap in 1usize..64) {
        let mut dst = vec![0xaau8; cap];
        let n = copy_terminated(&src, &mut dst);

        prop_assert_eq!(n, src.len().min(cap - 1));
        prop_assert_eq!(&dst[..n], &src[..n]);
        prop_assert_eq!(dst[n], 0);
    }
}

#[test]
fn test_facade_shared_across_threads() {
    let runtime = MockRuntime::new();
    let boundary = loaded(runtime.clone());
    let facade = Arc::new(ProcessFacade::new(recording_logger(&boundary).0));

    let worker = Arc::clone(&facade);
    let handle = std::thread::spawn(move || worker.execute(&request(&["version"])).unwrap())
        .join()
        .unwrap();
    assert_eq!(handle, 1);
}
