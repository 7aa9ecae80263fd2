/*!
 * Loopback End-to-End Tests
 * Full adapter -> facade -> boundary path against real local processes
 */

use adb_bridge::boundary::{BoundaryManager, LoopbackRuntime};
use adb_bridge::core::{BridgeConfig, BridgeError};
use adb_bridge::process::{Interrupt, PipeRequest, ProcessAdapter, ProcessFlags};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn adapter_for(program: &str) -> (Arc<BoundaryManager>, ProcessAdapter) {
    let config = BridgeConfig::default().with_loopback_program(program);
    let boundary = Arc::new(BoundaryManager::new());
    boundary
        .load(Arc::new(LoopbackRuntime::new(config.loopback_program.clone()).unwrap()), &config)
        .unwrap();
    let adapter = ProcessAdapter::from_config(Arc::clone(&boundary), &config);
    (boundary, adapter)
}

#[test]
fn test_echo_through_the_bridge() {
    let (_boundary, adapter) = adapter_for("echo");

    let spawned = adapter
        .execute(&["adb", "hello", "world"], ProcessFlags::empty(), PipeRequest::stdout())
        .unwrap();

    let mut buf = [0u8; 64];
    let read = adapter
        .read_all_interruptible(&Interrupt::new(), spawned.handle, &mut buf)
        .unwrap();
    assert_eq!(&buf[..read], b"hello world\n");
    assert_eq!(buf[read], 0);

    assert_eq!(adapter.wait(spawned.handle, true).unwrap(), 0);
    assert_eq!(adapter.live_handles(), 0);
}

#[test]
fn test_exit_code_is_delivered() {
    let (_boundary, adapter) = adapter_for("false");

    let handle = adapter
        .execute(&["adb"], ProcessFlags::empty(), PipeRequest::none())
        .unwrap()
        .handle;
    assert_eq!(adapter.wait(handle, true).unwrap(), 1);
}

#[test]
fn test_terminate_long_running_process() {
    let (_boundary, adapter) = adapter_for("sleep");

    let handle = adapter
        .execute(&["adb", "30"], ProcessFlags::empty(), PipeRequest::none())
        .unwrap()
        .handle;

    assert!(adapter.terminate(handle).unwrap());
    assert_eq!(adapter.live_handles(), 0);
    assert!(matches!(adapter.wait(handle, false), Err(BridgeError::UnknownHandle(_))));
}

#[test]
fn test_missing_program_fails_spawn() {
    let (_boundary, adapter) = adapter_for("adb-bridge-definitely-missing");

    let err = adapter
        .execute(&["adb", "devices"], ProcessFlags::empty(), PipeRequest::stdout())
        .unwrap_err();
    assert!(matches!(err, BridgeError::SpawnFailed(-1)));
}
