/*!
 * ADB Bridge Probe
 *
 * Runs `adb <args..>` through the full bridge with the loopback runtime
 * standing in for the host:
 * - validation and handle tracking in the adapter
 * - per-thread attachment in the boundary manager
 * - dual-path logging through the fallback logger
 *
 * Set ADB_BRIDGE_LOOPBACK_PROGRAM to run something other than `adb`.
 */

use adb_bridge::{
    init_tracing, BridgeConfig, FallbackLogger, Interrupt, LogBridge, LoopbackRuntime, PipeRequest,
    ProcessAdapter, ProcessFlags,
};
use log::LevelFilter;
use miette::IntoDiagnostic;
use std::sync::Arc;
use tracing::info;

/// Output beyond this is truncated, like any caller-provided buffer
const OUTPUT_CAPACITY: usize = 64 * 1024;

fn main() -> miette::Result<()> {
    init_tracing();

    let config = BridgeConfig::from_env();
    info!(
        family = %config.command_family,
        program = %config.loopback_program,
        "ADB bridge probe starting"
    );

    let runtime = LoopbackRuntime::new(config.loopback_program.clone())?;
    let boundary = adb_bridge::global();
    boundary.load(Arc::new(runtime), &config)?;

    LogBridge::new(FallbackLogger::new(Arc::clone(boundary)), LevelFilter::Info)
        .install()
        .into_diagnostic()?;

    let adapter = ProcessAdapter::from_config(Arc::clone(boundary), &config);

    let mut argv = vec![adapter.family().to_string()];
    argv.extend(std::env::args().skip(1));

    let spawned = adapter.execute(argv.as_slice(), ProcessFlags::NO_STDERR, PipeRequest::stdout())?;

    let mut buf = vec![0u8; OUTPUT_CAPACITY];
    let read = adapter.read_all_interruptible(&Interrupt::new(), spawned.handle, &mut buf)?;
    print!("{}", String::from_utf8_lossy(&buf[..read]));

    let code = adapter.wait(spawned.handle, true)?;
    info!(handle = %spawned.handle, code, "Probe finished");

    drop(spawned);
    boundary.unload();
    std::process::exit(code);
}
