/*!
 * C Surface
 * `sc_*` process and pipe entry points expected by the native client
 *
 * Every entry point runs against the process-wide boundary, converts errors
 * to the C sentinel of its signature and never lets a panic unwind into the
 * caller.
 */

#![allow(clippy::missing_safety_doc)]

use crate::boundary;
use crate::core::config::BridgeConfig;
use crate::core::types::ProcessHandle;
use crate::process::{Interrupt, PipeRequest, ProcessAdapter, ProcessFlags};
use std::ffi::{c_char, c_int, c_uint, CStr};
use std::os::fd::IntoRawFd;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::error;

static ADAPTER: OnceLock<ProcessAdapter> = OnceLock::new();

/// Adapter behind the C surface, bound to [`boundary::global`]
pub fn adapter() -> &'static ProcessAdapter {
    ADAPTER.get_or_init(|| {
        ProcessAdapter::from_config(Arc::clone(boundary::global()), &BridgeConfig::from_env())
    })
}

/// Mirror of the client's `struct sc_intr`
#[repr(C)]
#[derive(Debug, Default)]
pub struct ScIntr {
    pub interrupted: bool,
}

fn guarded<T>(call: &'static str, sentinel: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error!(call, "Panic caught at C boundary");
            sentinel
        }
    }
}

/// Null-terminated `argv` into owned strings; invalid UTF-8 is replaced.
unsafe fn collect_argv(argv: *const *const c_char) -> Vec<String> {
    let mut args = Vec::new();
    if argv.is_null() {
        return args;
    }
    let mut i = 0;
    loop {
        let arg = *argv.add(i);
        if arg.is_null() {
            break;
        }
        args.push(CStr::from_ptr(arg).to_string_lossy().into_owned());
        i += 1;
    }
    args
}

unsafe fn c_str_or<'a>(ptr: *const c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        fallback.into()
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Start `argv` through the remote owner.
///
/// Returns 0 and fills `pid` on success, -1 otherwise. Non-null `pout` /
/// `perr` receive placeholder descriptors (or -1); `pin` always gets -1.
#[no_mangle]
pub unsafe extern "C" fn sc_process_execute_p(
    argv: *const *const c_char,
    pid: *mut c_int,
    flags: c_uint,
    pin: *mut c_int,
    pout: *mut c_int,
    perr: *mut c_int,
) -> c_int {
    guarded("sc_process_execute_p", -1, || {
        if pid.is_null() {
            error!("sc_process_execute_p: null pid out-pointer");
            return -1;
        }

        let args = collect_argv(argv);
        let pipes = PipeRequest {
            stdin: !pin.is_null(),
            stdout: !pout.is_null(),
            stderr: !perr.is_null(),
        };

        let spawned = match adapter().execute(args.as_slice(), ProcessFlags::from_bits_truncate(flags), pipes) {
            Ok(spawned) => spawned,
            Err(_) => return -1,
        };

        *pid = spawned.handle.get();
        if !pin.is_null() {
            *pin = -1;
        }
        if !pout.is_null() {
            *pout = spawned.stdout.map_or(-1, IntoRawFd::into_raw_fd);
        }
        if !perr.is_null() {
            *perr = spawned.stderr.map_or(-1, IntoRawFd::into_raw_fd);
        }
        0
    })
}

/// Exit code of `pid`, or -1 on any failure
#[no_mangle]
pub extern "C" fn sc_process_wait(pid: c_int, close: bool) -> c_int {
    guarded("sc_process_wait", -1, || {
        let Some(handle) = ProcessHandle::new(pid) else {
            return -1;
        };
        adapter().wait(handle, close).unwrap_or(-1)
    })
}

#[no_mangle]
pub extern "C" fn sc_process_terminate(pid: c_int) -> bool {
    guarded("sc_process_terminate", false, || {
        let Some(handle) = ProcessHandle::new(pid) else {
            return false;
        };
        adapter().terminate(handle).unwrap_or(false)
    })
}

#[no_mangle]
pub extern "C" fn sc_pipe_close(pipe: c_int) {
    guarded("sc_pipe_close", (), || {
        let _ = adapter().close_pipe(pipe);
    })
}

/// Wait for `pid` and copy its captured output into `data`.
///
/// `pipe` is not read; the output comes from the remote owner. Returns the
/// bytes copied (terminator excluded) or -1.
#[no_mangle]
pub unsafe extern "C" fn sc_pipe_read_all_intr(
    intr: *mut ScIntr,
    pid: c_int,
    _pipe: c_int,
    data: *mut c_char,
    len: usize,
) -> isize {
    guarded("sc_pipe_read_all_intr", -1, || {
        let interrupt = Interrupt::new();
        // The flag may be set from another thread.
        if !intr.is_null() && std::ptr::read_volatile(std::ptr::addr_of!((*intr).interrupted)) {
            interrupt.interrupt();
        }

        if data.is_null() && len > 0 {
            return -1;
        }
        let buf: &mut [u8] = if len == 0 {
            &mut []
        } else {
            std::slice::from_raw_parts_mut(data.cast::<u8>(), len)
        };

        let Some(handle) = ProcessHandle::new(pid) else {
            return -1;
        };
        adapter()
            .read_all_interruptible(&interrupt, handle, buf)
            .map_or(-1, |n| n as isize)
    })
}

#[no_mangle]
pub unsafe extern "C" fn sc_pipe_read(pipe: c_int, data: *mut c_char, len: usize) -> isize {
    guarded("sc_pipe_read", -1, || {
        if data.is_null() && len > 0 {
            return -1;
        }
        let buf: &mut [u8] = if len == 0 {
            &mut []
        } else {
            std::slice::from_raw_parts_mut(data.cast::<u8>(), len)
        };
        adapter().pipe_read(pipe, buf).map_or(-1, |n| n as isize)
    })
}

#[no_mangle]
pub unsafe extern "C" fn sc_pipe_write(pipe: c_int, data: *const c_char, len: usize) -> isize {
    guarded("sc_pipe_write", -1, || {
        if data.is_null() && len > 0 {
            return -1;
        }
        let buf: &[u8] = if len == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(data.cast::<u8>(), len)
        };
        adapter().pipe_write(pipe, buf).map_or(-1, |n| n as isize)
    })
}

/// Log one line through the fallback logger. `level` is an Android priority.
#[no_mangle]
pub unsafe extern "C" fn write_log_to_file(level: c_int, tag: *const c_char, message: *const c_char) {
    guarded("write_log_to_file", (), || {
        let tag = c_str_or(tag, "");
        let message = c_str_or(message, "");
        adapter().logger().log_priority(level, &tag, &message);
    })
}
