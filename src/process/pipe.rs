/*!
 * Placeholder Pipes
 * Local descriptors for callers that expect a pollable process stream
 *
 * The remote owner captures the real output; these pipes never carry any.
 * The write end is closed at creation so a reader sees EOF instead of
 * blocking forever.
 */

use crate::core::errors::{BridgeError, BridgeResult};
use nix::unistd;
use std::os::fd::{BorrowedFd, OwnedFd, RawFd};

/// Read end of a pipe whose write end is already closed
#[derive(Debug)]
pub struct PipePlaceholder {
    read: OwnedFd,
}

impl PipePlaceholder {
    pub fn new() -> BridgeResult<Self> {
        let (read, write) = unistd::pipe()?;
        drop(write);
        Ok(Self { read })
    }

    pub fn into_fd(self) -> OwnedFd {
        self.read
    }
}

/// Close a descriptor handed out earlier; negative descriptors are ignored.
pub fn close(fd: RawFd) -> BridgeResult<()> {
    if fd < 0 {
        return Ok(());
    }
    unistd::close(fd)?;
    Ok(())
}

pub fn read(fd: RawFd, buf: &mut [u8]) -> BridgeResult<usize> {
    if fd < 0 {
        return Err(BridgeError::Pipe(format!("invalid descriptor {}", fd)));
    }
    Ok(unistd::read(fd, buf)?)
}

pub fn write(fd: RawFd, buf: &[u8]) -> BridgeResult<usize> {
    if fd < 0 {
        return Err(BridgeError::Pipe(format!("invalid descriptor {}", fd)));
    }
    // SAFETY: the descriptor is only borrowed for the duration of the call;
    // a closed or foreign fd surfaces as EBADF rather than UB.
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    Ok(unistd::write(fd, buf)?)
}
