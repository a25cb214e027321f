//! Named-pipe REPL input (spec.md §4.3 `Fifo`, §6 "External Interfaces")
//!
//! A single fixed-path FIFO (`input-fifo` by default), opened non-blocking
//! so a read with nothing waiting returns `Ok(None)` instead of stalling the
//! poll loop, mirroring the original's `open(..., O_NONBLOCK)` plus
//! `EAGAIN`-as-"nothing yet" handling.

use std::os::fd::OwnedFd;

use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;

use crate::error::Error;

const FIFO_NAME: &str = "input-fifo";

/// Creates (if needed) and opens the fifo for non-blocking reads.
pub fn open() -> Result<OwnedFd, Error> {
    match unistd::mkfifo(FIFO_NAME, Mode::from_bits_truncate(0o666)) {
        Ok(()) => {}
        Err(Errno::EEXIST) => {}
        Err(e) => return Err(e.into()),
    }
    let fd = fcntl::open(FIFO_NAME, OFlag::O_RDONLY | OFlag::O_NONBLOCK, Mode::empty())?;
    Ok(fd)
}

pub fn close_and_unlink(fd: OwnedFd) -> Result<(), Error> {
    unistd::close(fd)?;
    match unistd::unlink(FIFO_NAME) {
        Ok(()) | Err(Errno::ENOENT) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Reads one line's worth of bytes without blocking. `Ok(None)` means no
/// data is currently available (`EAGAIN`), not end-of-input — the writer end
/// of a fifo can always reopen later. `capacity` bounds the read buffer
/// (spec.md §6: default 64; a command spanning more bytes is truncated, a
/// known limitation rather than a recovered error).
pub fn read_command(fd: &OwnedFd, capacity: usize) -> Result<Option<String>, Error> {
    let mut buf = vec![0u8; capacity];
    match unistd::read(fd, &mut buf) {
        Ok(0) => Ok(None),
        Ok(n) => {
            let text = String::from_utf8_lossy(&buf[..n]);
            let line = text.trim();
            if line.is_empty() {
                Ok(None)
            } else {
                Ok(Some(line.to_string()))
            }
        }
        Err(Errno::EAGAIN) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
