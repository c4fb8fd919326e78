// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Single-syscall line output.
//!
//! POSIX requires a `write(2)` to a regular file to be atomic with respect to other writers (XSI
//! 2.9.7), and a write of up to `PIPE_BUF` bytes to a pipe as well.  Handing the finished line to
//! exactly one `write` is therefore all the locking concurrent threads need: each line shows up as
//! one contiguous block.  The order of lines from different threads is unspecified.

use core::ffi::c_int;

use crate::classify::Destination;
use crate::error::{to_result_size, Result};

/// A raw file descriptor.
pub type RawFd = c_int;

/// The two descriptors a [`Destination`] maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sink {
    /// Receives [`Destination::PrimaryStream`].
    pub primary: RawFd,
    /// Receives [`Destination::SecondaryStream`].
    pub secondary: RawFd,
}

impl Sink {
    /// Standard output and standard error.
    pub const STANDARD: Sink = Sink {
        primary: libc::STDOUT_FILENO,
        secondary: libc::STDERR_FILENO,
    };

    /// A sink with the given descriptors.
    pub const fn new(primary: RawFd, secondary: RawFd) -> Sink {
        Sink { primary, secondary }
    }

    /// The descriptor for `dest`, or `None` for [`Destination::Drop`].
    pub fn fd(&self, dest: Destination) -> Option<RawFd> {
        match dest {
            Destination::Drop => None,
            Destination::PrimaryStream => Some(self.primary),
            Destination::SecondaryStream => Some(self.secondary),
        }
    }
}

/// Write `line` to `fd` with a single `write` call.
///
/// Returns the number of bytes the kernel accepted.  There is no retry, not even on `EINTR`: a
/// second call could no longer be atomic with the first.
pub fn write_line(fd: RawFd, line: &[u8]) -> Result<usize> {
    // SAFETY: The pointer and length describe `line`.
    let count = unsafe { libc::write(fd, line.as_ptr().cast(), line.len()) };
    to_result_size(count as isize)
}
