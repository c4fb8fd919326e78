// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! # Errno errors
//!
//! This module contains an `Error` and `Result` type for the few system calls the logger makes.
//! The calls follow the usual POSIX convention: a negative return with the reason left in
//! `errno`.  Convert those to a `Result` type where the `Error` condition holds the errno.
//!
//! The description text is a static table rather than `strerror`, which is neither thread safe
//! nor async-signal-safe on every libc.

use core::ffi::c_int;
use core::fmt;

use crate::sys;

/// An errno error.
///
/// Represents the (positive) errno value reported by a failed system call.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error(pub i32);

impl Error {
    /// Capture the calling thread's current errno.
    #[inline]
    pub fn last() -> Error {
        Error(sys::errno())
    }

    /// The raw errno value.
    pub fn errno(self) -> i32 {
        self.0
    }

    /// A short static description, if this errno is one of the well known values.
    pub fn description(self) -> Option<&'static str> {
        let text = match self.0 {
            libc::EPERM => "Operation not permitted",
            libc::ENOENT => "No such file or directory",
            libc::ESRCH => "No such process",
            libc::EINTR => "Interrupted system call",
            libc::EIO => "Input/output error",
            libc::ENXIO => "No such device or address",
            libc::E2BIG => "Argument list too long",
            libc::EBADF => "Bad file descriptor",
            libc::EAGAIN => "Resource temporarily unavailable",
            libc::ENOMEM => "Cannot allocate memory",
            libc::EACCES => "Permission denied",
            libc::EFAULT => "Bad address",
            libc::EBUSY => "Device or resource busy",
            libc::EEXIST => "File exists",
            libc::ENODEV => "No such device",
            libc::ENOTDIR => "Not a directory",
            libc::EISDIR => "Is a directory",
            libc::EINVAL => "Invalid argument",
            libc::ENFILE => "Too many open files in system",
            libc::EMFILE => "Too many open files",
            libc::EFBIG => "File too large",
            libc::ENOSPC => "No space left on device",
            libc::ESPIPE => "Illegal seek",
            libc::EROFS => "Read-only file system",
            libc::EPIPE => "Broken pipe",
            libc::ERANGE => "Numerical result out of range",
            libc::ENAMETOOLONG => "File name too long",
            libc::ELOOP => "Too many levels of symbolic links",
            libc::EOVERFLOW => "Value too large for defined data type",
            libc::EDQUOT => "Disk quota exceeded",
            _ => return None,
        };
        Some(text)
    }
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => f.write_str(text),
            None => write!(f, "errno:{}", self.0),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error(errno:{})", self.0)
    }
}

/// Wraps a value with a possible errno error.
pub type Result<T> = core::result::Result<T, Error>;

/// Map a return result from a system call into a Result.
///
/// Negative return results are considered errors, and pick up the reason from `errno`.
#[inline(always)]
pub fn to_result(code: c_int) -> Result<c_int> {
    if code < 0 {
        Err(Error::last())
    } else {
        Ok(code)
    }
}

/// Map a byte count returned by `read`/`write` style calls.
#[inline(always)]
pub fn to_result_size(count: isize) -> Result<usize> {
    if count < 0 {
        Err(Error::last())
    } else {
        Ok(count as usize)
    }
}
