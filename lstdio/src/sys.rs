// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! lstdio 'sys' module.
//!
//! Thin wrappers around the handful of libc calls the logger relies on.  Everything here is
//! async-signal-safe, with the exception of [`getenv`], which is only used during startup.

use core::ffi::{c_int, CStr};

use crate::error::{to_result, Error, Result};

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))] {
        #[inline(always)]
        fn errno_location() -> *mut c_int {
            unsafe { libc::__errno_location() }
        }
    } else if #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))] {
        #[inline(always)]
        fn errno_location() -> *mut c_int {
            unsafe { libc::__error() }
        }
    } else if #[cfg(any(target_os = "openbsd", target_os = "netbsd"))] {
        #[inline(always)]
        fn errno_location() -> *mut c_int {
            unsafe { libc::__errno() }
        }
    } else {
        compile_error!("lstdio does not know where errno lives on this target");
    }
}

/// The calling thread's errno.
#[inline]
pub fn errno() -> i32 {
    // SAFETY: The location is thread local and always valid for the calling thread.
    unsafe { *errno_location() }
}

/// Overwrite the calling thread's errno.
#[inline]
pub fn set_errno(value: i32) {
    // SAFETY: As above.
    unsafe {
        *errno_location() = value;
    }
}

/// Current wall clock time, in seconds since the Unix epoch.
///
/// `time(2)` is on the POSIX list of async-signal-safe functions.  Returns `None` if the clock
/// could not be read.
pub fn now() -> Option<i64> {
    let raw = unsafe { libc::time(core::ptr::null_mut()) };
    if raw == -1 {
        None
    } else {
        Some(raw as i64)
    }
}

extern "C" {
    #[link_name = "tzset"]
    fn c_tzset();
}

/// Reload the C library's timezone data from `TZ` and the system configuration.
///
/// Not async-signal-safe.
pub fn tzset() {
    // SAFETY: tzset takes no arguments and only updates libc's own timezone state.
    unsafe { c_tzset() }
}

/// Run a syscall-shaped operation until it stops failing with `EINTR`.
///
/// Any other failure is returned to the caller, who decides how to report it.
pub fn retry_eintr<F>(mut op: F) -> Result<c_int>
where
    F: FnMut() -> c_int,
{
    loop {
        match to_result(op()) {
            Err(Error(libc::EINTR)) => continue,
            ret => return ret,
        }
    }
}

/// Abnormal process termination.
///
/// Raises `SIGABRT` without running any unwinding, destructors, or atexit handlers.
#[inline(always)]
pub fn abort() -> ! {
    unsafe { libc::abort() }
}

/// Look up an environment variable.
///
/// Not safe against concurrent `setenv`; startup only.
pub fn getenv(name: &CStr) -> Option<&'static CStr> {
    let value = unsafe { libc::getenv(name.as_ptr()) };
    if value.is_null() {
        None
    } else {
        // SAFETY: getenv returns a NUL terminated string owned by the environment, which lives
        // until it is modified.
        Some(unsafe { CStr::from_ptr(value) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tzset_then_localtime() {
        tzset();
        tzset();
        let now = now().unwrap() as libc::time_t;
        let mut tm: libc::tm = unsafe { core::mem::zeroed() };
        assert!(!unsafe { libc::localtime_r(&now, &mut tm) }.is_null());
        assert!((0..=23).contains(&tm.tm_hour));
    }

    #[test]
    fn errno_round_trips() {
        set_errno(libc::ENOSPC);
        assert_eq!(errno(), libc::ENOSPC);
        set_errno(0);
        assert_eq!(errno(), 0);
    }

    #[test]
    fn retry_gives_up_only_on_other_errors() {
        let mut calls = 0;
        let ret = retry_eintr(|| {
            calls += 1;
            if calls < 3 {
                set_errno(libc::EINTR);
                -1
            } else {
                7
            }
        });
        assert_eq!(ret, Ok(7));
        assert_eq!(calls, 3);

        let mut calls = 0;
        let ret = retry_eintr(|| {
            calls += 1;
            set_errno(libc::EBADF);
            -1
        });
        assert_eq!(ret, Err(Error(libc::EBADF)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn clock_is_past_2020() {
        assert!(now().unwrap() > 1_577_836_800);
    }
}
