// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Process startup.
//!
//! These run once, early, before other threads or signal handlers are installed.  Unlike the rest
//! of the crate they are not async-signal-safe: the timezone lookup takes libc locks and the
//! environment is read without synchronization.
//!
//! None of this can fail the host process.  Problems are logged through the engine itself and
//! startup carries on in a degraded mode.

use core::ffi::{c_uint, CStr};

use crate::compose::Engine;
use crate::config::DEFAULT_LEVEL;
use crate::level::Severity;
use crate::sys;
use crate::writer::RawFd;

/// Environment variable holding the initial threshold (`N`, `E`, `W`, `I` or `D`).
pub const LOG_LEVEL_VAR: &CStr = c"LOG_LEVEL";

const DEV_NULL: &CStr = c"/dev/null";

/// Run a syscall, retrying on `EINTR`.  Other failures are reported and yield `None`.
macro_rules! check {
    ($engine:expr, $what:literal, $call:expr) => {
        match sys::retry_eintr(|| unsafe { $call }) {
            Ok(value) => Some(value),
            Err(err) => {
                sys::set_errno(err.0);
                let _ = $engine.dlperror(file!(), line!(), $what);
                None
            }
        }
    };
}

/// Descriptors replaced by [`Engine::redirect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdioFds {
    /// Pointed at `/dev/null`.
    pub stdin: RawFd,
    /// Pointed at the log file.
    pub stdout: RawFd,
    /// Pointed at the log file.
    pub stderr: RawFd,
}

impl StdioFds {
    /// The process's standard streams.
    pub const STANDARD: StdioFds = StdioFds {
        stdin: libc::STDIN_FILENO,
        stdout: libc::STDOUT_FILENO,
        stderr: libc::STDERR_FILENO,
    };

    fn contains(&self, fd: RawFd) -> bool {
        fd == self.stdin || fd == self.stdout || fd == self.stderr
    }
}

impl Engine {
    /// Refresh the timezone, then take the threshold from `LOG_LEVEL` if it is set.
    pub fn setup(&self) {
        self.update_timezone();
        if let Some(value) = sys::getenv(LOG_LEVEL_VAR) {
            self.apply_level(value.to_bytes());
        }
    }

    /// Recompute the cached UTC offset.
    pub fn update_timezone(&self) {
        if let Err(err) = self.timezone().refresh() {
            sys::set_errno(err.0);
            let _ = self.dlperror(file!(), line!(), "localtime");
        }
    }

    /// Set the threshold from a `LOG_LEVEL` style value.
    ///
    /// An unknown value selects the default, with a warning.  Returns the level now in effect.
    pub fn apply_level(&self, value: &[u8]) -> Severity {
        match self.filter().set_from_str(value) {
            Ok(level) => level,
            Err(_) => {
                let _ = self.lprintf(
                    "[WARNING]: ",
                    format_args!(
                        "[WARNING]: Unknown LOG_LEVEL value. Using the default value: {}.\n",
                        DEFAULT_LEVEL
                    ),
                );
                DEFAULT_LEVEL
            }
        }
    }

    /// Point `targets.stdin` at `/dev/null` and `targets.stdout`/`targets.stderr` at `path`,
    /// opened for appending (and created with mode 0600).
    ///
    /// If the file can't be opened the outputs go to `/dev/null` instead, after two warnings.
    pub fn redirect(&self, path: &CStr, targets: StdioFds) {
        let flags = libc::O_CREAT | libc::O_RDWR | libc::O_APPEND | libc::O_CLOEXEC;
        let opened =
            sys::retry_eintr(|| unsafe { libc::open(path.as_ptr(), flags, 0o600 as c_uint) });
        let null_fd = check!(
            self,
            "open",
            libc::open(DEV_NULL.as_ptr(), libc::O_RDWR | libc::O_CLOEXEC)
        );

        let log_fd = match opened {
            Ok(fd) => Some(fd),
            Err(err) => {
                sys::set_errno(err.0);
                let _ = self.dlperror(file!(), line!(), "open");
                let name = path.to_str().unwrap_or("<non UTF-8 path>");
                let _ = self.lprintf(
                    "[WARNING]: ",
                    format_args!("[WARNING]: Cannot open {}\n", name),
                );
                let _ = self.lprintf(
                    "[WARNING]: ",
                    format_args!("[WARNING]: No logging functionality present.\n"),
                );
                null_fd
            }
        };

        if let Some(null_fd) = null_fd {
            check!(self, "dup2", libc::dup2(null_fd, targets.stdin));
        }
        if let Some(log_fd) = log_fd {
            check!(self, "dup2", libc::dup2(log_fd, targets.stdout));
            check!(self, "dup2", libc::dup2(log_fd, targets.stderr));
        }

        if let Some(null_fd) = null_fd {
            if !targets.contains(null_fd) {
                check!(self, "close", libc::close(null_fd));
            }
        }
        if let Some(log_fd) = log_fd {
            if !targets.contains(log_fd) && Some(log_fd) != null_fd {
                check!(self, "close", libc::close(log_fd));
            }
        }
    }
}
