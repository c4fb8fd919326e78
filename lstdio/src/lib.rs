// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Signal-safe line logging
//!
//! This crate writes log lines of the form
//!
//! ```text
//! Thu Feb 29 12:34:56 2024 [WARNING]: disk almost full
//! ```
//!
//! to stdout or stderr, from any thread, including from signal handlers.  A logging call never
//! allocates and never takes a lock: the line is formatted into a bounded buffer on the caller's
//! stack, with a timestamp computed by integer arithmetic from a cached UTC offset, and handed to
//! one `write(2)`.  On a regular file or pipe that makes every line atomic with respect to other
//! writers.
//!
//! The severity comes from the start of the format string.  A format that begins with one of
//! `[D`, `[I`, `[W`, `[E` or `[R` is tagged (the tag being the literal text of the message) and
//! routed by it; anything else is logged as a default severity message with the tag added:
//!
//! ```no_run
//! use lstdio::{lprintf, setup_lstdio};
//!
//! setup_lstdio();
//! lprintf!("[INFO]: listening on port {}\n", 8080);
//! lprintf!("[ERROR]: peer {} went away\n", "10.0.0.7");
//! lprintf!("no tag here\n");
//! ```
//!
//! Call [`setup_lstdio`] once at startup, before spawning threads or installing signal handlers.
//! It reads the threshold from the `LOG_LEVEL` environment variable and caches the local timezone.
//! [`redirect_stdio`] optionally points the standard streams at a log file.

#![no_std]
#![deny(missing_docs)]

use core::ffi::CStr;
use core::fmt::Arguments;

pub mod classify;
pub mod clock;
pub mod compose;
pub mod error;
pub mod level;
pub mod line;
pub mod setup;
pub mod sys;
pub mod timezone;
pub mod writer;

#[cfg(feature = "log")]
pub mod logging;

pub use classify::{Destination, FormatDecision};
pub use compose::Engine;
pub use error::{Error, Result};
pub use level::{Severity, SeverityFilter};
pub use setup::StdioFds;
pub use writer::{RawFd, Sink};

#[cfg(feature = "log")]
pub use logging::set_logger;

// Bring in the generated build configuration.
pub mod config {
    //! Build time configuration.
    //!
    //! Generated from the `LSTDIO_LINE_BUF_SIZE` and `LSTDIO_DEFAULT_LEVEL` environment variables
    //! at build time.

    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}

/// The process-wide logging engine, on stdout and stderr.
///
/// Its threshold starts at [`config::DEFAULT_LEVEL`] and its timezone at UTC until
/// [`setup_lstdio`] runs.
pub static ENGINE: Engine = Engine::new();

/// Log through [`ENGINE`], routed by the tag of `format`.  See [`lprintf!`].
pub fn lprintf(format: &str, args: Arguments<'_>) -> Result<usize> {
    ENGINE.lprintf(format, args)
}

/// Log through [`ENGINE`] to `stream`.  See [`lfprintf!`].
pub fn lfprintf(stream: RawFd, format: &str, args: Arguments<'_>) -> Result<usize> {
    ENGINE.lfprintf(stream, format, args)
}

/// Log through [`ENGINE`], to `stream` if given, else routed by the tag.
pub fn lvfprintf(stream: Option<RawFd>, format: &str, args: Arguments<'_>) -> Result<usize> {
    ENGINE.lvfprintf(stream, format, args)
}

/// One-time process setup: cache the timezone and read `LOG_LEVEL`.
///
/// Not async-signal-safe.
pub fn setup_lstdio() {
    ENGINE.setup();
}

/// Recompute the cached timezone offset.
///
/// Not async-signal-safe.
pub fn update_timezone() {
    ENGINE.update_timezone();
}

/// Point stdin at `/dev/null` and stdout and stderr at `path`, opened for appending.
///
/// Falls back to `/dev/null` for the outputs, with a warning, if the file can't be opened.
pub fn redirect_stdio(path: &CStr) {
    ENGINE.redirect(path, StdioFds::STANDARD);
}

/// Log a message, with `format!` syntax.
///
/// The literal's first two characters select the severity and stream.  Returns the
/// [`Result`] of the write, `Ok(0)` if the message was filtered.
#[macro_export]
macro_rules! lprintf {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::lprintf($fmt, ::core::format_args!($fmt $(, $arg)*))
    };
}

/// Log a message to an explicit file descriptor, with `format!` syntax.
#[macro_export]
macro_rules! lfprintf {
    ($fd:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::lfprintf($fd, $fmt, ::core::format_args!($fmt $(, $arg)*))
    };
}

/// Log `"[ERROR]: <message>: <errno text>"`, with `format!` syntax for the message.
#[macro_export]
macro_rules! lperrorf {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::ENGINE.lperrorf(::core::format_args!($fmt $(, $arg)*))
    };
}

/// Log `"[ERROR]: <message>: <errno text>"`.
#[macro_export]
macro_rules! lperror {
    ($msg:expr) => {
        $crate::ENGINE.lperror($msg)
    };
}

/// Log `"[ERROR]: <file>:<line>: <what>: <errno text>"` for the calling location.
#[macro_export]
macro_rules! dlperror {
    ($what:expr) => {
        $crate::ENGINE.dlperror(::core::file!(), ::core::line!(), $what)
    };
}
