// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Line composition.
//!
//! Every logging call comes through an [`Engine`].  The call is classified by its format string,
//! then a line is built on the stack:
//!
//! ```text
//! Thu Feb 29 12:34:56 2024 [INFO]: message text
//! |-------- 24 ---------| ^ delimiter, then the tag (only for untagged messages) and payload
//! ```
//!
//! and written out with a single `write`.  Nothing here allocates, locks, or keeps state outside
//! the call's own stack frame, so it can be used from signal handlers and from threads that may be
//! cancelled.
//!
//! With the `dynamic-line-size` feature the message is first rendered in measuring mode, and only
//! as much of the buffer as the line needs (never more than [`LINE_BUF_SIZE`]) is used.  Without
//! it the whole buffer is always available.  Both produce the same bytes.
//!
//! A message that doesn't fit is written truncated, and followed by [`OVERFLOW_MSG`] (with the
//! `warn-on-overflow` feature).  The notice is a literal that always fits, and is itself emitted
//! with overflow reporting turned off, so it can never cascade.

use core::fmt::{self, Arguments};

use crate::classify::{classify, FormatDecision};
use crate::clock::{self, TIMESTAMP_LEN};
use crate::config::{DEFAULT_LEVEL, LINE_BUF_SIZE};
use crate::error::{Error, Result};
use crate::level::{Severity, SeverityFilter};
use crate::line::{Cursor, LineBuffer};
use crate::sys;
use crate::timezone::TimezoneCache;
use crate::writer::{self, RawFd, Sink};

/// Separates the calendar text from the rest of the line.
pub const DELIMITER: u8 = b' ';

/// Bytes in front of every payload: the calendar text and the delimiter.
pub const PREFIX_LEN: usize = TIMESTAMP_LEN + 1;

/// Written after a line that had to be truncated.
pub const OVERFLOW_MSG: &str = "[DEBUG]: Log message truncated (overflow)\n";

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Smallest usable `LINE_BUF_SIZE`: the prefix and injected tag must always fit, and with
/// `warn-on-overflow` the notice must fit without being truncated itself.
pub const MIN_LINE_BUF_SIZE: usize = PREFIX_LEN
    + max(
        DEFAULT_LEVEL.tag().len(),
        if cfg!(feature = "warn-on-overflow") {
            OVERFLOW_MSG.len()
        } else {
            0
        },
    );

const _: () = assert!(
    LINE_BUF_SIZE >= MIN_LINE_BUF_SIZE,
    "LINE_BUF_SIZE is below the minimal size required for safe operation"
);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Overflow {
    Report,
    Silent,
}

/// Logging state: the severity threshold, the cached timezone, the clock and the default
/// descriptors.
///
/// The process uses the single [`ENGINE`](crate::ENGINE).  The threshold and timezone are atomics
/// with a single-writer contract: they are set during startup (and by explicit calls to the
/// setters), and read by every call.
pub struct Engine {
    filter: SeverityFilter,
    timezone: TimezoneCache,
    clock: fn() -> Option<i64>,
    sink: Sink,
}

impl Engine {
    /// An engine on stdout/stderr, using the system clock, at the default level and UTC.
    pub const fn new() -> Engine {
        Engine {
            filter: SeverityFilter::new(),
            timezone: TimezoneCache::new(0),
            clock: sys::now,
            sink: Sink::STANDARD,
        }
    }

    /// Replace the default descriptors.
    pub fn with_sink(self, sink: Sink) -> Engine {
        Engine { sink, ..self }
    }

    /// Replace the time source.  `None` from the clock renders the epoch placeholder.
    pub fn with_clock(self, clock: fn() -> Option<i64>) -> Engine {
        Engine { clock, ..self }
    }

    /// The severity threshold.
    pub fn filter(&self) -> &SeverityFilter {
        &self.filter
    }

    /// The cached UTC offset.
    pub fn timezone(&self) -> &TimezoneCache {
        &self.timezone
    }

    /// The default descriptors.
    pub fn sink(&self) -> Sink {
        self.sink
    }

    /// Classify a format string against this engine's threshold.
    pub fn classify(&self, format: &str) -> FormatDecision {
        classify(format, &self.filter)
    }

    /// Log to the stream selected by the tag of `format`.
    ///
    /// `format` is only inspected for its tag; `args` is what gets rendered.
    pub fn lprintf(&self, format: &str, args: Arguments<'_>) -> Result<usize> {
        self.lvfprintf(None, format, args)
    }

    /// Log to `stream`, regardless of the tag.  The tag still decides if the line is produced.
    pub fn lfprintf(&self, stream: RawFd, format: &str, args: Arguments<'_>) -> Result<usize> {
        self.lvfprintf(Some(stream), format, args)
    }

    /// Log a message.
    ///
    /// Returns the number of bytes written, or 0 if the message was filtered.  errno is left as
    /// it was on entry.
    pub fn lvfprintf(
        &self,
        stream: Option<RawFd>,
        format: &str,
        args: Arguments<'_>,
    ) -> Result<usize> {
        let saved = sys::errno();
        let ret = self.emit(stream, format, args, Overflow::Report);
        sys::set_errno(saved);
        ret
    }

    /// Log `"[ERROR]: <message>: <errno text>"`, describing the errno at the time of the call.
    ///
    /// The message is rendered into its own bounded buffer first.
    pub fn lperrorf(&self, args: Arguments<'_>) {
        let saved = sys::errno();
        if self.filter.passes(Severity::Error) {
            let mut message = LineBuffer::<LINE_BUF_SIZE>::new();
            let limit = line_limit::<LINE_BUF_SIZE>(0, args);
            let mut cursor = Cursor::new(message.region(limit));
            let _ = fmt::write(&mut cursor, args);
            let (len, truncated) = (cursor.len(), cursor.truncated());
            message.verify();
            if truncated {
                self.overflow_notice();
            }
            // The cursor never splits a UTF-8 sequence.
            let text = core::str::from_utf8(message.bytes(len)).unwrap_or("");
            let _ = self.emit(
                None,
                "[ERROR]: ",
                format_args!("[ERROR]: {}: {}\n", text, Error(saved)),
                Overflow::Report,
            );
        }
        sys::set_errno(saved);
    }

    /// Log `"[ERROR]: <message>: <errno text>"`.
    pub fn lperror(&self, message: &str) -> Result<usize> {
        let err = Error::last();
        self.lprintf("[ERROR]: ", format_args!("[ERROR]: {}: {}\n", message, err))
    }

    /// Log `"[ERROR]: <file>:<line>: <what>: <errno text>"`, with the file's basename.
    pub fn dlperror(&self, file: &str, line: u32, what: &str) -> Result<usize> {
        let err = Error::last();
        let base = file.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file);
        self.lprintf(
            "[ERROR]: ",
            format_args!("[ERROR]: {}:{}: {}: {}\n", base, line, what, err),
        )
    }

    fn emit(
        &self,
        stream: Option<RawFd>,
        format: &str,
        args: Arguments<'_>,
        overflow: Overflow,
    ) -> Result<usize> {
        let decision = self.classify(format);
        let fd = match self.sink.fd(decision.destination(&self.filter)) {
            None => return Ok(0),
            Some(fd) => stream.unwrap_or(fd),
        };

        let mut line = LineBuffer::<LINE_BUF_SIZE>::new();
        let (len, truncated) = self.render(&mut line, decision, args);
        let ret = writer::write_line(fd, line.bytes(len));

        if truncated && overflow == Overflow::Report {
            self.overflow_notice();
        }
        ret
    }

    /// Fill `line` with the prefix and the rendered message.
    ///
    /// Returns the line length and whether anything was cut off.  Aborts on guard corruption.
    pub(crate) fn render<const N: usize>(
        &self,
        line: &mut LineBuffer<N>,
        decision: FormatDecision,
        args: Arguments<'_>,
    ) -> (usize, bool) {
        let limit = line_limit::<N>(prefix_len(decision), args);
        let mut cursor = Cursor::new(line.region(limit));

        let mut stamp = [0u8; TIMESTAMP_LEN];
        clock::timestamp((self.clock)(), self.timezone.read(), &mut stamp);
        cursor.put(&stamp);
        cursor.put(&[DELIMITER]);
        // A tagged format string already starts with its tag.
        if decision == FormatDecision::Fallback {
            cursor.put(DEFAULT_LEVEL.tag().as_bytes());
        }
        // Errors can only come from the caller's Display impls.  Keep what was rendered.
        let _ = fmt::write(&mut cursor, args);

        let rendered = (cursor.len(), cursor.truncated());
        line.verify();
        rendered
    }

    fn overflow_notice(&self) {
        if cfg!(feature = "warn-on-overflow") {
            let _ = self.emit(
                None,
                OVERFLOW_MSG,
                format_args!("{}", OVERFLOW_MSG),
                Overflow::Silent,
            );
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("filter", &self.filter)
            .field("timezone", &self.timezone)
            .field("sink", &self.sink)
            .finish()
    }
}

fn prefix_len(decision: FormatDecision) -> usize {
    match decision {
        FormatDecision::Fallback => PREFIX_LEN + DEFAULT_LEVEL.tag().len(),
        FormatDecision::Classified(..) => PREFIX_LEN,
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "dynamic-line-size")] {
        /// Bytes of an `N` byte buffer to use: what the message measures plus `overhead`.
        fn line_limit<const N: usize>(overhead: usize, args: Arguments<'_>) -> usize {
            let mut measure = crate::line::Measure::default();
            let _ = fmt::write(&mut measure, args);
            N.min(measure.0.saturating_add(overhead))
        }
    } else {
        /// Bytes of an `N` byte buffer to use: all of them.
        fn line_limit<const N: usize>(_overhead: usize, _args: Arguments<'_>) -> usize {
            N
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::classify::Destination;

    // 2024-02-29 12:34:56 UTC
    fn leap_day() -> Option<i64> {
        Some(1_709_210_096)
    }

    fn engine(level: Severity) -> Engine {
        let engine = Engine::new().with_clock(leap_day);
        engine.filter().set(level);
        engine
    }

    fn line<const N: usize>(engine: &Engine, format: &str, args: Arguments<'_>) -> (Vec<u8>, bool) {
        let mut buf = LineBuffer::<N>::new();
        let (len, truncated) = engine.render(&mut buf, engine.classify(format), args);
        (buf.bytes(len).to_vec(), truncated)
    }

    #[test]
    fn classified_line_has_no_injected_tag() {
        let engine = engine(Severity::Info);
        let (bytes, truncated) =
            line::<128>(&engine, "[INFO]: ", format_args!("[INFO]: {} up\n", "link"));
        assert_eq!(bytes, b"Thu Feb 29 12:34:56 2024 [INFO]: link up\n");
        assert!(!truncated);
    }

    #[test]
    fn fallback_line_gets_default_tag() {
        let engine = engine(Severity::Info);
        let (bytes, _) = line::<128>(&engine, "hello", format_args!("hello"));
        let mut expected = Vec::from(&b"Thu Feb 29 12:34:56 2024 "[..]);
        expected.extend_from_slice(DEFAULT_LEVEL.tag().as_bytes());
        expected.extend_from_slice(b"hello");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn timezone_offset_applies() {
        let engine = Engine {
            timezone: TimezoneCache::new(3600),
            ..engine(Severity::Info)
        };
        let (bytes, _) = line::<128>(&engine, "[I", format_args!("[I"));
        assert_eq!(&bytes[..PREFIX_LEN], b"Thu Feb 29 13:34:56 2024 ");
    }

    #[test]
    fn missing_clock_uses_placeholder() {
        let engine = Engine::new().with_clock(|| None);
        let (bytes, _) = line::<128>(&engine, "[ERROR]: ", format_args!("[ERROR]: x"));
        assert_eq!(bytes, b"Thu Jan 01 00:00:00 1970 [ERROR]: x");
    }

    #[test]
    fn exact_fit_boundary() {
        let engine = engine(Severity::Debug);
        // 64 byte buffer: 25 byte prefix plus 39 bytes of payload fit exactly.
        let payload = "x".repeat(39);
        assert_eq!(payload.len(), 39);
        let (bytes, truncated) = line::<64>(&engine, "[D", format_args!("{}", payload));
        assert_eq!(bytes.len(), 64);
        assert!(!truncated);

        let payload = payload + "y";
        let (bytes, truncated) = line::<64>(&engine, "[D", format_args!("{}", payload));
        assert_eq!(bytes.len(), 64);
        assert!(truncated);
        assert_eq!(&bytes[PREFIX_LEN..], &payload.as_bytes()[..39]);
    }

    #[test]
    fn identical_calls_identical_bytes() {
        let engine = engine(Severity::Info);
        let first = line::<256>(&engine, "[W", format_args!("[WARNING]: {} of {}\n", 3, 4));
        let second = line::<256>(&engine, "[W", format_args!("[WARNING]: {} of {}\n", 3, 4));
        assert_eq!(first, second);
    }

    #[test]
    fn dropped_messages_write_nothing() {
        let engine = engine(Severity::Info).with_sink(Sink::new(-1, -1));
        // A bad descriptor would fail the write, so Ok(0) means nothing was attempted.
        assert_eq!(engine.lprintf("[DEBUG]: ", format_args!("[DEBUG]: hidden")), Ok(0));
        engine.filter().set(Severity::None);
        assert_eq!(engine.lprintf("plain", format_args!("plain")), Ok(0));
        assert_eq!(engine.classify("plain").destination(engine.filter()), Destination::Drop);
    }

    #[test]
    fn errno_is_preserved() {
        let engine = engine(Severity::Info).with_sink(Sink::new(-1, -1));
        sys::set_errno(libc::ENOENT);
        // Fails with EBADF internally.
        assert_eq!(
            engine.lprintf("[INFO]: ", format_args!("[INFO]: x")),
            Err(Error(libc::EBADF))
        );
        assert_eq!(sys::errno(), libc::ENOENT);
    }

    #[test]
    #[cfg(feature = "warn-on-overflow")]
    fn minimum_size_covers_notice() {
        assert_eq!(MIN_LINE_BUF_SIZE, PREFIX_LEN + OVERFLOW_MSG.len());
        assert!(LINE_BUF_SIZE >= PREFIX_LEN + OVERFLOW_MSG.len());
        assert!(OVERFLOW_MSG.starts_with("[D"));
    }

    #[test]
    #[cfg(not(feature = "warn-on-overflow"))]
    fn minimum_size_without_notice() {
        assert_eq!(MIN_LINE_BUF_SIZE, PREFIX_LEN + DEFAULT_LEVEL.tag().len());
    }
}
