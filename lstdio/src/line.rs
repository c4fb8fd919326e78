// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Bounded line buffers.
//!
//! `core::fmt` is the formatter.  Two [`Write`] sinks provide the two things the composer needs
//! from it: [`Measure`] only counts the bytes a message would take, and [`Cursor`] copies as much
//! as fits into a fixed slice while still counting everything, so truncation can be detected
//! afterwards.
//!
//! [`LineBuffer`] is the stack storage.  It carries a sentinel byte directly before and after the
//! usable region, which is checked once the line is complete.

use core::fmt::{self, Write};
use core::ptr;

/// Value of the sentinel bytes around a [`LineBuffer`].
pub const GUARD: u8 = 0xA5;

fn utf8_byte_length(byte: u8) -> usize {
    if byte & 0b1000_0000 == 0 {
        // Single byte (0xxxxxxx)
        1
    } else if byte & 0b1110_0000 == 0b1100_0000 {
        // Two-byte sequence (110xxxxx)
        2
    } else if byte & 0b1111_0000 == 0b1110_0000 {
        // Three-byte sequence (1110xxxx)
        3
    } else if byte & 0b1111_1000 == 0b1111_0000 {
        // Four-byte sequence (11110xxx)
        4
    } else {
        // Continuation byte or invalid (10xxxxxx)
        1
    }
}

/// Measure mode: the number of bytes a message renders to.
#[derive(Debug, Default)]
pub struct Measure(pub usize);

impl Write for Measure {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 = self.0.saturating_add(s.len());
        Ok(())
    }
}

/// Render mode: write into a bounded slice.
///
/// Never fails.  Once a piece of text doesn't fit, nothing else is copied, but the length it would
/// have taken keeps being counted in [`required`].  A UTF-8 sequence is never split.
///
/// [`required`]: Cursor::required
pub struct Cursor<'a> {
    buf: &'a mut [u8],
    // How many bytes are used in the buffer.
    count: usize,
    // Bytes that would have been written with unlimited room.
    required: usize,
    full: bool,
}

impl<'a> Cursor<'a> {
    /// A cursor at the start of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Cursor<'a> {
        Cursor {
            buf,
            count: 0,
            required: 0,
            full: false,
        }
    }

    /// Append raw bytes, with the same truncation rule as text.
    pub fn put(&mut self, bytes: &[u8]) {
        self.required = self.required.saturating_add(bytes.len());
        if self.full {
            return;
        }
        for &b in bytes {
            // Ensure we have room for an entire UTF-8 sequence.
            if self.count + utf8_byte_length(b) > self.buf.len() {
                self.full = true;
                return;
            }
            self.buf[self.count] = b;
            self.count += 1;
        }
    }

    /// Bytes actually written.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Nothing written yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bytes that everything written so far needs.
    pub fn required(&self) -> usize {
        self.required
    }

    /// Room left.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.count
    }

    /// Did anything not fit?
    pub fn truncated(&self) -> bool {
        self.required > self.count
    }
}

impl Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put(s.as_bytes());
        Ok(())
    }
}

/// An out-of-bounds write touched a sentinel byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardViolation {
    /// The byte before the usable region changed.
    Head,
    /// The byte after the usable region changed.
    Tail,
}

/// Stack storage for one line of at most `N` bytes, fenced by sentinel bytes.
///
/// `repr(C)` keeps the three fields adjacent, so the sentinels sit immediately before and after
/// `data`.
#[repr(C)]
pub struct LineBuffer<const N: usize> {
    head: u8,
    data: [u8; N],
    tail: u8,
}

impl<const N: usize> LineBuffer<N> {
    /// Usable capacity.
    pub const CAPACITY: usize = N;

    /// A zeroed buffer with both sentinels set.
    pub const fn new() -> Self {
        LineBuffer {
            head: GUARD,
            data: [0; N],
            tail: GUARD,
        }
    }

    /// The first `len` bytes of the usable region, clamped to the capacity.
    pub fn region(&mut self, len: usize) -> &mut [u8] {
        let len = len.min(N);
        &mut self.data[..len]
    }

    /// The first `len` bytes, for writing out.
    pub fn bytes(&self, len: usize) -> &[u8] {
        &self.data[..len.min(N)]
    }

    /// Raw pointer to the whole buffer, sentinels included, `N + 2` bytes long.
    ///
    /// For code that fills the buffer outside of safe Rust.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        (self as *mut Self).cast::<u8>()
    }

    /// Compare both sentinels against [`GUARD`].
    ///
    /// The loads are volatile, so they happen even when the compiler can see no write to them.
    pub fn check_guards(&self) -> Result<(), GuardViolation> {
        // SAFETY: Both are plain fields of `self`.
        let head = unsafe { ptr::read_volatile(&self.head) };
        let tail = unsafe { ptr::read_volatile(&self.tail) };
        if head != GUARD {
            Err(GuardViolation::Head)
        } else if tail != GUARD {
            Err(GuardViolation::Tail)
        } else {
            Ok(())
        }
    }

    /// Abort the process if a sentinel was overwritten.
    ///
    /// The stack is already corrupt at that point, so there is nothing to return to.  Without the
    /// `guard-bytes` feature this is a no-op.
    #[inline]
    pub fn verify(&self) {
        #[cfg(feature = "guard-bytes")]
        if self.check_guards().is_err() {
            crate::sys::abort();
        }
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
