//! Severities and the process-wide severity filter.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::config::DEFAULT_LEVEL;

/// Urgency of a message, ordered from "nothing" to "always".
///
/// The numeric values are part of the contract: a threshold lets through every severity whose value
/// is not above it.  `Remote` sits above everything and passes regardless of the threshold, since
/// it marks output explicitly requested by a remote peer or user rather than a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    /// The "nothing passes" threshold.  Has an empty tag.
    None = 0,
    /// Failures.
    Error = 1,
    /// Suspicious but handled conditions.
    Warning = 2,
    /// Normal operational messages.
    Info = 3,
    /// Developer diagnostics.
    Debug = 4,
    /// Always emitted.
    Remote = 5,
}

/// The literal prefix of each severity, indexed by its numeric value.
const TAGS: [&str; 6] = ["", "[ERROR]: ", "[WARNING]: ", "[INFO]: ", "[DEBUG]: ", "[REMOTE]: "];

impl Severity {
    /// The literal tag written before messages of this severity.
    pub const fn tag(self) -> &'static str {
        TAGS[self as usize]
    }

    /// Upper case name, as used in diagnostics about the configuration.
    pub const fn name(self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
            Severity::Remote => "REMOTE",
        }
    }

    /// Parse the single letter threshold syntax, case insensitive.
    ///
    /// Only `N`, `E`, `W`, `I` and `D` are thresholds; `Remote` can't be configured.
    pub const fn from_initial(letter: u8) -> Option<Severity> {
        match letter.to_ascii_uppercase() {
            b'N' => Some(Severity::None),
            b'E' => Some(Severity::Error),
            b'W' => Some(Severity::Warning),
            b'I' => Some(Severity::Info),
            b'D' => Some(Severity::Debug),
            _ => None,
        }
    }

    const fn from_u8(value: u8) -> Severity {
        match value {
            0 => Severity::None,
            1 => Severity::Error,
            2 => Severity::Warning,
            3 => Severity::Info,
            4 => Severity::Debug,
            _ => Severity::Remote,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a threshold setting isn't one of the known letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownLevel;

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level, expected one of N, E, W, I, D")
    }
}

impl core::error::Error for UnknownLevel {}

/// The minimum severity that is produced at all.
///
/// A single byte, read and written with relaxed atomics.  A concurrent change only affects which
/// messages pass during the change; it can't tear.
pub struct SeverityFilter {
    threshold: AtomicU8,
}

impl SeverityFilter {
    /// A filter starting at the built-in default level.
    pub const fn new() -> SeverityFilter {
        SeverityFilter::with_threshold(DEFAULT_LEVEL)
    }

    /// A filter starting at the given level.
    pub const fn with_threshold(level: Severity) -> SeverityFilter {
        SeverityFilter {
            threshold: AtomicU8::new(level as u8),
        }
    }

    /// The current threshold.
    pub fn threshold(&self) -> Severity {
        Severity::from_u8(self.threshold.load(Ordering::Relaxed))
    }

    /// Set the threshold.
    pub fn set(&self, level: Severity) {
        self.threshold.store(level as u8, Ordering::Relaxed);
    }

    /// Set the threshold from the leading letter of `text`.
    ///
    /// Unrecognized (or empty) input resets the threshold to the default and returns an error, so
    /// the caller can warn about it.
    pub fn set_from_str(&self, text: &[u8]) -> Result<Severity, UnknownLevel> {
        match text.first().copied().and_then(Severity::from_initial) {
            Some(level) => {
                self.set(level);
                Ok(level)
            }
            None => {
                self.set(DEFAULT_LEVEL);
                Err(UnknownLevel)
            }
        }
    }

    /// Would a message of this severity be produced?
    pub fn passes(&self, severity: Severity) -> bool {
        severity == Severity::Remote || severity as u8 <= self.threshold.load(Ordering::Relaxed)
    }
}

impl Default for SeverityFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SeverityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeverityFilter({})", self.threshold())
    }
}
