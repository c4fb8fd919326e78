//! Tag syntax of format strings.
//!
//! A format string that starts with `[` and one of the letters `D`, `I`, `W`, `E` or `R` already
//! carries its severity tag, and picks the output stream with it:
//!
//! | prefix | severity  | stream |
//! |--------|-----------|--------|
//! | `[D`   | Debug     | stderr |
//! | `[I`   | Info      | stdout |
//! | `[W`   | Warning   | stderr |
//! | `[E`   | Error     | stderr |
//! | `[R`   | Remote    | stdout |
//!
//! These five two byte prefixes are a public contract.  Anything else is a "fallback" message,
//! which gets the default severity's tag injected in front of it.

use crate::config::DEFAULT_LEVEL;
use crate::level::{Severity, SeverityFilter};

/// Where a message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Produce nothing.
    Drop,
    /// Standard output.
    PrimaryStream,
    /// Standard error.
    SecondaryStream,
}

/// What the format string says about a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatDecision {
    /// No recognized tag.  Treated as a default severity message, with the tag injected.
    Fallback,
    /// Tagged.  The destination is already [`Destination::Drop`] if the severity is filtered.
    Classified(Severity, Destination),
}

impl FormatDecision {
    /// Resolve the stream this message is written to, taking the filter into account for
    /// fallback messages.
    pub fn destination(self, filter: &SeverityFilter) -> Destination {
        match self {
            FormatDecision::Classified(_, dest) => dest,
            FormatDecision::Fallback if filter.passes(DEFAULT_LEVEL) => Destination::PrimaryStream,
            FormatDecision::Fallback => Destination::Drop,
        }
    }
}

/// Classify `format` by its first two bytes.
pub fn classify(format: &str, filter: &SeverityFilter) -> FormatDecision {
    let (severity, dest) = match format.as_bytes() {
        [b'[', b'D', ..] => (Severity::Debug, Destination::SecondaryStream),
        [b'[', b'I', ..] => (Severity::Info, Destination::PrimaryStream),
        [b'[', b'W', ..] => (Severity::Warning, Destination::SecondaryStream),
        [b'[', b'E', ..] => (Severity::Error, Destination::SecondaryStream),
        [b'[', b'R', ..] => (Severity::Remote, Destination::PrimaryStream),
        _ => return FormatDecision::Fallback,
    };
    if filter.passes(severity) {
        FormatDecision::Classified(severity, dest)
    } else {
        FormatDecision::Classified(severity, Destination::Drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_prefixes() {
        let filter = SeverityFilter::with_threshold(Severity::Debug);
        assert_eq!(
            classify("[DEBUG]: x", &filter),
            FormatDecision::Classified(Severity::Debug, Destination::SecondaryStream)
        );
        assert_eq!(
            classify("[INFO]: x", &filter),
            FormatDecision::Classified(Severity::Info, Destination::PrimaryStream)
        );
        assert_eq!(
            classify("[WARNING]: x", &filter),
            FormatDecision::Classified(Severity::Warning, Destination::SecondaryStream)
        );
        assert_eq!(
            classify("[ERROR]: x", &filter),
            FormatDecision::Classified(Severity::Error, Destination::SecondaryStream)
        );
        assert_eq!(
            classify("[REMOTE]: x", &filter),
            FormatDecision::Classified(Severity::Remote, Destination::PrimaryStream)
        );
        // Only the first two bytes matter.
        assert_eq!(
            classify("[D", &filter),
            FormatDecision::Classified(Severity::Debug, Destination::SecondaryStream)
        );
    }

    #[test]
    fn everything_else_falls_back() {
        let filter = SeverityFilter::with_threshold(Severity::Debug);
        for format in ["", "[", "hello", "[d lowercase", "[X]: x", " [I", "{}", "[[I"] {
            assert_eq!(classify(format, &filter), FormatDecision::Fallback, "{:?}", format);
        }
    }

    #[test]
    fn filtered_tags_drop() {
        let filter = SeverityFilter::with_threshold(Severity::Info);
        let decision = classify("[DEBUG]: noisy", &filter);
        assert_eq!(decision, FormatDecision::Classified(Severity::Debug, Destination::Drop));
        assert_eq!(decision.destination(&filter), Destination::Drop);

        filter.set(Severity::Debug);
        assert_eq!(
            classify("[DEBUG]: noisy", &filter).destination(&filter),
            Destination::SecondaryStream
        );
    }

    #[test]
    fn remote_ignores_threshold() {
        let filter = SeverityFilter::with_threshold(Severity::None);
        assert_eq!(
            classify("[REMOTE]: hi", &filter),
            FormatDecision::Classified(Severity::Remote, Destination::PrimaryStream)
        );
        assert_eq!(classify("[ERROR]: x", &filter).destination(&filter), Destination::Drop);
    }

    #[test]
    fn fallback_follows_default_level() {
        let filter = SeverityFilter::with_threshold(DEFAULT_LEVEL);
        assert_eq!(FormatDecision::Fallback.destination(&filter), Destination::PrimaryStream);
        filter.set(Severity::None);
        assert_eq!(FormatDecision::Fallback.destination(&filter), Destination::Drop);
    }
}
