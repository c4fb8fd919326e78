//! Logging through the lstdio engine
//!
//! This module implements a log handler (for the [`log`] crate) that formats records as tagged
//! lines and hands them to an [`Engine`].

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::compose::Engine;
use crate::level::Severity;
use crate::ENGINE;

/// A log handler writing through an engine.
pub(crate) struct LstdioLogger {
    engine: &'static Engine,
}

pub(crate) fn severity(level: Level) -> Severity {
    match level {
        Level::Error => Severity::Error,
        Level::Warn => Severity::Warning,
        Level::Info => Severity::Info,
        Level::Debug | Level::Trace => Severity::Debug,
    }
}

impl LstdioLogger {
    pub(crate) const fn new(engine: &'static Engine) -> LstdioLogger {
        LstdioLogger { engine }
    }
}

impl Log for LstdioLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.engine.filter().passes(severity(metadata.level()))
    }

    // The tag doubles as the format string, which is all the classifier looks at.
    fn log(&self, record: &Record<'_>) {
        let tag = severity(record.level()).tag();
        let _ = self.engine.lprintf(
            tag,
            format_args!("{}{}: {}\n", tag, record.target(), record.args()),
        );
    }

    // Every line is already out after its write.
    fn flush(&self) {}
}

static LSTDIO_LOGGER: LstdioLogger = LstdioLogger::new(&ENGINE);

/// Send `log` records through the process-wide [`ENGINE`].
///
/// The `log` max level is set to `Trace`; records are filtered by the engine threshold, including
/// changes made after this call.
///
/// # Safety
///
/// This is unsafe due to racy issues in the log framework on targets that do not support atomic
/// pointers.  As long as this is called ever by a single thread, it is safe to use.
pub unsafe fn set_logger() -> Result<(), SetLoggerError> {
    super::set_logger_internal(&LSTDIO_LOGGER, LevelFilter::Trace)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::io::{Read, Seek, SeekFrom};
    use std::os::fd::AsRawFd;
    use std::string::String;

    use log::{Level, Log, Record};

    use super::*;
    use crate::writer::Sink;

    #[test]
    fn levels_fold_onto_tags() {
        assert_eq!(severity(Level::Error), Severity::Error);
        assert_eq!(severity(Level::Warn), Severity::Warning);
        assert_eq!(severity(Level::Info), Severity::Info);
        assert_eq!(severity(Level::Debug), Severity::Debug);
        assert_eq!(severity(Level::Trace), Severity::Debug);
    }

    #[test]
    fn records_become_tagged_lines() {
        let mut out = tempfile::tempfile().unwrap();
        let mut err = tempfile::tempfile().unwrap();
        let engine: &'static Engine = std::boxed::Box::leak(std::boxed::Box::new(
            Engine::new()
                .with_sink(Sink::new(out.as_raw_fd(), err.as_raw_fd()))
                .with_clock(|| Some(0)),
        ));
        let logger = LstdioLogger::new(engine);

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("net")
                .args(format_args!("up {}", 1))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .target("disk")
                .args(format_args!("slow"))
                .build(),
        );
        // Below the default threshold.
        logger.log(
            &Record::builder()
                .level(Level::Trace)
                .target("x")
                .args(format_args!("hidden"))
                .build(),
        );

        let mut text = String::new();
        out.seek(SeekFrom::Start(0)).unwrap();
        out.read_to_string(&mut text).unwrap();
        assert_eq!(text, "Thu Jan  1 00:00:00 1970 [INFO]: net: up 1\n");

        let mut text = String::new();
        err.seek(SeekFrom::Start(0)).unwrap();
        err.read_to_string(&mut text).unwrap();
        assert_eq!(text, "Thu Jan  1 00:00:00 1970 [WARNING]: disk: slow\n");

        let trace = Metadata::builder().level(Level::Trace).build();
        assert!(!logger.enabled(&trace));
        engine.filter().set(Severity::Debug);
        assert!(logger.enabled(&trace));
    }

    #[test]
    fn installed_logger_follows_later_threshold_changes() {
        unsafe { set_logger().unwrap() };
        assert_eq!(log::max_level(), LevelFilter::Trace);

        let debug = Metadata::builder().level(Level::Debug).build();
        let initial = ENGINE.filter().threshold();
        ENGINE.filter().set(Severity::Info);
        assert!(!log::logger().enabled(&debug));
        ENGINE.filter().set(Severity::Debug);
        assert!(log::logger().enabled(&debug));
        ENGINE.filter().set(initial);
    }
}
