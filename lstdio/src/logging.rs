//! Rust logging through lstdio
//!
//! Records from the [`log`] crate are turned into tagged lines and go through the same engine as
//! [`lprintf!`](crate::lprintf), so they get the same timestamp, stream routing and filtering.
//! `log` levels map onto the tags as follows:
//!
//! - `Error`: `[ERROR]`, stderr
//! - `Warn`: `[WARNING]`, stderr
//! - `Info`: `[INFO]`, stdout
//! - `Debug`, `Trace`: `[DEBUG]`, stderr.  There is no separate trace tag.
//!
//! The `log` crate's max level is left wide open.  Filtering happens in the engine, so a later
//! change of the threshold applies to `log` records as well.

use log::{LevelFilter, Log, SetLoggerError};

mod impl_lstdio;

pub use impl_lstdio::set_logger;

// The Rust logging system has different entry points based on whether or not we are on a target
// with atomic pointers.  We will provide a single function for this, which will be safe or unsafe
// depending on this.  The safety has to do with initialization order, and as long as this is called
// before any other threads run, it should be safe.
cfg_if::cfg_if! {
    if #[cfg(target_has_atomic = "ptr")] {
        unsafe fn set_logger_internal(
            logger: &'static dyn Log,
            max: LevelFilter,
        ) -> Result<(), SetLoggerError> {
            log::set_logger(logger)?;
            log::set_max_level(max);
            Ok(())
        }
    } else {
        unsafe fn set_logger_internal(
            logger: &'static dyn Log,
            max: LevelFilter,
        ) -> Result<(), SetLoggerError> {
            log::set_logger_racy(logger)?;
            log::set_max_level_racy(max);
            Ok(())
        }
    }
}
