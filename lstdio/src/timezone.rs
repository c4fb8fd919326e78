//! Cached offset from UTC.
//!
//! Working out the local offset needs the C library's timezone machinery, which locks and may touch
//! the filesystem.  It is done once, at startup, by [`TimezoneCache::refresh`].  Every timestamp
//! after that only performs a single relaxed atomic load.

use core::fmt;
use core::sync::atomic::{AtomicI32, Ordering};

use crate::error::{Error, Result};
use crate::sys;

/// Signed offset from UTC, in seconds.
pub struct TimezoneCache {
    offset: AtomicI32,
}

impl TimezoneCache {
    /// A cache holding the given offset.  The process-wide cache starts at UTC.
    pub const fn new(offset: i32) -> TimezoneCache {
        TimezoneCache {
            offset: AtomicI32::new(offset),
        }
    }

    /// Recompute the local offset for the current time and store it.
    ///
    /// Not async-signal-safe: this goes through `tzset` and `localtime_r`.  On failure the
    /// previous offset is kept.
    pub fn refresh(&self) -> Result<i32> {
        let now = sys::now().ok_or_else(Error::last)? as libc::time_t;
        // SAFETY: `tm` is plain old data, fully written on success.
        let mut tm: libc::tm = unsafe { core::mem::zeroed() };
        sys::tzset();
        let res = unsafe { libc::localtime_r(&now, &mut tm) };
        if res.is_null() {
            return Err(Error::last());
        }
        let offset = tm.tm_gmtoff as i32;
        self.offset.store(offset, Ordering::Relaxed);
        Ok(offset)
    }

    /// The cached offset.
    #[inline]
    pub fn read(&self) -> i32 {
        self.offset.load(Ordering::Relaxed)
    }
}

impl Default for TimezoneCache {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for TimezoneCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimezoneCache({}s)", self.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_given_offset() {
        assert_eq!(TimezoneCache::default().read(), 0);
        assert_eq!(TimezoneCache::new(-7200).read(), -7200);
    }

    #[test]
    fn refresh_stores_what_it_returns() {
        let cache = TimezoneCache::new(12345);
        let offset = cache.refresh().unwrap();
        assert_eq!(cache.read(), offset);
        // Real offsets are within a day of UTC.
        assert!(offset.abs() <= 24 * 3600);
    }

    #[test]
    fn refresh_agrees_with_localtime() {
        let cache = TimezoneCache::new(0);
        let offset = cache.refresh().unwrap();

        sys::tzset();
        let now = sys::now().unwrap() as libc::time_t;
        let mut tm: libc::tm = unsafe { core::mem::zeroed() };
        assert!(!unsafe { libc::localtime_r(&now, &mut tm) }.is_null());
        assert_eq!(offset, tm.tm_gmtoff as i32);
    }
}
