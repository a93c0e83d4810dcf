//! Clock port and record key generation.

use chrono::{Duration, Local, NaiveDateTime};

/// Key format of stored records: `YYYY-MM-DD HH:MM:SS.ffffff`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Port for getting the current wall-clock time.
///
/// Lets tests pin the time used for record keys.
pub trait Clock: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> NaiveDateTime;
}

/// System clock implementation using local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Produces strictly increasing record keys from a clock.
///
/// Two messages landing in the same microsecond, or a clock stepping
/// backwards, would otherwise reuse a key and overwrite a record.
pub struct Timestamper {
    clock: Box<dyn Clock>,
    last: Option<NaiveDateTime>,
}

impl Timestamper {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: None,
        }
    }

    /// Next record key.
    pub fn next_key(&mut self) -> String {
        let mut now = self.clock.now();
        if let Some(last) = self.last {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last = Some(now);
        now.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Make sure later keys sort after `key`, e.g. one the store bumped.
    ///
    /// Keys that are not timestamps are ignored.
    pub fn advance_past(&mut self, key: &str) {
        if let Ok(used) = NaiveDateTime::parse_from_str(key, TIMESTAMP_FORMAT) {
            if self.last.map_or(true, |last| used > last) {
                self.last = Some(used);
            }
        }
    }
}

/// The key one microsecond after `key`, if `key` is a timestamp.
pub fn following_key(key: &str) -> Option<String> {
    let at = NaiveDateTime::parse_from_str(key, TIMESTAMP_FORMAT).ok()?;
    Some((at + Duration::microseconds(1)).format(TIMESTAMP_FORMAT).to_string())
}

impl Default for Timestamper {
    fn default() -> Self {
        Self::new(SystemClock::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn fixed() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(14, 5, 7, 42)
            .unwrap()
    }

    #[test]
    fn formats_with_microseconds() {
        let mut ts = Timestamper::new(FixedClock(fixed()));
        assert_eq!(ts.next_key(), "2024-03-09 14:05:07.000042");
    }

    #[test]
    fn keys_strictly_increase_on_a_stuck_clock() {
        let mut ts = Timestamper::new(FixedClock(fixed()));
        let a = ts.next_key();
        let b = ts.next_key();
        let c = ts.next_key();
        assert_eq!(b, "2024-03-09 14:05:07.000043");
        assert!(a < b && b < c);
    }

    #[test]
    fn advancing_past_a_bumped_key() {
        let mut ts = Timestamper::new(FixedClock(fixed()));
        ts.advance_past("2024-03-09 14:05:07.000050");
        assert_eq!(ts.next_key(), "2024-03-09 14:05:07.000051");

        ts.advance_past("2024-03-09 14:05:07.000001");
        ts.advance_past("legacy");
        assert_eq!(ts.next_key(), "2024-03-09 14:05:07.000052");
    }

    #[test]
    fn following_key_rolls_over_seconds() {
        assert_eq!(
            following_key("2024-03-09 14:05:07.999999").as_deref(),
            Some("2024-03-09 14:05:08.000000")
        );
        assert_eq!(following_key("legacy"), None);
    }

    #[test]
    fn system_clock_is_sane() {
        let now = SystemClock::new().now();
        assert!(now.and_utc().timestamp() > 0);
    }
}
