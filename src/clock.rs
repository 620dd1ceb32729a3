//! All things time-related.

pub use chrono::{DateTime, Local, NaiveDate, Utc};

/// Tells time and returns the time.
///
/// Generally you will want to retrieve time using [`SystemClock`],
/// but in tests you may want to implement a `Clock` with a fixed time.
pub trait Clock {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;

    /// Today's date in the local time zone.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// Interacts with the system clock to get the current time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    mod clock {
        use super::super::*;
        use std::ops::Sub;

        #[test]
        fn it_returns_the_system_time() {
            let clock = SystemClock;
            let delta = Utc::now().sub(clock.now());
            let secs = delta.num_seconds();
            assert_eq!(secs, 0);
        }

        #[test]
        fn it_returns_the_local_date() {
            let clock = SystemClock;
            let before = Local::now().date_naive();
            let today = clock.today();
            let after = Local::now().date_naive();
            assert!(before <= today && today <= after);
        }
    }

    mod frozen_clock {
        use super::super::*;
        use crate::test_utils::FrozenClock;

        #[test]
        fn it_stays_frozen() {
            let datetime = DateTime::parse_from_rfc3339("2014-03-09T23:30:00-07:00")
                .expect("could not parse timestamp")
                .with_timezone(&Utc);
            let clock = FrozenClock::new(datetime);
            assert_eq!(clock.now(), datetime);
            assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2014, 3, 10).unwrap());
        }
    }
}
