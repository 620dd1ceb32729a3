use crate::clock::{Clock, DateTime, NaiveDate, Utc};
use crate::record::Record;
use crate::store;
use std::fs;

pub fn do_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn load_data(file: &str) -> String {
    fs::read_to_string(format!("tests/data/{file}.txt")).expect("could not find test data")
}

pub fn load_records(file: &str) -> Vec<Record> {
    store::parse_str(&load_data(file)).expect("could not parse test data")
}

#[derive(Debug)]
pub struct FrozenClock {
    datetime: DateTime<Utc>,
}

impl FrozenClock {
    pub fn new(datetime: DateTime<Utc>) -> Self {
        FrozenClock { datetime }
    }
}

impl Default for FrozenClock {
    fn default() -> Self {
        let datetime = DateTime::parse_from_rfc3339("2025-05-23T10:13:00-07:00")
            .expect("invalid date supplied")
            .with_timezone(&Utc);
        Self::new(datetime)
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.datetime
    }

    // The local time zone differs between machines.
    fn today(&self) -> NaiveDate {
        self.datetime.date_naive()
    }
}
