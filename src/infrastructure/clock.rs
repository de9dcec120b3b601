// Wall clock in local time, matching the feed's timezone-less timestamps
use crate::application::feed_repository::Clock;
use chrono::{Local, NaiveDateTime};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
