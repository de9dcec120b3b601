// Ports for the feed and the wall clock
use crate::domain::feed::TimeSeries;
use async_trait::async_trait;
use chrono::NaiveDateTime;

#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// Fetch a parsed, column-deduplicated, timestamp-sorted snapshot of the feed
    async fn fetch_snapshot(&self) -> anyhow::Result<TimeSeries>;
}

pub trait Clock: Send + Sync {
    /// Current local wall-clock time (the feed carries no timezone)
    fn now(&self) -> NaiveDateTime;
}
