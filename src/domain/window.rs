// Feed window - locates the "current" row and its predecessor
use super::feed::{floor_to_minute, TimeSeries, TimeSeriesRow};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedWindow<'a> {
    pub prev: Option<&'a TimeSeriesRow>,
    pub curr: Option<&'a TimeSeriesRow>,
    pub highlight: Option<NaiveDateTime>,
}

impl<'a> FeedWindow<'a> {
    /// Both rows are present, so a delta can be computed
    pub fn comparable(&self) -> Option<(&'a TimeSeriesRow, &'a TimeSeriesRow)> {
        self.prev.zip(self.curr)
    }
}

/// Resolve the window for `now`: the earliest row at or after the current minute,
/// plus the row immediately before it.
pub fn resolve(series: &TimeSeries, now: NaiveDateTime) -> FeedWindow<'_> {
    let now = floor_to_minute(now);
    let rows = series.rows();
    let idx = rows.partition_point(|r| r.timestamp < now);

    match rows.get(idx) {
        Some(curr) => FeedWindow {
            prev: idx.checked_sub(1).and_then(|i| rows.get(i)),
            curr: Some(curr),
            highlight: Some(curr.timestamp),
        },
        None => FeedWindow::default(),
    }
}
