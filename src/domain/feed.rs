// Feed domain model - generation readings per minute
use chrono::{NaiveDateTime, Timelike};
use std::collections::{HashMap, HashSet};

/// Truncate a timestamp to the start of its minute
pub fn floor_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub timestamp: NaiveDateTime,
    cells: HashMap<String, String>,
}

impl TimeSeriesRow {
    pub fn new(timestamp: NaiveDateTime, cells: HashMap<String, String>) -> Self {
        Self {
            timestamp: floor_to_minute(timestamp),
            cells,
        }
    }

    /// Raw cell text as it appeared in the feed
    pub fn raw(&self, series: &str) -> Option<&str> {
        self.cells.get(series).map(String::as_str)
    }

    /// Numeric reading for a series; `None` when missing, blank or not a finite number
    pub fn value(&self, series: &str) -> Option<f64> {
        self.raw(series)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    columns: Vec<String>,
    rows: Vec<TimeSeriesRow>,
}

impl TimeSeries {
    /// Build a series: columns are deduplicated (first occurrence wins) and rows
    /// are stably sorted by timestamp, so equal timestamps keep feed order.
    pub fn new(columns: Vec<String>, mut rows: Vec<TimeSeriesRow>) -> Self {
        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();

        rows.sort_by_key(|r| r.timestamp);

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
