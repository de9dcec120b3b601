// CSV feed repository - fetches the generation export over HTTP or from disk
use crate::application::feed_repository::FeedRepository;
use crate::domain::feed::{TimeSeries, TimeSeriesRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

const TIMESTAMP_HEADERS: [&str; 4] = ["timestamp", "waktu", "jam", "time"];

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed has no header row")]
    MissingHeader,
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource {
    Http(String),
    File(PathBuf),
}

impl FeedSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            FeedSource::Http(source.to_string())
        } else {
            FeedSource::File(PathBuf::from(source))
        }
    }
}

/// Parse a CSV export into a time series.
///
/// The timestamp column is the first header named like a time column, or the
/// first column otherwise. Rows whose timestamp does not match `timestamp_format`
/// are dropped; duplicate headers keep their first occurrence.
pub fn parse_feed<R: Read>(reader: R, timestamp_format: &str) -> Result<TimeSeries, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(FeedError::MissingHeader);
    }

    let ts_idx = headers
        .iter()
        .position(|h| TIMESTAMP_HEADERS.contains(&h.to_lowercase().as_str()))
        .unwrap_or(0);
    let ts_name = headers[ts_idx].clone();

    let mut columns: Vec<(usize, String)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if idx == ts_idx || *name == ts_name || columns.iter().any(|(_, c)| c == name) {
            continue;
        }
        columns.push((idx, name.clone()));
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        let timestamp = record
            .get(ts_idx)
            .and_then(|raw| NaiveDateTime::parse_from_str(raw.trim(), timestamp_format).ok());

        let Some(timestamp) = timestamp else {
            dropped += 1;
            continue;
        };

        let cells: HashMap<String, String> = columns
            .iter()
            .filter_map(|(idx, name)| record.get(*idx).map(|v| (name.clone(), v.to_string())))
            .collect();
        rows.push(TimeSeriesRow::new(timestamp, cells));
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} feed rows with unparseable timestamps", dropped);
    }

    Ok(TimeSeries::new(
        columns.into_iter().map(|(_, name)| name).collect(),
        rows,
    ))
}

pub struct CsvFeedRepository {
    source: FeedSource,
    timestamp_format: String,
    ttl: Duration,
    client: reqwest::Client,
    cache: Mutex<Option<(Instant, TimeSeries)>>,
}

impl CsvFeedRepository {
    /// `request_timeout` bounds the whole HTTP exchange, so a stalled server fails the tick
    pub fn new(
        source: FeedSource,
        timestamp_format: String,
        ttl: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build feed HTTP client")?;

        Ok(Self {
            source,
            timestamp_format,
            ttl,
            client,
            cache: Mutex::new(None),
        })
    }

    async fn fetch_raw(&self) -> Result<Vec<u8>> {
        match &self.source {
            FeedSource::Http(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .context("Failed to send request to feed")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!("Feed request failed with status {}: {}", status, body);
                }

                let bytes = response.bytes().await.context("Failed to read feed body")?;
                Ok(bytes.to_vec())
            }
            FeedSource::File(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read feed file {}", path.display())),
        }
    }

    fn cached(&self) -> Option<TimeSeries> {
        let cache = self.cache.lock();
        cache
            .as_ref()
            .filter(|(fetched_at, _)| fetched_at.elapsed() < self.ttl)
            .map(|(_, series)| series.clone())
    }
}

#[async_trait]
impl FeedRepository for CsvFeedRepository {
    async fn fetch_snapshot(&self) -> Result<TimeSeries> {
        if let Some(series) = self.cached() {
            return Ok(series);
        }

        let raw = self.fetch_raw().await?;
        let series = parse_feed(raw.as_slice(), &self.timestamp_format)
            .context("Failed to parse feed CSV")?;

        if series.is_empty() {
            tracing::warn!("Feed snapshot contains no rows with a valid timestamp");
        }
        tracing::debug!(
            "Fetched feed: {} rows, {} units",
            series.len(),
            series.columns().len()
        );

        *self.cache.lock() = Some((Instant::now(), series.clone()));
        Ok(series)
    }
}
