// Monitor configuration - what to watch and how sensitive to be
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sensitivity threshold must be a positive number of MW, got {0}")]
    NonPositiveThreshold(f64),
    #[error("select at least one unit to monitor")]
    EmptyMonitoredSet,
    #[error("unknown unit(s) in monitored set: {}", .0.join(", "))]
    UnknownSeries(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub threshold_mw: f64,
    pub monitored: Vec<String>,
    #[serde(default)]
    pub show_only_monitored: bool,
}

impl MonitorConfig {
    pub fn new(threshold_mw: f64, monitored: Vec<String>, show_only_monitored: bool) -> Self {
        Self {
            threshold_mw,
            monitored,
            show_only_monitored,
        }
    }

    /// Checks that hold regardless of the feed contents
    pub fn validate_standalone(&self) -> Result<(), ConfigError> {
        if !(self.threshold_mw.is_finite() && self.threshold_mw > 0.0) {
            return Err(ConfigError::NonPositiveThreshold(self.threshold_mw));
        }
        if self.monitored.is_empty() {
            return Err(ConfigError::EmptyMonitoredSet);
        }
        Ok(())
    }

    /// Full validation against the columns the feed actually offers
    pub fn validate(&self, available: &[String]) -> Result<(), ConfigError> {
        self.validate_standalone()?;

        let unknown: Vec<String> = self
            .monitored
            .iter()
            .filter(|m| !available.contains(m))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownSeries(unknown));
        }
        Ok(())
    }

    pub fn is_monitored(&self, series: &str) -> bool {
        self.monitored.iter().any(|m| m == series)
    }
}
