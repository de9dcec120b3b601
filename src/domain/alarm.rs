// Alarm domain model - swing detection and the acknowledge lifecycle
use super::feed::TimeSeriesRow;
use super::monitor::MonitorConfig;
use super::window::FeedWindow;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmPhase {
    Stopped,
    RunningClear,
    RunningAlarmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn phrase(self) -> &'static str {
        match self {
            Direction::Up => "naik ke",
            Direction::Down => "turun ke",
        }
    }
}

/// A monitored series that moved by at least the threshold between two rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwingEvent {
    pub series: String,
    pub direction: Direction,
    pub delta: f64,
    pub value: f64,
}

impl SwingEvent {
    pub fn describe(&self) -> String {
        format!("{} {} {:.1} MW", self.series, self.direction.phrase(), self.value)
    }
}

/// Compare two rows for every monitored series, in configured order.
/// Series with a missing or non-numeric reading in either row are skipped.
pub fn detect_swings(
    prev: &TimeSeriesRow,
    curr: &TimeSeriesRow,
    config: &MonitorConfig,
) -> Vec<SwingEvent> {
    config
        .monitored
        .iter()
        .filter_map(|series| {
            let before = prev.value(series)?;
            let after = curr.value(series)?;
            let delta = after - before;

            (delta.abs() >= config.threshold_mw).then(|| SwingEvent {
                series: series.clone(),
                direction: if delta > 0.0 { Direction::Up } else { Direction::Down },
                delta,
                value: after,
            })
        })
        .collect()
}

pub fn combine_alert_text(events: &[SwingEvent]) -> String {
    events
        .iter()
        .map(SwingEvent::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

/// What a single tick did to the alarm state
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Monitoring stopped or no comparable row pair
    NotEvaluated,
    /// Rows compared, nothing crossed the threshold
    Quiet,
    /// Swings found, but this timestamp already raised an alarm
    Suppressed { timestamp: NaiveDateTime },
    /// An earlier alarm still awaits acknowledgement
    AlreadyPending,
    Raised {
        timestamp: NaiveDateTime,
        events: Vec<SwingEvent>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmState {
    pub running: bool,
    pub pending_alarm: bool,
    pub acknowledged: bool,
    pub last_alarm_timestamp: Option<NaiveDateTime>,
    pub alert_text: String,
}

impl Default for AlarmState {
    fn default() -> Self {
        Self {
            running: false,
            pending_alarm: false,
            acknowledged: true,
            last_alarm_timestamp: None,
            alert_text: String::new(),
        }
    }
}

impl AlarmState {
    pub fn phase(&self) -> AlarmPhase {
        match (self.running, self.pending_alarm) {
            (false, _) => AlarmPhase::Stopped,
            (true, false) => AlarmPhase::RunningClear,
            (true, true) => AlarmPhase::RunningAlarmed,
        }
    }

    /// Returns false when monitoring was already running
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.pending_alarm = false;
        self.acknowledged = false;
        self.alert_text.clear();
        true
    }

    /// Returns false when already stopped and at rest
    pub fn stop(&mut self) -> bool {
        let rest = Self::default();
        if *self == rest {
            return false;
        }
        *self = rest;
        true
    }

    /// Returns false when no alarm was pending
    pub fn acknowledge(&mut self) -> bool {
        if !self.pending_alarm {
            return false;
        }
        self.pending_alarm = false;
        self.acknowledged = true;
        true
    }

    /// Run swing detection for one tick and apply the raise rule.
    pub fn evaluate(&mut self, window: &FeedWindow<'_>, config: &MonitorConfig) -> TickOutcome {
        if !self.running {
            return TickOutcome::NotEvaluated;
        }
        let Some((prev, curr)) = window.comparable() else {
            return TickOutcome::NotEvaluated;
        };
        if self.pending_alarm {
            return TickOutcome::AlreadyPending;
        }

        let events = detect_swings(prev, curr, config);
        if events.is_empty() {
            return TickOutcome::Quiet;
        }
        if self.last_alarm_timestamp == Some(curr.timestamp) {
            return TickOutcome::Suppressed {
                timestamp: curr.timestamp,
            };
        }

        self.pending_alarm = true;
        self.acknowledged = false;
        self.alert_text = combine_alert_text(&events);
        self.last_alarm_timestamp = Some(curr.timestamp);

        TickOutcome::Raised {
            timestamp: curr.timestamp,
            events,
        }
    }
}
