// Events pushed to dashboard subscribers
use crate::domain::alarm::AlarmPhase;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Banner and control-panel summary of the monitor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatus {
    pub phase: AlarmPhase,
    pub running: bool,
    pub pending_alarm: bool,
    pub acknowledged: bool,
    pub alert_text: String,
    pub last_alarm_timestamp: Option<NaiveDateTime>,
    pub audio_permission: bool,
    pub threshold_mw: f64,
    pub monitored: Vec<String>,
    pub available_count: usize,
    pub show_only_monitored: bool,
    pub config_error: Option<String>,
    pub highlight: Option<NaiveDateTime>,
    pub last_tick: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    Tick { status: MonitorStatus },
    Announce { text: String },
}

impl MonitorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::Tick { .. } => "tick",
            MonitorEvent::Announce { .. } => "announce",
        }
    }
}
