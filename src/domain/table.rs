// Table view model - what the dashboard renders for one tick
use super::alarm::AlarmState;
use super::feed::TimeSeries;
use super::monitor::MonitorConfig;
use super::window::FeedWindow;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowMark {
    None,
    /// Row that "now" resolved to
    Current,
    /// Row that raised the pending alarm
    Alarm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    pub series: String,
    pub text: String,
    pub monitored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub timestamp: NaiveDateTime,
    pub label: String,
    pub mark: RowMark,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<RowView>,
    /// Row the client should scroll into view
    pub scroll_anchor: Option<NaiveDateTime>,
}

impl TableView {
    pub fn build(
        series: &TimeSeries,
        window: &FeedWindow<'_>,
        state: &AlarmState,
        config: &MonitorConfig,
    ) -> Self {
        let columns: Vec<String> = if config.show_only_monitored {
            series
                .columns()
                .iter()
                .filter(|c| config.is_monitored(c))
                .cloned()
                .collect()
        } else {
            series.columns().to_vec()
        };

        // The alarm mark stays on the row that raised it, even after "now" moves on
        let alarm_row = state
            .pending_alarm
            .then_some(state.last_alarm_timestamp)
            .flatten();

        let rows = series
            .rows()
            .iter()
            .map(|row| {
                let mark = if Some(row.timestamp) == alarm_row {
                    RowMark::Alarm
                } else if Some(row.timestamp) == window.highlight {
                    RowMark::Current
                } else {
                    RowMark::None
                };

                let cells = columns
                    .iter()
                    .map(|c| CellView {
                        series: c.clone(),
                        text: row.raw(c).unwrap_or_default().to_string(),
                        monitored: config.is_monitored(c),
                    })
                    .collect();

                RowView {
                    timestamp: row.timestamp,
                    label: row.timestamp.format("%H:%M").to_string(),
                    mark,
                    cells,
                }
            })
            .collect();

        Self {
            columns,
            rows,
            scroll_anchor: alarm_row.or(window.highlight),
        }
    }
}
