// Monitor service - single owner of the alarm state, driven by refresh ticks
use crate::application::announcer::{AnnouncementSink, AUDIO_ALLOWED, STARTED, STOPPED};
use crate::application::events::{MonitorEvent, MonitorStatus};
use crate::application::feed_repository::{Clock, FeedRepository};
use crate::domain::alarm::{AlarmState, TickOutcome};
use crate::domain::feed::TimeSeries;
use crate::domain::monitor::{ConfigError, MonitorConfig};
use crate::domain::table::{RowMark, TableView};
use crate::domain::window::resolve;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// An empty monitored set means "every unit in the feed"
    pub config: MonitorConfig,
    /// Repeat the pending alert on every tick instead of only when it is raised
    pub repeat_announcement: bool,
}

struct Session {
    alarm: AlarmState,
    config: MonitorConfig,
    follow_all: bool,
    audio_permission: bool,
    available: Vec<String>,
    config_error: Option<ConfigError>,
    highlight: Option<NaiveDateTime>,
    last_tick: Option<NaiveDateTime>,
    table: TableView,
}

impl Session {
    fn status(&self) -> MonitorStatus {
        MonitorStatus {
            phase: self.alarm.phase(),
            running: self.alarm.running,
            pending_alarm: self.alarm.pending_alarm,
            acknowledged: self.alarm.acknowledged,
            alert_text: self.alarm.alert_text.clone(),
            last_alarm_timestamp: self.alarm.last_alarm_timestamp,
            audio_permission: self.audio_permission,
            threshold_mw: self.config.threshold_mw,
            monitored: self.config.monitored.clone(),
            available_count: self.available.len(),
            show_only_monitored: self.config.show_only_monitored,
            config_error: self.config_error.as_ref().map(ToString::to_string),
            highlight: self.highlight,
            last_tick: self.last_tick,
        }
    }
}

#[derive(Clone)]
pub struct MonitorService {
    repository: Arc<dyn FeedRepository>,
    clock: Arc<dyn Clock>,
    announcer: Arc<dyn AnnouncementSink>,
    events: broadcast::Sender<MonitorEvent>,
    repeat_announcement: bool,
    session: Arc<Mutex<Session>>,
}

impl MonitorService {
    pub fn new(
        repository: Arc<dyn FeedRepository>,
        clock: Arc<dyn Clock>,
        announcer: Arc<dyn AnnouncementSink>,
        events: broadcast::Sender<MonitorEvent>,
        options: MonitorOptions,
    ) -> Self {
        let follow_all = options.config.monitored.is_empty();
        let session = Session {
            alarm: AlarmState::default(),
            config: options.config,
            follow_all,
            audio_permission: false,
            available: Vec::new(),
            config_error: None,
            highlight: None,
            last_tick: None,
            table: TableView::default(),
        };

        Self {
            repository,
            clock,
            announcer,
            events,
            repeat_announcement: options.repeat_announcement,
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> MonitorStatus {
        self.session.lock().status()
    }

    pub fn table(&self) -> TableView {
        self.session.lock().table.clone()
    }

    pub fn start(&self) -> MonitorStatus {
        let (changed, status) = {
            let mut session = self.session.lock();
            let changed = session.alarm.start();
            (changed, session.status())
        };
        if changed {
            tracing::info!("Monitoring started");
        }
        self.feedback(&status, STARTED);
        self.publish(&status);
        status
    }

    pub fn stop(&self) -> MonitorStatus {
        let (changed, status) = {
            let mut session = self.session.lock();
            let changed = session.alarm.stop();
            session.table = TableView::default();
            session.highlight = None;
            (changed, session.status())
        };
        if changed {
            tracing::info!("Monitoring stopped, alarm state reset");
        }
        self.feedback(&status, STOPPED);
        self.publish(&status);
        status
    }

    pub fn acknowledge(&self) -> MonitorStatus {
        let (changed, status) = {
            let mut guard = self.session.lock();
            let session = &mut *guard;
            let changed = session.alarm.acknowledge();
            if changed {
                // Drop the blinking mark without waiting for the next tick
                let alarm_ts = session.alarm.last_alarm_timestamp;
                let highlight = session.highlight;
                for row in session.table.rows.iter_mut() {
                    if Some(row.timestamp) == alarm_ts {
                        row.mark = if Some(row.timestamp) == highlight {
                            RowMark::Current
                        } else {
                            RowMark::None
                        };
                    }
                }
                session.table.scroll_anchor = highlight;
            }
            (changed, session.status())
        };
        if changed {
            tracing::info!(last_alarm = ?status.last_alarm_timestamp, "Alarm acknowledged");
        } else {
            tracing::debug!("Acknowledge ignored, no pending alarm");
        }
        self.publish(&status);
        status
    }

    pub fn grant_audio(&self) -> MonitorStatus {
        let status = {
            let mut session = self.session.lock();
            session.audio_permission = true;
            session.status()
        };
        tracing::info!("Audio notifications allowed");
        self.feedback(&status, AUDIO_ALLOWED);
        self.publish(&status);
        status
    }

    /// Replace the monitor configuration. The previous one stays in force on error.
    pub fn update_config(&self, config: MonitorConfig) -> Result<MonitorStatus, ConfigError> {
        let status = {
            let mut session = self.session.lock();

            config.validate_standalone()?;
            if !session.available.is_empty() {
                config.validate(&session.available)?;
            }

            tracing::info!(
                threshold_mw = config.threshold_mw,
                monitored = config.monitored.len(),
                show_only_monitored = config.show_only_monitored,
                "Monitor configuration updated"
            );
            session.config = config;
            session.follow_all = false;
            session.config_error = None;
            session.status()
        };
        self.publish(&status);
        Ok(status)
    }

    /// Process one refresh tick against an already-fetched snapshot.
    /// While stopped only the feed metadata is recorded; no window or table is built.
    pub fn process_tick(&self, series: &TimeSeries, now: NaiveDateTime) -> TickOutcome {
        let (outcome, status) = {
            let mut guard = self.session.lock();
            let session = &mut *guard;

            session.available = series.columns().to_vec();
            session.last_tick = Some(now);
            if session.follow_all {
                session.config.monitored = session.available.clone();
            }

            if !session.alarm.running {
                session.highlight = None;
                session.table = TableView::default();
                (TickOutcome::NotEvaluated, session.status())
            } else if let Err(e) = session.config.validate(&session.available) {
                if session.config_error.as_ref() != Some(&e) {
                    tracing::warn!("Alarm evaluation blocked: {}", e);
                }
                session.config_error = Some(e);
                session.highlight = None;
                session.table = TableView::default();
                (TickOutcome::NotEvaluated, session.status())
            } else {
                session.config_error = None;
                let window = resolve(series, now);
                let outcome = session.alarm.evaluate(&window, &session.config);
                session.highlight = window.highlight;
                session.table = TableView::build(series, &window, &session.alarm, &session.config);
                (outcome, session.status())
            }
        };

        tracing::debug!(?now, ?outcome, rows = series.len(), "Processed tick");

        match &outcome {
            TickOutcome::Raised { timestamp, events } => {
                tracing::info!(
                    %timestamp,
                    swings = events.len(),
                    "Alarm raised: {}",
                    status.alert_text
                );
                self.alarm_voice(&status);
            }
            _ if self.repeat_announcement && status.pending_alarm => self.alarm_voice(&status),
            _ => {}
        }

        self.publish(&status);
        outcome
    }

    /// Fetch a fresh snapshot, read the clock and process one tick
    pub async fn refresh(&self) -> anyhow::Result<TickOutcome> {
        let series = self.repository.fetch_snapshot().await?;
        let now = self.clock.now();
        Ok(self.process_tick(&series, now))
    }

    /// Refresh once, giving up after `limit`. An abandoned fetch leaves state untouched.
    pub async fn tick_once(&self, limit: Duration) -> anyhow::Result<TickOutcome> {
        tokio::time::timeout(limit, self.refresh())
            .await
            .map_err(|_| anyhow::anyhow!("Feed did not respond within {:?}", limit))?
    }

    /// Fixed-interval refresh driver. Feed failures and slow feeds skip the tick and keep state.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = self.tick_once(interval).await {
                tracing::warn!("Skipping tick, feed unavailable: {:#}", e);
            }
        }
    }

    fn publish(&self, status: &MonitorStatus) {
        let _ = self.events.send(MonitorEvent::Tick {
            status: status.clone(),
        });
    }

    fn feedback(&self, status: &MonitorStatus, text: &str) {
        if status.audio_permission {
            self.announce(text);
        }
    }

    fn alarm_voice(&self, status: &MonitorStatus) {
        if status.audio_permission && status.running {
            self.announce(&status.alert_text);
        }
    }

    fn announce(&self, text: &str) {
        self.announcer.announce(text);
        let _ = self.events.send(MonitorEvent::Announce {
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alarm::AlarmPhase;
    use crate::domain::feed::test_support::*;
    use async_trait::async_trait;

    struct StaticFeed(Mutex<Option<TimeSeries>>);

    #[async_trait]
    impl FeedRepository for StaticFeed {
        async fn fetch_snapshot(&self) -> anyhow::Result<TimeSeries> {
            self.0
                .lock()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("feed offline"))
        }
    }

    struct FixedClock(Mutex<NaiveDateTime>);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock()
        }
    }

    #[derive(Default)]
    struct RecordingAnnouncer(Mutex<Vec<String>>);

    impl AnnouncementSink for RecordingAnnouncer {
        fn announce(&self, text: &str) {
            self.0.lock().push(text.to_string());
        }
    }

    struct Harness {
        service: MonitorService,
        feed: Arc<StaticFeed>,
        clock: Arc<FixedClock>,
        spoken: Arc<RecordingAnnouncer>,
    }

    fn feed() -> TimeSeries {
        series(
            &["UnitA", "UnitB"],
            vec![
                row(at(10, 0), &[("UnitA", "50.0"), ("UnitB", "10")]),
                row(at(10, 1), &[("UnitA", "53.2"), ("UnitB", "10")]),
                row(at(10, 2), &[("UnitA", "53.3"), ("UnitB", "10")]),
            ],
        )
    }

    fn harness(monitored: &[&str], repeat_announcement: bool) -> Harness {
        let feed = Arc::new(StaticFeed(Mutex::new(Some(feed()))));
        let clock = Arc::new(FixedClock(Mutex::new(at(10, 1))));
        let spoken = Arc::new(RecordingAnnouncer::default());
        let (events, _) = broadcast::channel(16);
        let service = MonitorService::new(
            feed.clone(),
            clock.clone(),
            spoken.clone(),
            events,
            MonitorOptions {
                config: MonitorConfig::new(
                    2.0,
                    monitored.iter().map(|m| m.to_string()).collect(),
                    false,
                ),
                repeat_announcement,
            },
        );
        Harness {
            service,
            feed,
            clock,
            spoken,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let h = harness(&["UnitA"], false);
        h.service.grant_audio();
        h.service.start();

        let outcome = h.service.refresh().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Raised { .. }));
        let status = h.service.status();
        assert_eq!(status.phase, AlarmPhase::RunningAlarmed);
        assert_eq!(status.alert_text, "UnitA naik ke 53.2 MW");
        assert_eq!(status.last_alarm_timestamp, Some(at(10, 1)));
        assert_eq!(h.service.table().rows[1].mark, RowMark::Alarm);

        // Same minute, a few seconds later
        *h.clock.0.lock() = at(10, 1) + chrono::Duration::seconds(40);
        assert_eq!(h.service.refresh().await.unwrap(), TickOutcome::AlreadyPending);

        let status = h.service.acknowledge();
        assert_eq!(status.phase, AlarmPhase::RunningClear);
        assert!(status.acknowledged);
        assert_eq!(status.last_alarm_timestamp, Some(at(10, 1)));
        assert_eq!(h.service.table().rows[1].mark, RowMark::Current);

        assert!(matches!(
            h.service.refresh().await.unwrap(),
            TickOutcome::Suppressed { .. }
        ));

        *h.clock.0.lock() = at(10, 2);
        assert_eq!(h.service.refresh().await.unwrap(), TickOutcome::Quiet);
        assert!(!h.service.status().pending_alarm);

        assert_eq!(
            *h.spoken.0.lock(),
            vec![
                AUDIO_ALLOWED.to_string(),
                STARTED.to_string(),
                "UnitA naik ke 53.2 MW".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_audio_without_permission() {
        let h = harness(&["UnitA"], false);
        h.service.start();
        h.service.refresh().await.unwrap();
        assert!(h.service.status().pending_alarm);
        assert!(h.spoken.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_repeat_announcement_while_pending() {
        let h = harness(&["UnitA"], true);
        h.service.grant_audio();
        h.service.start();
        h.service.refresh().await.unwrap();
        h.service.refresh().await.unwrap();

        let alarms = h
            .spoken
            .0
            .lock()
            .iter()
            .filter(|t| t.as_str() == "UnitA naik ke 53.2 MW")
            .count();
        assert_eq!(alarms, 2);
    }

    #[tokio::test]
    async fn test_feed_failure_preserves_state() {
        let h = harness(&["UnitA"], false);
        h.service.start();
        h.service.refresh().await.unwrap();
        let before = h.service.status();

        *h.feed.0.lock() = None;
        assert!(h.service.refresh().await.is_err());
        assert_eq!(h.service.status(), before);
    }

    #[tokio::test]
    async fn test_stop_resets_and_stopped_ticks_do_nothing() {
        let h = harness(&["UnitA"], false);
        h.service.start();
        h.service.refresh().await.unwrap();

        let status = h.service.stop();
        assert_eq!(status.phase, AlarmPhase::Stopped);
        assert!(!status.pending_alarm);
        assert!(status.acknowledged);
        assert!(status.alert_text.is_empty());
        assert_eq!(status.last_alarm_timestamp, None);

        assert_eq!(h.service.refresh().await.unwrap(), TickOutcome::NotEvaluated);
        assert!(!h.service.status().pending_alarm);
    }

    #[tokio::test]
    async fn test_follow_all_monitors_every_unit() {
        let h = harness(&[], false);
        h.service.start();
        h.service.refresh().await.unwrap();
        let status = h.service.status();
        assert_eq!(status.monitored, vec!["UnitA".to_string(), "UnitB".to_string()]);
        assert_eq!(status.available_count, 2);
        assert!(status.pending_alarm);
    }

    #[tokio::test]
    async fn test_unknown_series_blocks_evaluation() {
        let h = harness(&["UnitZ"], false);
        h.service.start();
        assert_eq!(h.service.refresh().await.unwrap(), TickOutcome::NotEvaluated);
        let status = h.service.status();
        assert!(status.config_error.is_some());
        assert!(!status.pending_alarm);
        assert!(h.service.table().rows.is_empty());
    }

    #[tokio::test]
    async fn test_update_config_rejects_invalid_and_keeps_previous() {
        let h = harness(&["UnitA"], false);
        h.service.refresh().await.unwrap();

        let err = h
            .service
            .update_config(MonitorConfig::new(2.0, vec![], false))
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyMonitoredSet);
        assert!(h
            .service
            .update_config(MonitorConfig::new(2.0, vec!["Nope".into()], false))
            .is_err());
        assert_eq!(h.service.status().monitored, vec!["UnitA".to_string()]);

        let status = h
            .service
            .update_config(MonitorConfig::new(5.0, vec!["UnitB".into()], true))
            .unwrap();
        assert_eq!(status.threshold_mw, 5.0);
        assert!(status.show_only_monitored);
    }

    #[tokio::test]
    async fn test_events_published_to_subscribers() {
        let h = harness(&["UnitA"], false);
        let mut rx = h.service.subscribe();
        h.service.grant_audio();
        h.service.start();
        h.service.refresh().await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(
            names,
            vec!["announce", "tick", "announce", "tick", "announce", "tick"]
        );
    }

    #[tokio::test]
    async fn test_actions_publish_status() {
        let h = harness(&["UnitA"], false);
        h.service.start();
        h.service.refresh().await.unwrap();
        let mut rx = h.service.subscribe();

        h.service.acknowledge();
        match rx.try_recv() {
            Ok(MonitorEvent::Tick { status }) => {
                assert!(!status.pending_alarm);
                assert!(status.acknowledged);
            }
            other => panic!("expected a status event, got {:?}", other),
        }

        h.service
            .update_config(MonitorConfig::new(4.0, vec!["UnitA".into()], false))
            .unwrap();
        match rx.try_recv() {
            Ok(MonitorEvent::Tick { status }) => assert_eq!(status.threshold_mw, 4.0),
            other => panic!("expected a status event, got {:?}", other),
        }

        // Rejected updates change nothing and publish nothing
        assert!(h
            .service
            .update_config(MonitorConfig::new(-1.0, vec!["UnitA".into()], false))
            .is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stopped_ticks_render_nothing() {
        let h = harness(&["UnitA"], false);
        h.service.start();
        h.service.refresh().await.unwrap();
        assert!(!h.service.table().rows.is_empty());

        h.service.stop();
        assert_eq!(h.service.refresh().await.unwrap(), TickOutcome::NotEvaluated);

        let status = h.service.status();
        assert_eq!(status.highlight, None);
        assert_eq!(status.last_tick, Some(at(10, 1)));
        assert_eq!(status.available_count, 2);
        assert!(h.service.table().rows.is_empty());
        assert_eq!(h.service.table().scroll_anchor, None);
    }

    struct HungFeed;

    #[async_trait]
    impl FeedRepository for HungFeed {
        async fn fetch_snapshot(&self) -> anyhow::Result<TimeSeries> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_hung_feed_skips_tick() {
        let (events, _) = broadcast::channel(8);
        let service = MonitorService::new(
            Arc::new(HungFeed),
            Arc::new(FixedClock(Mutex::new(at(10, 1)))),
            Arc::new(RecordingAnnouncer::default()),
            events,
            MonitorOptions {
                config: MonitorConfig::new(2.0, vec!["UnitA".into()], false),
                repeat_announcement: false,
            },
        );
        service.start();
        let before = service.status();

        let result = service.tick_once(Duration::from_millis(50)).await;
        assert!(result.is_err());
        assert_eq!(service.status(), before);
        assert_eq!(service.status().last_tick, None);
    }
}
