use crate::application::monitor_service::MonitorOptions;
use crate::domain::monitor::MonitorConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorSettings {
    #[serde(default)]
    pub server: ServerSettings,
    pub feed: FeedSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub alarm: AlarmSettings,
    #[serde(default)]
    pub audio: AudioSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    /// http(s) URL or local path of the CSV export
    pub source: String,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorSection {
    #[serde(default = "default_threshold_mw")]
    pub threshold_mw: f64,
    /// Empty means every unit in the feed
    #[serde(default)]
    pub monitored: Vec<String>,
    #[serde(default)]
    pub show_only_monitored: bool,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            threshold_mw: default_threshold_mw(),
            monitored: Vec::new(),
            show_only_monitored: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AlarmSettings {
    #[serde(default)]
    pub repeat_announcement: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AudioSettings {
    /// Speech command, the announcement text is appended as the last argument.
    /// Empty logs announcements only; browsers speak them from the event stream.
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timestamp_format() -> String {
    "%m/%d/%Y %I:%M:%S %p".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_interval_secs() -> u64 {
    10
}

fn default_threshold_mw() -> f64 {
    2.0
}

impl MonitorSettings {
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            config: MonitorConfig::new(
                self.monitor.threshold_mw,
                self.monitor.monitored.clone(),
                self.monitor.show_only_monitored,
            ),
            repeat_announcement: self.alarm.repeat_announcement,
        }
    }
}

/// Load `config/monitor.*`, overridden by `SWING__SECTION__KEY` environment variables
pub fn load_monitor_settings() -> anyhow::Result<MonitorSettings> {
    load_from(
        config::File::with_name("config/monitor").required(false),
        environment(),
    )
}

/// `SWING__MONITOR__MONITORED` and `SWING__AUDIO__COMMAND` are comma separated lists
fn environment() -> config::Environment {
    config::Environment::with_prefix("SWING")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("monitor.monitored")
        .with_list_parse_key("audio.command")
        .try_parsing(true)
}

fn load_from<S>(file: S, env: config::Environment) -> anyhow::Result<MonitorSettings>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(env)
        .build()?;

    let settings: MonitorSettings = settings.try_deserialize()?;
    if !(settings.monitor.threshold_mw.is_finite() && settings.monitor.threshold_mw > 0.0) {
        anyhow::bail!(
            "monitor.threshold_mw must be positive, got {}",
            settings.monitor.threshold_mw
        );
    }
    Ok(settings)
}
