use log::LevelFilter;
use std::time::Duration;
use tourney_api::client::DEFAULT_BASE_URL;

const DEFAULT_REFRESH_SECS: u64 = 30;

/// Which event the worker fetches and whether slots are teams or users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTarget {
    pub event_id: String,
    pub multiplayer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    pub api_url: String,
    pub event_id: Option<String>,
    pub multiplayer: bool,
    pub cookie: Option<String>,
    /// `None` disables the periodic refresh.
    pub refresh_interval: Option<Duration>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: None,
            api_url: DEFAULT_BASE_URL.to_string(),
            event_id: None,
            multiplayer: false,
            cookie: None,
            refresh_interval: Some(Duration::from_secs(DEFAULT_REFRESH_SECS)),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable source. Blank values count as unset.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let refresh_interval = match var("BRACKETS_REFRESH_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(0)) => None,
            Some(Ok(secs)) => Some(Duration::from_secs(secs)),
            Some(Err(_)) | None => defaults.refresh_interval,
        };

        Self {
            full_screen: false,
            log_level: var("BRACKETS_LOG").and_then(|v| v.parse::<LevelFilter>().ok()),
            api_url: var("BRACKETS_API_URL").unwrap_or(defaults.api_url),
            event_id: var("BRACKETS_EVENT_ID"),
            multiplayer: var("BRACKETS_MULTIPLAYER").is_some_and(|v| is_truthy(&v)),
            cookie: var("BRACKETS_COOKIE"),
            refresh_interval,
        }
    }

    pub fn target(&self) -> Option<EventTarget> {
        Some(EventTarget {
            event_id: self.event_id.clone()?,
            multiplayer: self.multiplayer,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
