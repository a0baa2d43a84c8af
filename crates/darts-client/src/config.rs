use std::path::Path;
use std::time::Duration;

use glam::DVec2;
use serde::Deserialize;

use darts_core::board::{
    BoardGeometry, GeometryError, LOGICAL_BOARD_SIZE, RingRadii, STANDARD_NUMBERS,
};
use darts_core::notify::DEFAULT_NOTICE_DURATION;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "darts.toml";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    ZeroInterval(&'static str),
    ZeroAttempts,
    InvalidBoard(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::ZeroInterval(name) => write!(f, "{name} must be > 0"),
            Self::ZeroAttempts => write!(f, "reconnect.max_attempts must be > 0"),
            Self::InvalidBoard(e) => write!(f, "invalid board: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<GeometryError> for ConfigError {
    fn from(e: GeometryError) -> Self {
        Self::InvalidBoard(e.to_string())
    }
}

/// Top-level client configuration, loaded from `darts.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub timers: TimersConfig,
    pub reconnect: ReconnectConfig,
    pub board: BoardConfig,
    pub ui: UiConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:5000/ws".to_string(),
            timers: TimersConfig::default(),
            reconnect: ReconnectConfig::default(),
            board: BoardConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

/// Periodic timer intervals, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimersConfig {
    pub clock_tick_ms: u64,
    /// Full-state poll that corrects local clock drift.
    pub state_poll_ms: u64,
    pub heartbeat_ms: u64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            clock_tick_ms: 1000,
            state_poll_ms: 2000,
            heartbeat_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 1000,
        }
    }
}

/// Board placement in canvas (logical) pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub center_x: f64,
    pub center_y: f64,
    pub logical_width: f64,
    pub logical_height: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            center_x: LOGICAL_BOARD_SIZE / 2.0,
            center_y: LOGICAL_BOARD_SIZE / 2.0,
            logical_width: LOGICAL_BOARD_SIZE,
            logical_height: LOGICAL_BOARD_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Timer is shown as a warning at or below this many seconds.
    pub timer_warning_secs: u32,
    pub notice_duration_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            timer_warning_secs: 5,
            notice_duration_ms: DEFAULT_NOTICE_DURATION.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load config from `path` if it exists, then apply `DARTS_*` env overrides.
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded client configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "{e}, using defaults");
                    Self::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DARTS_SERVER_URL")
            && !url.is_empty()
        {
            self.server_url = url;
        }
        if let Some(val) = lookup("DARTS_STATE_POLL_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.timers.state_poll_ms = n;
        }
        if let Some(val) = lookup("DARTS_HEARTBEAT_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.timers.heartbeat_ms = n;
        }
        if let Some(val) = lookup("DARTS_RECONNECT_ATTEMPTS")
            && let Ok(n) = val.parse::<u32>()
        {
            self.reconnect.max_attempts = n;
        }
        if let Some(val) = lookup("DARTS_RECONNECT_DELAY_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.reconnect.delay_ms = n;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("timers.clock_tick_ms", self.timers.clock_tick_ms),
            ("timers.state_poll_ms", self.timers.state_poll_ms),
            ("timers.heartbeat_ms", self.timers.heartbeat_ms),
            ("reconnect.delay_ms", self.reconnect.delay_ms),
            ("ui.notice_duration_ms", self.ui.notice_duration_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        if self.reconnect.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !(self.board.logical_width > 0.0 && self.board.logical_height > 0.0) {
            return Err(ConfigError::InvalidBoard(format!(
                "logical size {}x{} must be positive",
                self.board.logical_width, self.board.logical_height
            )));
        }
        self.board_geometry()?;
        Ok(())
    }

    pub fn board_geometry(&self) -> Result<BoardGeometry, ConfigError> {
        let center = DVec2::new(self.board.center_x, self.board.center_y);
        Ok(BoardGeometry::new(
            center,
            RingRadii::STANDARD,
            STANDARD_NUMBERS,
        )?)
    }

    pub fn logical_size(&self) -> DVec2 {
        DVec2::new(self.board.logical_width, self.board.logical_height)
    }

    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.timers.clock_tick_ms)
    }

    pub fn state_poll(&self) -> Duration {
        Duration::from_millis(self.timers.state_poll_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.timers.heartbeat_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect.delay_ms)
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.ui.notice_duration_ms)
    }
}
