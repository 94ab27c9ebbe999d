//! Startup configuration.
//!
//! Every setting can come from a command-line flag or an environment variable.
//! `--query` additionally accepts the query string of a browser-source URL
//! (`duration=2&actionId=...&paddingPercent=0.9`), whose values override the
//! flags. Keys in the query string use their camelCase spelling.

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use thiserror::Error;

use crate::{
    action::ActionTarget,
    fit::{FitConfig, FitError, DEFAULT_MAX_SCALE, DEFAULT_PADDING_PERCENT},
    glyphs::{BlockFont, DEFAULT_FONT_SIZE},
    overlay::OverlaySettings,
    streamerbot::{
        ClientOptions, DEFAULT_ADDRESS, DEFAULT_ENDPOINT, DEFAULT_PORT, DEFAULT_RECONNECT_DELAY,
    },
};

/// Countdown length in minutes when nothing is configured.
pub const DEFAULT_DURATION_MINUTES: f64 = 5.0;

/// Tick interval when nothing is configured.
pub const DEFAULT_TICK_MS: u64 = 1;

/// Foreground colour when nothing is configured.
pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// Problems found while resolving the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A query-string value could not be parsed for its key.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Query-string key.
        key: String,
        /// Offending value.
        value: String,
    },
    /// The colour is neither `#RGB`, `#RRGGBB`, nor a plain name or number.
    #[error("invalid colour {0:?}")]
    InvalidColor(String),
    /// The container size is not `WIDTHxHEIGHT` with both parts above zero.
    #[error("invalid container size {0:?}, expected WIDTHxHEIGHT")]
    InvalidContainer(String),
    /// The fit parameters are out of range.
    #[error(transparent)]
    Fit(#[from] FitError),
}

/// A fixed container size in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSize {
    /// Columns.
    pub width: u16,
    /// Rows.
    pub height: u16,
}

impl FromStr for ContainerSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidContainer(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u16 = w.trim().parse().map_err(|_| invalid())?;
        let height: u16 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for ContainerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn parse_container(s: &str) -> Result<ContainerSize, String> {
    s.parse().map_err(|err: ConfigError| err.to_string())
}

/// Command-line and environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scene-countdown",
    version,
    about = "Countdown overlay that fires a Streamer.bot action when it reaches zero"
)]
pub struct Config {
    /// Streamer.bot WebSocket server host.
    #[arg(long, env = "SCENE_COUNTDOWN_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Streamer.bot WebSocket server port.
    #[arg(long, env = "SCENE_COUNTDOWN_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Streamer.bot WebSocket password, if authentication is enabled.
    #[arg(
        long,
        env = "SCENE_COUNTDOWN_PASSWORD",
        default_value = "",
        hide_env_values = true
    )]
    pub password: String,

    /// Streamer.bot WebSocket endpoint path.
    #[arg(long, env = "SCENE_COUNTDOWN_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Milliseconds between Streamer.bot reconnection attempts; 0 disables them.
    #[arg(
        long,
        env = "SCENE_COUNTDOWN_RECONNECT_MS",
        default_value_t = DEFAULT_RECONNECT_DELAY.as_millis() as u64
    )]
    pub reconnect_ms: u64,

    /// Countdown length in minutes; fractions allowed, negatives count as zero.
    #[arg(
        long,
        env = "SCENE_COUNTDOWN_DURATION",
        default_value_t = DEFAULT_DURATION_MINUTES,
        allow_negative_numbers = true
    )]
    pub duration: f64,

    /// Name of the action to run at zero (matched case-insensitively).
    #[arg(long, env = "SCENE_COUNTDOWN_ACTION")]
    pub action: Option<String>,

    /// Identifier of the action to run at zero; takes precedence over --action.
    #[arg(long, env = "SCENE_COUNTDOWN_ACTION_ID")]
    pub action_id: Option<String>,

    /// Fraction of the container the countdown may occupy.
    #[arg(long, env = "SCENE_COUNTDOWN_PADDING_PERCENT", default_value_t = DEFAULT_PADDING_PERCENT)]
    pub padding_percent: f64,

    /// Largest scale factor; values above 1 have no effect.
    #[arg(long, env = "SCENE_COUNTDOWN_MAX_SCALE", default_value_t = DEFAULT_MAX_SCALE)]
    pub max_scale: f64,

    /// Tick interval in milliseconds.
    #[arg(long, env = "SCENE_COUNTDOWN_TICK_MS", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Columns per glyph pixel at full size.
    #[arg(long, env = "SCENE_COUNTDOWN_FONT_SIZE", default_value_t = DEFAULT_FONT_SIZE)]
    pub font_size: u16,

    /// Foreground colour, e.g. `#FFFFFF`.
    #[arg(long, env = "SCENE_COUNTDOWN_COLOR", default_value = DEFAULT_COLOR)]
    pub color: String,

    /// Fixed container size (`WIDTHxHEIGHT`); follows the terminal when unset.
    #[arg(long, env = "SCENE_COUNTDOWN_CONTAINER", value_parser = parse_container)]
    pub container: Option<ContainerSize>,

    /// Browser-source style query string; its values override the flags.
    #[arg(long, env = "SCENE_COUNTDOWN_QUERY")]
    pub query: Option<String>,

    /// Append logs to this file. Without it logs are discarded.
    #[arg(long, env = "SCENE_COUNTDOWN_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn validate_color(color: &str) -> Result<(), ConfigError> {
    let color = color.trim();
    let valid = match color.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !color.is_empty() && color.chars().all(|c| c.is_ascii_alphanumeric()),
    };
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidColor(color.to_string()))
    }
}

impl Config {
    /// Parses the process arguments and environment, then applies `--query`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a query-string value or the colour is invalid.
    /// Flag errors are reported by clap, which exits the process.
    pub fn load() -> Result<Self, ConfigError> {
        Self::parse().resolve()
    }

    /// Applies the `--query` string, if any, and validates the result.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        if let Some(query) = self.query.take() {
            self.apply_query(&query)?;
        }
        validate_color(&self.color)?;
        Ok(self)
    }

    /// Overrides settings from a URL query string. Empty values are ignored and
    /// unknown keys are skipped.
    pub fn apply_query(&mut self, query: &str) -> Result<(), ConfigError> {
        let query = query.trim();
        let query = query.split_once('?').map_or(query, |(_, q)| q);

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_ref() {
                "address" => self.address = value.into_owned(),
                "port" => self.port = parse_value(&key, &value)?,
                "password" => self.password = value.into_owned(),
                "endpoint" => self.endpoint = value.into_owned(),
                "reconnectMs" => self.reconnect_ms = parse_value(&key, &value)?,
                "duration" => self.duration = parse_value(&key, &value)?,
                "action" => self.action = Some(value.into_owned()),
                "actionId" => self.action_id = Some(value.into_owned()),
                "paddingPercent" => self.padding_percent = parse_value(&key, &value)?,
                "maxScale" => self.max_scale = parse_value(&key, &value)?,
                "tickMs" => self.tick_ms = parse_value(&key, &value)?,
                "fontSize" => self.font_size = parse_value(&key, &value)?,
                "color" => self.color = value.into_owned(),
                "container" => self.container = Some(value.parse()?),
                _ => {}
            }
        }
        Ok(())
    }

    /// Countdown length, rounded to the millisecond and floored at zero.
    pub fn duration_ms(&self) -> u64 {
        let minutes = if self.duration.is_finite() {
            self.duration.max(0.0)
        } else {
            0.0
        };
        (minutes * 60_000.0).round() as u64
    }

    /// Tick interval with zero raised to 1.
    pub fn effective_tick_ms(&self) -> u64 {
        self.tick_ms.max(1)
    }

    /// A one-millisecond tick keeps the event loop permanently busy. It stays
    /// the default but is worth a warning.
    pub fn tick_is_suspect(&self) -> bool {
        self.effective_tick_ms() <= 1
    }

    /// Action to run at zero.
    pub fn target(&self) -> Option<ActionTarget> {
        ActionTarget::from_parts(self.action_id.as_deref(), self.action.as_deref())
    }

    /// Options for the Streamer.bot client.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            host: self.address.clone(),
            port: self.port,
            endpoint: self.endpoint.clone(),
            password: self.password.clone(),
            reconnect_delay: (self.reconnect_ms > 0)
                .then(|| Duration::from_millis(self.reconnect_ms)),
        }
    }

    /// Settings for the overlay controller.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Fit`] when `max_scale` is not a positive number.
    pub fn overlay_settings(&self) -> Result<OverlaySettings, ConfigError> {
        Ok(OverlaySettings {
            fit: FitConfig::new(self.padding_percent, self.max_scale)?,
            duration_ms: self.duration_ms(),
            tick_ms: self.effective_tick_ms(),
            target: self.target(),
            font: BlockFont::new(self.font_size),
            color: self.color.trim().to_string(),
            container: self.container,
        })
    }
}
