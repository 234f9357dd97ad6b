//! Client configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`); command-line flags in the binary override them.

use std::time::Duration;

use crate::domain::LineFormat;
use crate::error::ChannelError;

/// Format of the log output written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level client configuration.
///
/// Loaded once at startup via [`ChannelConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Game page URL the session starts from, if set in the environment.
    pub page_url: Option<String>,

    /// How inbound payloads are rendered.
    pub line_format: LineFormat,

    /// Seconds allowed for the WebSocket handshake.
    pub connect_timeout_secs: u64,

    /// `Cookie` header value carrying the player's game session.
    pub cookie: Option<String>,

    /// Activations that may queue ahead of the session loop.
    pub activation_buffer: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            page_url: None,
            line_format: LineFormat::Plain,
            connect_timeout_secs: 45,
            cookie: None,
            activation_buffer: 32,
            log_format: LogFormat::Text,
        }
    }
}

impl ChannelConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Config`] if `LIVE_CHANNEL_LINE_FORMAT` or
    /// `LIVE_CHANNEL_LOG_FORMAT` is set to an unknown value.
    pub fn from_env() -> Result<Self, ChannelError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ChannelConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChannelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let page_url = lookup("LIVE_CHANNEL_PAGE_URL").filter(|v| !v.trim().is_empty());
        let cookie = lookup("LIVE_CHANNEL_COOKIE").filter(|v| !v.trim().is_empty());

        let line_format = match lookup("LIVE_CHANNEL_LINE_FORMAT") {
            Some(v) => v.parse()?,
            None => defaults.line_format,
        };

        let log_format = match lookup("LIVE_CHANNEL_LOG_FORMAT").as_deref() {
            None => defaults.log_format,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(other) => {
                return Err(ChannelError::Config(format!(
                    "unknown log format '{other}' (expected text or json)"
                )));
            }
        };

        let connect_timeout_secs = parse_or(
            lookup("LIVE_CHANNEL_CONNECT_TIMEOUT_SECS"),
            defaults.connect_timeout_secs,
        );
        let activation_buffer = parse_or(
            lookup("LIVE_CHANNEL_ACTIVATION_BUFFER"),
            defaults.activation_buffer,
        );

        Ok(Self {
            page_url,
            line_format,
            connect_timeout_secs,
            cookie,
            activation_buffer,
            log_format,
        })
    }

    /// Handshake timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Parses `value` as `T`, returning `default` on missing or invalid values.
fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
