//! Client error types with process exit code mapping.
//!
//! [`ChannelError`] is the central error type for the client. Each variant
//! maps to a `sysexits`-style process exit code so the binary can report
//! failures to the calling shell.

use tokio_tungstenite::tungstenite;

use crate::channel::ChannelState;

/// Client-side error enum with exit code mapping.
///
/// # Exit Codes
///
/// | Code | Category        | Variants                                   |
/// |------|-----------------|--------------------------------------------|
/// | 64   | Usage           | `InvalidPageUrl`, `UnsupportedScheme`      |
/// | 65   | Data            | `MalformedPath`                            |
/// | 69   | Unavailable     | `Connect`, `ConnectTimeout`                |
/// | 70   | Software        | `NotOpen`                                  |
/// | 74   | I/O             | `Transport`, `Display`                     |
/// | 78   | Configuration   | `Config`                                   |
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The page path does not contain `/games/{id}/`.
    #[error("malformed page path, no /games/{{id}}/ segment: {path}")]
    MalformedPath {
        /// The path that failed to match.
        path: String,
    },

    /// The page URL could not be parsed or has no host.
    #[error("invalid page url: {0}")]
    InvalidPageUrl(String),

    /// The page URL uses a scheme other than `http` or `https`.
    #[error("unsupported page scheme: {0}")]
    UnsupportedScheme(String),

    /// A configuration value could not be interpreted.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The WebSocket handshake did not complete in time.
    #[error("connect to {endpoint} timed out after {timeout_secs} s")]
    ConnectTimeout {
        /// Endpoint that was being dialed.
        endpoint: String,
        /// Configured handshake timeout.
        timeout_secs: u64,
    },

    /// The WebSocket handshake failed.
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        /// Endpoint that was being dialed.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: Box<tungstenite::Error>,
    },

    /// Reading from or writing to an open channel failed.
    #[error("channel transport error: {0}")]
    Transport(#[from] Box<tungstenite::Error>),

    /// A send was attempted while the channel was not open.
    #[error("channel is not open (state: {0})")]
    NotOpen(ChannelState),

    /// Writing a rendered line to the display failed.
    #[error("display error: {0}")]
    Display(String),
}

impl ChannelError {
    /// Returns the process exit code for this variant.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidPageUrl(_) | Self::UnsupportedScheme(_) => 64,
            Self::MalformedPath { .. } => 65,
            Self::Connect { .. } | Self::ConnectTimeout { .. } => 69,
            Self::NotOpen(_) => 70,
            Self::Transport(_) | Self::Display(_) => 74,
            Self::Config(_) => 78,
        }
    }

    /// Returns `true` if the error happened before any channel was opened.
    #[must_use]
    pub const fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedPath { .. }
                | Self::InvalidPageUrl(_)
                | Self::UnsupportedScheme(_)
                | Self::Config(_)
        )
    }
}

impl From<tungstenite::Error> for ChannelError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        Self::Display(err.to_string())
    }
}
