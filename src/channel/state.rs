//! Channel lifecycle state machine.
//!
//! ```text
//! Connecting ──► Open ──► Disconnected(reason)
//!      │                        ▲
//!      └────────────────────────┘
//! ```
//!
//! `Disconnected` is terminal: there is no reconnection.

use std::fmt;

use serde::Serialize;

/// Why a channel ended up disconnected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The handshake failed or timed out.
    ConnectFailed {
        /// Human-readable failure detail.
        detail: String,
    },
    /// The server sent a close frame or the stream ended.
    ServerClosed {
        /// Close code, when the server sent one.
        code: Option<u16>,
        /// Close reason text (may be empty).
        reason: String,
    },
    /// Reading or writing failed on an open channel.
    TransportError {
        /// Human-readable failure detail.
        detail: String,
    },
    /// The local side shut the session down.
    LocalShutdown,
}

impl DisconnectReason {
    /// Returns `true` if the disconnect was requested locally, or the
    /// server closed with no code, 1000 (normal) or 1001 (going away).
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(
            self,
            Self::LocalShutdown | Self::ServerClosed { code: None | Some(1000 | 1001), .. }
        )
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { detail } => write!(f, "connect failed: {detail}"),
            Self::ServerClosed { code: Some(code), reason } if !reason.is_empty() => {
                write!(f, "closed by server ({code}: {reason})")
            }
            Self::ServerClosed { code: Some(code), .. } => write!(f, "closed by server ({code})"),
            Self::ServerClosed { code: None, .. } => f.write_str("closed by server"),
            Self::TransportError { detail } => write!(f, "transport error: {detail}"),
            Self::LocalShutdown => f.write_str("shut down"),
        }
    }
}

/// Lifecycle state of the session's single channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelState {
    /// Handshake in progress; initial state.
    #[default]
    Connecting,
    /// Handshake complete; messages flow both ways.
    Open,
    /// Channel is gone for good.
    Disconnected {
        /// Why the channel closed.
        reason: DisconnectReason,
    },
}

impl ChannelState {
    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Open)
                | (Self::Connecting | Self::Open, Self::Disconnected { .. })
        )
    }

    /// Returns `true` while messages can be sent.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` once the channel is disconnected.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("open"),
            Self::Disconnected { reason } => write!(f, "disconnected: {reason}"),
        }
    }
}
