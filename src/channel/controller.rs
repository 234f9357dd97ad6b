//! Session-scoped controller owning the single channel handle.
//!
//! [`SessionController`] is built once per session from the page URL. It
//! derives the session identifier, holds the endpoint, tracks the
//! [`ChannelState`], and owns the write half of the channel. The session
//! loop in [`super::connection`] feeds it channel events and activations.

use std::fmt;

use futures_util::{Sink, SinkExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{ChannelState, DisconnectReason, MessageDisplay};
use crate::domain::{
    EndpointUrl, InboundMessage, LineFormat, OutboundMessage, PageLocation, SessionId,
    message_type,
};
use crate::error::ChannelError;

/// Write half of a client WebSocket connection.
pub type WsSink = futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Controller for one session's live channel.
///
/// `D` receives rendered lines and state changes; `S` is the write half of
/// the channel, attached once the handshake completes.
pub struct SessionController<D, S = WsSink> {
    session: SessionId,
    endpoint: EndpointUrl,
    format: LineFormat,
    state: ChannelState,
    display: D,
    sink: Option<S>,
    received: u64,
    sent: u64,
}

impl<D: MessageDisplay, S> SessionController<D, S> {
    /// Builds a controller from the page URL the session was started from.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidPageUrl`] or
    /// [`ChannelError::UnsupportedScheme`] if the URL is unusable, and
    /// [`ChannelError::MalformedPath`] if its path carries no session id.
    pub fn new(page_url: &str, format: LineFormat, display: D) -> Result<Self, ChannelError> {
        let location = PageLocation::parse(page_url)?;
        Self::from_location(&location, format, display)
    }

    /// Builds a controller from an already parsed page location.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::MalformedPath`] if the location's path
    /// carries no session id.
    pub fn from_location(
        location: &PageLocation,
        format: LineFormat,
        display: D,
    ) -> Result<Self, ChannelError> {
        let session = SessionId::derive(location.path())?;
        let endpoint = EndpointUrl::build(location, &session);
        tracing::debug!(%session, %endpoint, "session controller created");

        Ok(Self {
            session,
            endpoint,
            format,
            state: ChannelState::Connecting,
            display,
            sink: None,
            received: 0,
            sent: 0,
        })
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    /// Returns the channel endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointUrl {
        &self.endpoint
    }

    /// Returns the current channel state.
    #[must_use]
    pub const fn state(&self) -> &ChannelState {
        &self.state
    }

    /// Number of inbound messages rendered so far.
    #[must_use]
    pub const fn received_count(&self) -> u64 {
        self.received
    }

    /// Number of outbound messages written so far.
    #[must_use]
    pub const fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Attaches the write half of a freshly opened channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotOpen`] if the controller is not
    /// `Connecting` (a session opens at most one channel), or
    /// [`ChannelError::Display`] if the state change cannot be shown.
    pub fn on_open(&mut self, sink: S) -> Result<(), ChannelError> {
        if !self.state.can_transition_to(&ChannelState::Open) {
            return Err(ChannelError::NotOpen(self.state.clone()));
        }
        self.sink = Some(sink);
        self.transition(ChannelState::Open)
    }

    /// Renders one inbound payload as a new display line.
    ///
    /// Payloads arriving outside `Open` are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Display`] if rendering or writing fails.
    pub fn on_message(&mut self, payload: &str) -> Result<(), ChannelError> {
        if !self.state.is_open() {
            tracing::debug!(state = %self.state, "dropping message outside open state");
            return Ok(());
        }
        tracing::debug!(
            session = %self.session,
            kind = message_type(payload).as_deref().unwrap_or("text"),
            payload,
            "message received"
        );

        let line = InboundMessage::new(payload).render(self.format)?;
        self.display.append_line(&line)?;
        self.received += 1;
        Ok(())
    }

    /// Moves to `Disconnected` and drops the write half.
    ///
    /// Has no effect once already disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Display`] if the state change cannot be shown.
    pub fn on_disconnect(&mut self, reason: DisconnectReason) -> Result<(), ChannelError> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.sink = None;
        if reason.is_clean() {
            tracing::info!(session = %self.session, %reason, "channel disconnected");
        } else {
            tracing::warn!(session = %self.session, %reason, "channel disconnected");
        }
        self.transition(ChannelState::Disconnected { reason })
    }

    fn transition(&mut self, next: ChannelState) -> Result<(), ChannelError> {
        tracing::debug!(from = %self.state, to = %next, "channel state change");
        self.state = next;
        self.display.show_state(&self.state)
    }
}

impl<D, S> SessionController<D, S>
where
    D: MessageDisplay,
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    /// Sends the current timestamp over the channel.
    ///
    /// The write is flushed but no reply is awaited.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotOpen`] if the channel is not open, and
    /// [`ChannelError::Transport`] if the write fails.
    pub async fn on_activate(&mut self) -> Result<OutboundMessage, ChannelError> {
        let (true, Some(sink)) = (self.state.is_open(), self.sink.as_mut()) else {
            return Err(ChannelError::NotOpen(self.state.clone()));
        };

        let message = OutboundMessage::now();
        sink.send(Message::text(message.text())).await?;
        self.sent += 1;
        tracing::debug!(session = %self.session, text = message.text(), "timestamp sent");
        Ok(message)
    }

    /// Closes the channel from the local side.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Display`] if the state change cannot be shown.
    pub async fn close(&mut self) -> Result<(), ChannelError> {
        if let Some(mut sink) = self.sink.take()
            && let Err(e) = sink.close().await
        {
            tracing::debug!(error = %e, "close frame not delivered");
        }
        self.on_disconnect(DisconnectReason::LocalShutdown)
    }

    /// Tears the channel down after `error` ended the session early.
    ///
    /// The write half is closed and the state becomes `Disconnected`
    /// even if the display can no longer show it.
    pub async fn abort(&mut self, error: &ChannelError) {
        if let Some(mut sink) = self.sink.take()
            && let Err(e) = sink.close().await
        {
            tracing::debug!(error = %e, "close frame not delivered");
        }
        let reason = match error {
            ChannelError::Transport(e) => DisconnectReason::TransportError {
                detail: e.to_string(),
            },
            _ => DisconnectReason::LocalShutdown,
        };
        if let Err(e) = self.on_disconnect(reason) {
            tracing::warn!(session = %self.session, error = %e, "disconnect not displayed");
        }
    }
}

impl<D, S> fmt::Debug for SessionController<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("endpoint", &self.endpoint)
            .field("format", &self.format)
            .field("state", &self.state)
            .field("attached", &self.sink.is_some())
            .field("received", &self.received)
            .field("sent", &self.sent)
            .finish_non_exhaustive()
    }
}
