//! Channel establishment and the session event loop.
//!
//! [`run_session`] opens the one channel a session is allowed, then
//! multiplexes inbound frames, activations, and the shutdown signal onto
//! the [`SessionController`] until the channel is gone.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::activation::Activations;
use super::controller::{SessionController, WsSink};
use super::{DisconnectReason, MessageDisplay};
use crate::domain::EndpointUrl;
use crate::error::ChannelError;

/// Read half of a client WebSocket connection.
pub type WsSource = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Time allowed for the close handshake to finish after the server's
/// close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Handshake settings for [`open_channel`].
#[derive(Clone)]
pub struct ConnectOptions {
    /// Time allowed for the whole handshake.
    pub timeout: Duration,
    /// `Cookie` header sent with the upgrade request, carrying the
    /// player's game session.
    pub cookie: Option<String>,
}

impl ConnectOptions {
    /// Options with the given handshake timeout and no cookie.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cookie: None,
        }
    }

    /// Sends `cookie` with the upgrade request.
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    fn request(&self, url: &str) -> Result<Request, ChannelError> {
        let mut request = url.into_client_request()?;
        if let Some(cookie) = &self.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ChannelError::Config(format!("invalid cookie: {e}")))?;
            request.headers_mut().insert(COOKIE, value);
        }
        Ok(request)
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("timeout", &self.timeout)
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Performs the WebSocket handshake with `endpoint`.
///
/// # Errors
///
/// Returns [`ChannelError::Config`] if the cookie is not a valid header
/// value, [`ChannelError::ConnectTimeout`] if the handshake takes longer
/// than the timeout, and [`ChannelError::Connect`] if it fails.
pub async fn open_channel(
    endpoint: &EndpointUrl,
    options: &ConnectOptions,
) -> Result<(WsSink, WsSource), ChannelError> {
    let url = endpoint.to_string();
    let request = options.request(&url)?;
    tracing::info!(endpoint = %url, cookie = options.cookie.is_some(), "opening channel");

    match tokio::time::timeout(options.timeout, tokio_tungstenite::connect_async(request)).await {
        Ok(Ok((ws, _response))) => Ok(ws.split()),
        Ok(Err(source)) => Err(ChannelError::Connect {
            endpoint: url,
            source: Box::new(source),
        }),
        Err(_) => Err(ChannelError::ConnectTimeout {
            endpoint: url,
            timeout_secs: options.timeout.as_secs(),
        }),
    }
}

/// Runs one session from handshake to disconnect.
///
/// Inbound text frames are rendered in arrival order; every activation
/// sends one timestamp. The session ends when the server closes, the
/// transport fails, every activation control is dropped, or `shutdown`
/// resolves. In the last two cases a close frame is sent first.
///
/// Whatever the outcome, the controller ends up `Disconnected` with its
/// write half released.
///
/// # Errors
///
/// Returns the connect error if the handshake fails, and
/// [`ChannelError::Display`] if the display rejects output. In the latter
/// case the channel is closed before returning.
pub async fn run_session<D, F>(
    controller: &mut SessionController<D>,
    activations: Activations,
    options: &ConnectOptions,
    shutdown: F,
) -> Result<DisconnectReason, ChannelError>
where
    D: MessageDisplay,
    F: Future<Output = ()>,
{
    let (sink, stream) = match open_channel(controller.endpoint(), options).await {
        Ok(pair) => pair,
        Err(e) => {
            controller.on_disconnect(DisconnectReason::ConnectFailed {
                detail: e.to_string(),
            })?;
            return Err(e);
        }
    };

    match drive(controller, sink, stream, activations, shutdown).await {
        Ok(reason) => Ok(reason),
        Err(e) => {
            tracing::warn!(session = %controller.session(), error = %e, "aborting session");
            controller.abort(&e).await;
            Err(e)
        }
    }
}

async fn drive<D, F>(
    controller: &mut SessionController<D>,
    sink: WsSink,
    mut stream: WsSource,
    mut activations: Activations,
    shutdown: F,
) -> Result<DisconnectReason, ChannelError>
where
    D: MessageDisplay,
    F: Future<Output = ()>,
{
    controller.on_open(sink)?;
    tracing::info!(session = %controller.session(), "channel open");

    tokio::pin!(shutdown);

    let reason = loop {
        tokio::select! {
            // Incoming frame from the server
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => controller.on_message(text.as_str())?,
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!(len = data.len(), "ignoring binary frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        finish_close_handshake(&mut stream).await;
                        break server_closed(frame);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break DisconnectReason::TransportError { detail: e.to_string() },
                    None => break server_closed(None),
                }
            }
            // Activation from the send control
            activation = activations.next() => {
                if activation.is_none() {
                    controller.close().await?;
                    return Ok(DisconnectReason::LocalShutdown);
                }
                match controller.on_activate().await {
                    Ok(_) => {}
                    Err(ChannelError::Transport(e)) => {
                        break DisconnectReason::TransportError { detail: e.to_string() };
                    }
                    Err(e) => return Err(e),
                }
            }
            () = &mut shutdown => {
                controller.close().await?;
                return Ok(DisconnectReason::LocalShutdown);
            }
        }
    };

    controller.on_disconnect(reason.clone())?;
    Ok(reason)
}

/// Keeps reading so the close reply gets flushed, bounded by [`CLOSE_GRACE`].
async fn finish_close_handshake(stream: &mut WsSource) {
    let drain = async { while let Some(Ok(_)) = stream.next().await {} };
    if tokio::time::timeout(CLOSE_GRACE, drain).await.is_err() {
        tracing::debug!("server did not finish close handshake in time");
    }
}

fn server_closed(frame: Option<CloseFrame>) -> DisconnectReason {
    match frame {
        Some(frame) => DisconnectReason::ServerClosed {
            code: Some(u16::from(frame.code)),
            reason: frame.reason.as_str().to_string(),
        },
        None => DisconnectReason::ServerClosed {
            code: None,
            reason: String::new(),
        },
    }
}
