//! End-to-end tests: a real client session against an in-process axum
//! WebSocket server serving `/games/{id}/ws`.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::mpsc::UnboundedReceiver;

use live_channel::channel::{
    ChannelState, ConnectOptions, DisconnectReason, DisplayEvent, EventDisplay,
    SessionController, activation, run_session,
};
use live_channel::domain::LineFormat;
use live_channel::domain::message::parse_timestamp;
use live_channel::error::ChannelError;

const TIMEOUT: Duration = Duration::from_secs(5);

/// `burst` games push `a`, `b` and close; `crash` closes with 1011;
/// `drop` says `bye` and drops the connection without a close frame;
/// `cookie` reports the request's cookie. Every other game greets the
/// client and echoes its text frames back prefixed with `echo `.
async fn game_ws(
    Path(id): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let cookie = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string();
    ws.on_upgrade(move |socket| async move {
        match id.as_str() {
            "burst" => burst(socket).await,
            "crash" => close_with(socket, 1011, "internal error").await,
            "drop" => {
                let mut socket = socket;
                let _ = socket.send(Message::text("bye")).await;
            }
            "cookie" => echo(socket, format!("cookie {cookie}")).await,
            _ => echo(socket, format!("welcome {id}")).await,
        }
    })
}

async fn burst(mut socket: WebSocket) {
    for payload in ["a", "b"] {
        if socket.send(Message::text(payload)).await.is_err() {
            return;
        }
    }
    close_with(socket, 1000, "game over").await;
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn echo(mut socket: WebSocket, greeting: String) {
    if socket.send(Message::text(greeting)).await.is_err() {
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let reply = Message::text(format!("echo {}", text.as_str()));
                if socket.send(reply).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new().route("/games/{id}/ws", get(game_ws));
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind test server");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("test server address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn options() -> ConnectOptions {
    ConnectOptions::new(TIMEOUT)
}

fn controller(
    page: &str,
    format: LineFormat,
) -> (SessionController<EventDisplay>, UnboundedReceiver<DisplayEvent>) {
    let (display, rx) = EventDisplay::channel();
    let Ok(ctrl) = SessionController::new(page, format, display) else {
        panic!("controller for {page}");
    };
    (ctrl, rx)
}

async fn next_event(rx: &mut UnboundedReceiver<DisplayEvent>) -> DisplayEvent {
    match tokio::time::timeout(TIMEOUT, rx.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => panic!("display closed"),
        Err(_) => panic!("no display event within {TIMEOUT:?}"),
    }
}

async fn next_line(rx: &mut UnboundedReceiver<DisplayEvent>) -> String {
    loop {
        if let DisplayEvent::Line(line) = next_event(rx).await {
            return line;
        }
    }
}

#[tokio::test]
async fn messages_render_in_arrival_order_then_server_close() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(&format!("http://{addr}/games/burst/"), LineFormat::Plain);
    let (_control, activations) = activation::control(4);

    let result = run_session(&mut ctrl, activations, &options(), std::future::pending()).await;

    let expected_reason = DisconnectReason::ServerClosed {
        code: Some(1000),
        reason: "game over".to_string(),
    };
    let Ok(reason) = result else {
        panic!("session should end cleanly");
    };
    assert_eq!(reason, expected_reason);

    assert_eq!(next_event(&mut rx).await, DisplayEvent::State(ChannelState::Open));
    assert_eq!(next_event(&mut rx).await, DisplayEvent::Line("a".to_string()));
    assert_eq!(next_event(&mut rx).await, DisplayEvent::Line("b".to_string()));
    assert_eq!(
        next_event(&mut rx).await,
        DisplayEvent::State(ChannelState::Disconnected {
            reason: expected_reason
        })
    );
    assert_eq!(ctrl.received_count(), 2);
    assert_eq!(ctrl.sent_count(), 0);
}

#[tokio::test]
async fn activation_sends_exactly_one_timestamp() {
    let addr = spawn_server().await;
    let (ctrl, mut rx) = controller(&format!("http://{addr}/games/abc123/"), LineFormat::Plain);
    let (control, activations) = activation::control(4);

    let session = tokio::spawn(async move {
        let mut ctrl = ctrl;
        let result = run_session(&mut ctrl, activations, &options(), std::future::pending()).await;
        (ctrl, result)
    });

    assert_eq!(next_line(&mut rx).await, "welcome abc123");

    assert!(control.activate().await);
    let echoed = next_line(&mut rx).await;
    let Some(timestamp) = echoed.strip_prefix("echo ") else {
        panic!("expected an echo, got {echoed}");
    };
    assert!(
        parse_timestamp(timestamp).is_ok(),
        "'{timestamp}' should parse as a timestamp"
    );

    drop(control);
    let Ok((ctrl, result)) = session.await else {
        panic!("session task panicked");
    };
    assert!(matches!(result, Ok(DisconnectReason::LocalShutdown)));
    assert_eq!(ctrl.sent_count(), 1);
    assert_eq!(ctrl.received_count(), 2);
}

#[tokio::test]
async fn nothing_is_sent_without_activation() {
    let addr = spawn_server().await;
    let (ctrl, mut rx) = controller(&format!("http://{addr}/games/quiet/"), LineFormat::Plain);
    let (control, activations) = activation::control(4);

    let session = tokio::spawn(async move {
        let mut ctrl = ctrl;
        let result = run_session(&mut ctrl, activations, &options(), std::future::pending()).await;
        (ctrl, result)
    });

    assert_eq!(next_line(&mut rx).await, "welcome quiet");
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(control);

    let Ok((ctrl, result)) = session.await else {
        panic!("session task panicked");
    };
    assert!(matches!(result, Ok(DisconnectReason::LocalShutdown)));
    assert_eq!(ctrl.sent_count(), 0);
    assert_eq!(ctrl.received_count(), 1);

    while let Ok(event) = rx.try_recv() {
        if let DisplayEvent::Line(line) = event {
            panic!("unexpected line after welcome: {line}");
        }
    }
}

#[tokio::test]
async fn paragraph_format_wraps_lines() {
    let addr = spawn_server().await;
    let (ctrl, mut rx) = controller(&format!("http://{addr}/games/g1/"), LineFormat::Paragraph);
    let (control, activations) = activation::control(1);

    let session = tokio::spawn(async move {
        let mut ctrl = ctrl;
        run_session(&mut ctrl, activations, &options(), std::future::pending()).await
    });

    assert_eq!(next_line(&mut rx).await, "<p>welcome g1</p>");
    drop(control);
    let Ok(result) = session.await else {
        panic!("session task panicked");
    };
    assert!(result.is_ok());
}

#[tokio::test]
async fn shutdown_signal_closes_the_channel() {
    let addr = spawn_server().await;
    let (ctrl, mut rx) = controller(&format!("http://{addr}/games/g2/"), LineFormat::Plain);
    let (_control, activations) = activation::control(1);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let session = tokio::spawn(async move {
        let mut ctrl = ctrl;
        let shutdown = async {
            let _ = stop_rx.await;
        };
        let result = run_session(&mut ctrl, activations, &options(), shutdown).await;
        (ctrl, result)
    });

    assert_eq!(next_line(&mut rx).await, "welcome g2");
    let _ = stop_tx.send(());

    let Ok((ctrl, result)) = session.await else {
        panic!("session task panicked");
    };
    assert!(matches!(result, Ok(DisconnectReason::LocalShutdown)));
    assert!(ctrl.state().is_terminal());
}

#[tokio::test]
async fn refused_connection_surfaces_disconnected_state() {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    drop(listener);

    let (mut ctrl, mut rx) = controller(&format!("http://{addr}/games/g3/"), LineFormat::Plain);
    let (_control, activations) = activation::control(1);
    let result = run_session(&mut ctrl, activations, &options(), std::future::pending()).await;

    let Err(err) = result else {
        panic!("connect should fail");
    };
    assert!(matches!(err, ChannelError::Connect { .. }));
    assert_eq!(err.exit_code(), 69);
    assert!(matches!(
        next_event(&mut rx).await,
        DisplayEvent::State(ChannelState::Disconnected {
            reason: DisconnectReason::ConnectFailed { .. }
        })
    ));
}

#[tokio::test]
async fn malformed_page_path_never_connects() {
    let (display, _rx) = EventDisplay::channel();
    let result: Result<SessionController<EventDisplay>, _> =
        SessionController::new("http://127.0.0.1:1/lobby/", LineFormat::Plain, display);
    let Err(err) = result else {
        panic!("path without /games/{{id}}/ must fail");
    };
    assert!(matches!(err, ChannelError::MalformedPath { .. }));
    assert!(err.is_startup_failure());
}

#[tokio::test]
async fn server_error_close_is_reported_as_unclean() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(&format!("http://{addr}/games/crash/"), LineFormat::Plain);
    let (_control, activations) = activation::control(1);

    let result = run_session(&mut ctrl, activations, &options(), std::future::pending()).await;

    let Ok(reason) = result else {
        panic!("a server close is not a session error");
    };
    assert_eq!(
        reason,
        DisconnectReason::ServerClosed {
            code: Some(1011),
            reason: "internal error".to_string(),
        }
    );
    assert!(!reason.is_clean());
    assert_eq!(next_event(&mut rx).await, DisplayEvent::State(ChannelState::Open));
    assert_eq!(
        next_event(&mut rx).await,
        DisplayEvent::State(ChannelState::Disconnected { reason })
    );
}

#[tokio::test]
async fn dropped_connection_is_a_transport_error() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(&format!("http://{addr}/games/drop/"), LineFormat::Plain);
    let (_control, activations) = activation::control(1);

    let result = run_session(&mut ctrl, activations, &options(), std::future::pending()).await;

    let Ok(reason) = result else {
        panic!("a dropped connection is not a session error");
    };
    assert!(
        matches!(reason, DisconnectReason::TransportError { .. }),
        "unexpected reason {reason:?}"
    );
    assert!(!reason.is_clean());
    assert_eq!(next_line(&mut rx).await, "bye");
    assert!(matches!(
        next_event(&mut rx).await,
        DisplayEvent::State(ChannelState::Disconnected {
            reason: DisconnectReason::TransportError { .. }
        })
    ));
    assert!(ctrl.state().is_terminal());
}

#[tokio::test]
async fn display_failure_tears_the_channel_down() {
    let addr = spawn_server().await;
    let (mut ctrl, rx) = controller(&format!("http://{addr}/games/g4/"), LineFormat::Plain);
    drop(rx);
    let (control, activations) = activation::control(1);

    let result = run_session(&mut ctrl, activations, &options(), std::future::pending()).await;

    assert!(matches!(result, Err(ChannelError::Display(_))));
    assert!(ctrl.state().is_terminal());
    assert!(control.is_closed());
}

#[tokio::test]
async fn session_cookie_is_sent_on_the_handshake() {
    let addr = spawn_server().await;
    let (ctrl, mut rx) = controller(&format!("http://{addr}/games/cookie/"), LineFormat::Plain);
    let (control, activations) = activation::control(1);
    let with_cookie = options().with_cookie("session=abc123");

    let session = tokio::spawn(async move {
        let mut ctrl = ctrl;
        run_session(&mut ctrl, activations, &with_cookie, std::future::pending()).await
    });

    assert_eq!(next_line(&mut rx).await, "cookie session=abc123");
    drop(control);
    let Ok(result) = session.await else {
        panic!("session task panicked");
    };
    assert!(matches!(result, Ok(DisconnectReason::LocalShutdown)));
}
