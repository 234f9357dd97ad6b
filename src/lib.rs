//! # live-channel
//!
//! Terminal client for a game server's live WebSocket message channel.
//!
//! Given a game page URL such as `https://host/games/abc123/`, the client
//! derives the session identifier from the path, opens a single channel to
//! `wss://host/games/abc123/ws`, renders every inbound message as one line,
//! and sends the current timestamp each time the send control is activated.
//!
//! ## Architecture
//!
//! ```text
//! Page URL ──► PageLocation ──► SessionId ──► EndpointUrl   (domain/)
//!                                                 │
//! stdin ──► ActivationControl ──┐                 ▼
//!                               ├──► run_session ◄─► WebSocket
//! Ctrl-C ──► shutdown ──────────┘         │
//!                                         ▼
//!                               SessionController (channel/)
//!                                         │
//!                                         ▼
//!                               MessageDisplay ──► stdout / stderr
//! ```

pub mod channel;
pub mod config;
pub mod domain;
pub mod error;
