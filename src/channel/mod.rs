//! Live channel layer: state machine, display seam, controller, and the
//! session loop.
//!
//! One session owns exactly one channel. The [`SessionController`] holds
//! the write half; [`connection::run_session`] drives it from inbound
//! frames and [`activation`] events.

pub mod activation;
pub mod connection;
pub mod controller;
pub mod display;
pub mod state;

pub use activation::{ActivationControl, Activations};
pub use connection::{ConnectOptions, open_channel, run_session};
pub use controller::SessionController;
pub use display::{DisplayEvent, EventDisplay, MessageDisplay, TerminalDisplay};
pub use state::{ChannelState, DisconnectReason};
