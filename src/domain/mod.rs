//! Domain layer: session identity, page location, and messages.
//!
//! This module holds the pure, I/O-free part of the client: deriving the
//! session identifier from the page path, building the channel endpoint
//! from the page origin, and shaping inbound and outbound messages.

pub mod location;
pub mod message;
pub mod session_id;

pub use location::{EndpointUrl, PageLocation, PageScheme};
pub use message::{InboundMessage, LineFormat, OutboundMessage, message_type};
pub use session_id::SessionId;
