//! Channel messages: inbound payload rendering and outbound timestamps.
//!
//! Inbound payloads are opaque text and are rendered into exactly one
//! display line according to a [`LineFormat`]. Outbound messages carry the
//! local date/time in the `Date.toString()` shape browsers produce, e.g.
//! `Sat Oct 17 2026 14:03:07 GMT+0200`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::Serialize;

use crate::error::ChannelError;

/// `strftime` pattern of outbound timestamp messages.
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %Y %H:%M:%S GMT%z";

/// How an inbound payload is turned into a display line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// The payload verbatim.
    #[default]
    Plain,
    /// The payload HTML-escaped inside a `<p>` element.
    Paragraph,
    /// A JSON object with the receive time and the payload.
    Json,
}

impl FromStr for LineFormat {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "paragraph" | "html" => Ok(Self::Paragraph),
            "json" => Ok(Self::Json),
            other => Err(ChannelError::Config(format!(
                "unknown line format '{other}' (expected plain, paragraph or json)"
            ))),
        }
    }
}

impl fmt::Display for LineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Paragraph => "paragraph",
            Self::Json => "json",
        })
    }
}

/// Text payload delivered by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundMessage {
    /// Time the payload was handed to the controller.
    pub received_at: DateTime<Utc>,
    /// Payload text, untouched.
    pub payload: String,
}

impl InboundMessage {
    /// Wraps a payload received now.
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            received_at: Utc::now(),
            payload: payload.into(),
        }
    }

    /// Renders the payload as one display line.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Display`] if JSON encoding fails.
    pub fn render(&self, format: LineFormat) -> Result<String, ChannelError> {
        match format {
            LineFormat::Plain => Ok(self.payload.clone()),
            LineFormat::Paragraph => Ok(format!("<p>{}</p>", escape_html(&self.payload))),
            LineFormat::Json => {
                serde_json::to_string(self).map_err(|e| ChannelError::Display(e.to_string()))
            }
        }
    }
}

/// Returns the `type` field of a JSON object payload.
///
/// Game servers tag their JSON frames (`server_game`,
/// `server_game_update`, ...); anything else yields `None`.
#[must_use]
pub fn message_type(payload: &str) -> Option<String> {
    let trimmed = payload.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()?
        .get("type")?
        .as_str()
        .map(str::to_string)
}

/// Escapes the HTML metacharacters of `text`.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Timestamp message sent when the control is activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    sent_at: DateTime<FixedOffset>,
    text: String,
}

impl OutboundMessage {
    /// Builds the message for the given instant.
    #[must_use]
    pub fn timestamp(at: DateTime<FixedOffset>) -> Self {
        Self {
            text: at.format(TIMESTAMP_FORMAT).to_string(),
            sent_at: at,
        }
    }

    /// Builds the message for the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self::timestamp(Local::now().fixed_offset())
    }

    /// Returns the instant the message describes.
    #[must_use]
    pub const fn sent_at(&self) -> DateTime<FixedOffset> {
        self.sent_at
    }

    /// Returns the wire text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Parses a timestamp produced by [`OutboundMessage`].
///
/// # Errors
///
/// Returns the underlying [`chrono::ParseError`] if `text` is not in
/// [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_str(text, TIMESTAMP_FORMAT)
}
