//! Display sinks for rendered lines and state changes.
//!
//! The controller never writes to a terminal directly. It appends lines and
//! announces state changes through a [`MessageDisplay`], so the same
//! session logic drives a terminal, a test harness, or an embedding UI.

use std::fmt;
use std::io::{self, Write};

use tokio::sync::mpsc;

use super::ChannelState;
use crate::error::ChannelError;

/// Destination of rendered lines.
pub trait MessageDisplay: Send {
    /// Appends one rendered line after all previously appended lines.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Display`] if the line cannot be written.
    fn append_line(&mut self, line: &str) -> Result<(), ChannelError>;

    /// Reports a channel state change.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Display`] if the state cannot be written.
    fn show_state(&mut self, state: &ChannelState) -> Result<(), ChannelError>;
}

/// Writes lines to one stream and state changes to another.
///
/// The binary uses stdout for lines and stderr for state so rendered
/// output can be piped on its own.
pub struct TerminalDisplay<L, S> {
    lines: L,
    status: S,
}

impl TerminalDisplay<io::Stdout, io::Stderr> {
    /// Lines to stdout, state changes to stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<L: Write, S: Write> TerminalDisplay<L, S> {
    /// Creates a display over the given writers.
    pub const fn new(lines: L, status: S) -> Self {
        Self { lines, status }
    }

    /// Consumes the display, returning the writers.
    pub fn into_inner(self) -> (L, S) {
        (self.lines, self.status)
    }
}

impl<L, S> fmt::Debug for TerminalDisplay<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalDisplay").finish_non_exhaustive()
    }
}

impl<L: Write + Send, S: Write + Send> MessageDisplay for TerminalDisplay<L, S> {
    fn append_line(&mut self, line: &str) -> Result<(), ChannelError> {
        writeln!(self.lines, "{line}")?;
        self.lines.flush()?;
        Ok(())
    }

    fn show_state(&mut self, state: &ChannelState) -> Result<(), ChannelError> {
        writeln!(self.status, "-- {state}")?;
        self.status.flush()?;
        Ok(())
    }
}

/// Item emitted by an [`EventDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A rendered inbound line.
    Line(String),
    /// A state change.
    State(ChannelState),
}

/// Forwards display output over an unbounded channel, in order.
#[derive(Debug, Clone)]
pub struct EventDisplay {
    tx: mpsc::UnboundedSender<DisplayEvent>,
}

impl EventDisplay {
    /// Creates a display and the receiver its events arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DisplayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: DisplayEvent) -> Result<(), ChannelError> {
        self.tx
            .send(event)
            .map_err(|_| ChannelError::Display("display receiver dropped".to_string()))
    }
}

impl MessageDisplay for EventDisplay {
    fn append_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.emit(DisplayEvent::Line(line.to_string()))
    }

    fn show_state(&mut self, state: &ChannelState) -> Result<(), ChannelError> {
        self.emit(DisplayEvent::State(state.clone()))
    }
}
