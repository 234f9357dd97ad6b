//! The send control.
//!
//! An [`ActivationControl`] is the UI-side handle of the control that
//! makes the session send a timestamp. Each call to
//! [`ActivationControl::activate`] queues exactly one send; dropping every
//! handle shuts the session down.

use tokio::sync::mpsc;

/// One trigger of the send control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation;

/// Cloneable handle that triggers sends on a running session.
#[derive(Debug, Clone)]
pub struct ActivationControl {
    tx: mpsc::Sender<Activation>,
}

/// Receiving end, consumed by the session loop.
#[derive(Debug)]
pub struct Activations {
    rx: mpsc::Receiver<Activation>,
}

/// Creates a control and its receiving end.
///
/// `buffer` bounds the number of activations queued ahead of the session
/// loop; it is clamped to at least one.
#[must_use]
pub fn control(buffer: usize) -> (ActivationControl, Activations) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (ActivationControl { tx }, Activations { rx })
}

impl ActivationControl {
    /// Queues one activation, waiting for room if the queue is full.
    ///
    /// Returns `false` if the session is gone.
    pub async fn activate(&self) -> bool {
        self.tx.send(Activation).await.is_ok()
    }

    /// Returns `true` once the session has stopped listening.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Activations {
    /// Waits for the next activation; `None` once every control is dropped.
    pub async fn next(&mut self) -> Option<Activation> {
        self.rx.recv().await
    }
}
