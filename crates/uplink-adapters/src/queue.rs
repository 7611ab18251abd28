//! In-process queue adapter.
//!
//! The primary adapter for UIs running in the same process as the host
//! (e.g. a TUI render loop). Events go through a bounded channel: when the
//! buffer is full, `emit` suspends the producer until the consumer catches
//! up — backpressure, never a silent drop.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uplink_protocol::{BridgeError, BridgeResult, UIEvent, UiAdapter, UICommand};

pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

pub struct QueueAdapter {
    event_tx: mpsc::Sender<UIEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<UIEvent>>>,
    command_tx: mpsc::UnboundedSender<UICommand>,
    command_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<UICommand>>,
}

impl QueueAdapter {
    /// Adapter with a bounded event buffer of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Self {
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            command_tx,
            command_rx: tokio::sync::Mutex::new(command_rx),
        }
    }

    /// Take ownership of the outgoing event queue.
    ///
    /// The consumer (render loop, forwarder) owns the receiver; once taken,
    /// subsequent calls return `None`. Dropping the receiver makes `emit`
    /// fail with [`BridgeError::ChannelClosed`].
    pub fn take_event_receiver(&self) -> Option<mpsc::Receiver<UIEvent>> {
        self.event_rx.lock().take()
    }

    /// Handle the UI side uses to send commands back to the bridge.
    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            tx: self.command_tx.clone(),
        }
    }
}

impl Default for QueueAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[async_trait]
impl UiAdapter for QueueAdapter {
    async fn emit(&self, event: UIEvent) -> BridgeResult<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| BridgeError::ChannelClosed)
    }

    async fn recv_command(&self) -> Option<BridgeResult<UICommand>> {
        // The adapter holds a sender of its own, so this pends while the
        // channel is empty rather than observing closure.
        self.command_rx.lock().await.recv().await.map(Ok)
    }
}

/// Cloneable command handle for the UI side of a [`QueueAdapter`].
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<UICommand>,
}

impl CommandSender {
    pub fn send(&self, command: UICommand) -> BridgeResult<()> {
        self.tx
            .send(command)
            .map_err(|_| BridgeError::ChannelClosed)
    }
}
