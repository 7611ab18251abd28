//! In-memory recording adapter for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uplink_protocol::{BridgeError, BridgeResult, UIEvent, UiAdapter, UICommand};

/// Captures every emitted event in order and lets a test inject synthetic
/// inbound commands. Never applies backpressure.
pub struct MockAdapter {
    events: Mutex<Vec<UIEvent>>,
    command_tx: mpsc::UnboundedSender<BridgeResult<UICommand>>,
    command_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<BridgeResult<UICommand>>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Self {
            events: Mutex::new(Vec::new()),
            command_tx,
            command_rx: tokio::sync::Mutex::new(command_rx),
        }
    }

    /// Simulate a command arriving from the UI.
    pub fn inject_command(&self, command: UICommand) {
        let _ = self.command_tx.send(Ok(command));
    }

    /// Simulate a malformed inbound frame on the receive path.
    pub fn inject_decode_error(&self, message: impl Into<String>) {
        let _ = self
            .command_tx
            .send(Err(BridgeError::Serialization(message.into())));
    }

    /// Snapshot of every captured event, in emission order.
    pub fn events(&self) -> Vec<UIEvent> {
        self.events.lock().clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<UIEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn last_event(&self) -> Option<UIEvent> {
        self.events.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UiAdapter for MockAdapter {
    async fn emit(&self, event: UIEvent) -> BridgeResult<()> {
        self.events.lock().push(event);
        Ok(())
    }

    async fn recv_command(&self) -> Option<BridgeResult<UICommand>> {
        self.command_rx.lock().await.recv().await
    }
}
