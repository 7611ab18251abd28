//! Background event forwarding.
//!
//! A forwarder drains a queue adapter's outgoing receiver and relays each
//! event's serialized form to an externally supplied async sender (a live
//! socket connection, an IPC pipe, a test collector), decoupling bridge
//! emission from network I/O.
//!
//! Cancellation is cooperative: [`ForwarderHandle::stop`] is observed
//! within one wait cycle; an event already dequeued before the signal is
//! still delivered, and a forwarder blocked inside its sender callback
//! sees the signal only once the callback returns.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uplink_protocol::UIEvent;

type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
type SenderFn = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type BatchSenderFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Handle to a running forwarder task.
pub struct ForwarderHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ForwarderHandle {
    /// Request cooperative termination.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Relays one serialized event per sender call.
pub struct EventForwarder {
    receiver: mpsc::Receiver<UIEvent>,
    sender: SenderFn,
    transform: Option<TransformFn>,
}

impl EventForwarder {
    pub fn new<S, Fut>(receiver: mpsc::Receiver<UIEvent>, sender: S) -> Self
    where
        S: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            receiver,
            sender: Arc::new(move |value| Box::pin(sender(value))),
            transform: None,
        }
    }

    /// Transform applied to each serialized event before sending (e.g.
    /// attach a conversation id, rename fields).
    pub fn with_transform(
        mut self,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn spawn(self) -> ForwarderHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(self.run(child));
        ForwarderHandle { token, handle }
    }

    async fn run(mut self, token: CancellationToken) {
        debug!("event forwarder started");
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            let Some(payload) = prepare(&event, self.transform.as_ref()) else {
                continue;
            };
            // Sender failures are logged; the loop keeps draining.
            if let Err(error) = (self.sender)(payload).await {
                warn!(%error, "forwarder sender failed");
            }
        }
        debug!("event forwarder stopped");
    }
}

/// Accumulates events for a fixed window or batch size, then makes one
/// sender call with the whole batch. A window with zero events makes no
/// call; a partial batch is flushed on shutdown.
pub struct BatchForwarder {
    receiver: mpsc::Receiver<UIEvent>,
    sender: BatchSenderFn,
    transform: Option<TransformFn>,
    batch_size: usize,
    batch_window: Duration,
}

impl BatchForwarder {
    pub fn new<S, Fut>(receiver: mpsc::Receiver<UIEvent>, sender: S) -> Self
    where
        S: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            receiver,
            sender: Arc::new(move |batch| Box::pin(sender(batch))),
            transform: None,
            batch_size: 10,
            batch_window: Duration::from_millis(50),
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_window(mut self, batch_window: Duration) -> Self {
        self.batch_window = batch_window;
        self
    }

    pub fn spawn(self) -> ForwarderHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(self.run(child));
        ForwarderHandle { token, handle }
    }

    async fn run(mut self, token: CancellationToken) {
        debug!("batch forwarder started");
        let mut closed = false;
        while !closed {
            // The window opens when the first event of a batch arrives.
            let first = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            let mut batch = Vec::with_capacity(self.batch_size);
            if let Some(value) = prepare(&first, self.transform.as_ref()) {
                batch.push(value);
            }

            let window = tokio::time::sleep(self.batch_window);
            tokio::pin!(window);
            while batch.len() < self.batch_size {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        closed = true;
                        break;
                    }
                    _ = &mut window => break,
                    event = self.receiver.recv() => match event {
                        Some(event) => {
                            if let Some(value) = prepare(&event, self.transform.as_ref()) {
                                batch.push(value);
                            }
                        }
                        None => {
                            closed = true;
                            break;
                        }
                    },
                }
            }

            if batch.is_empty() {
                continue;
            }
            if let Err(error) = (self.sender)(batch).await {
                warn!(%error, "batch sender failed");
            }
        }
        debug!("batch forwarder stopped");
    }
}

fn prepare(event: &UIEvent, transform: Option<&TransformFn>) -> Option<Value> {
    let payload = match serde_json::to_value(event) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(%error, "failed to serialize event for forwarding");
            return None;
        }
    };
    Some(match transform {
        Some(transform) => transform(payload),
        None => payload,
    })
}
