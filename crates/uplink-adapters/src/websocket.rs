//! WebSocket adapter for web-based UIs.
//!
//! Events fan out through a broadcast hub: every connected client holds a
//! subscription and receives every frame. Commands arrive as text frames
//! from any client and funnel into one inbound channel.
//!
//! Emitting while no client is connected is tolerated: the frame is dropped
//! after a debug log, since the hub has no subscribers to buffer for. A
//! client that falls behind the hub buffer receives a `stream.lagged`
//! notice frame instead of the skipped events.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;
use uplink_protocol::{BridgeResult, UIEvent, UiAdapter, UICommand};

pub struct WebSocketAdapter {
    frames: broadcast::Sender<String>,
    command_tx: mpsc::UnboundedSender<BridgeResult<UICommand>>,
    command_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<BridgeResult<UICommand>>>,
}

impl WebSocketAdapter {
    /// Adapter whose broadcast hub buffers up to `buffer` frames per
    /// subscriber before lagging.
    pub fn new(buffer: usize) -> Arc<Self> {
        let (frames, _) = broadcast::channel(buffer.max(1));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            frames,
            command_tx,
            command_rx: tokio::sync::Mutex::new(command_rx),
        })
    }

    /// Router serving the event stream at `/events`.
    ///
    /// Mount into a host server, or serve standalone; authentication is the
    /// embedding server's concern.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/events", get(upgrade))
            .with_state(self.clone())
    }

    /// Subscribe to serialized outbound frames directly, bypassing the ws
    /// route. Useful for tests and for embedding into an existing stream.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<String> {
        self.frames.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.frames.receiver_count()
    }
}

#[async_trait]
impl UiAdapter for WebSocketAdapter {
    async fn emit(&self, event: UIEvent) -> BridgeResult<()> {
        let frame = event.to_json()?;
        if self.frames.send(frame).is_err() {
            debug!(
                event_type = %event.event_type,
                "no connected ws clients, frame dropped"
            );
        }
        Ok(())
    }

    async fn recv_command(&self) -> Option<BridgeResult<UICommand>> {
        self.command_rx.lock().await.recv().await
    }
}

async fn upgrade(
    State(adapter): State<Arc<WebSocketAdapter>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| client_session(adapter, socket))
}

async fn client_session(adapter: Arc<WebSocketAdapter>, socket: WebSocket) {
    debug!(clients = adapter.client_count() + 1, "ws client connected");
    let (mut sink, mut inbound) = socket.split();
    let mut frames = BroadcastStream::new(adapter.frames.subscribe());

    let outbound = tokio::spawn(async move {
        while let Some(item) = frames.next().await {
            let frame = match item {
                Ok(frame) => frame,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    json!({"type": "stream.lagged", "data": {"skipped": skipped}}).to_string()
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = inbound.next().await {
        match message {
            Message::Text(text) => {
                let parsed = UICommand::from_json(&text);
                if adapter.command_tx.send(parsed).is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    outbound.abort();
    debug!("ws client disconnected");
}
