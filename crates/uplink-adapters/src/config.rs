//! Transport selection.
//!
//! [`TransportConfig`] is the opaque configuration object a host's profile
//! hands to the bridge at construction time. The serde tag values are part
//! of the configuration surface: `queue`, `tauri` (stdio sidecar),
//! `websocket`, `mock`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uplink_protocol::UiAdapter;

use crate::mock::MockAdapter;
use crate::queue::{DEFAULT_EVENT_CAPACITY, QueueAdapter};
use crate::stream::StdioAdapter;
use crate::websocket::WebSocketAdapter;

fn default_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn default_ws_buffer() -> usize {
    256
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// In-process bounded queue for same-process UIs.
    Queue {
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    /// JSON lines over stdin/stdout for a spawned sidecar shell.
    Tauri,
    /// Broadcast WebSocket server route for web clients.
    Websocket {
        #[serde(default = "default_ws_buffer")]
        buffer: usize,
    },
    /// Recording double for tests.
    Mock,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Queue {
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl TransportConfig {
    /// Build the configured adapter, keeping the concrete handle available
    /// for transport-specific wiring (queue receiver, ws router, …).
    pub fn build(&self) -> Transport {
        match self {
            Self::Queue { capacity } => Transport::Queue(Arc::new(QueueAdapter::new(*capacity))),
            Self::Tauri => Transport::Stdio(Arc::new(StdioAdapter::stdio())),
            Self::Websocket { buffer } => Transport::Websocket(WebSocketAdapter::new(*buffer)),
            Self::Mock => Transport::Mock(Arc::new(MockAdapter::new())),
        }
    }
}

/// A built transport: the uniform adapter view plus the concrete handle.
pub enum Transport {
    Queue(Arc<QueueAdapter>),
    Stdio(Arc<StdioAdapter>),
    Websocket(Arc<WebSocketAdapter>),
    Mock(Arc<MockAdapter>),
}

impl Transport {
    pub fn adapter(&self) -> Arc<dyn UiAdapter> {
        match self {
            Self::Queue(adapter) => adapter.clone(),
            Self::Stdio(adapter) => adapter.clone(),
            Self::Websocket(adapter) => adapter.clone(),
            Self::Mock(adapter) => adapter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_tags_match_the_configuration_surface() {
        let queue: TransportConfig = serde_json::from_value(json!({"type": "queue"})).unwrap();
        assert_eq!(
            queue,
            TransportConfig::Queue {
                capacity: DEFAULT_EVENT_CAPACITY
            }
        );

        let ws: TransportConfig =
            serde_json::from_value(json!({"type": "websocket", "buffer": 64})).unwrap();
        assert_eq!(ws, TransportConfig::Websocket { buffer: 64 });

        let mock: TransportConfig = serde_json::from_value(json!({"type": "mock"})).unwrap();
        assert_eq!(mock, TransportConfig::Mock);
    }

    #[tokio::test]
    async fn queue_config_builds_a_working_adapter() {
        let transport = TransportConfig::Queue { capacity: 4 }.build();
        let Transport::Queue(queue) = &transport else {
            panic!("expected queue transport");
        };
        let mut rx = queue.take_event_receiver().unwrap();

        let adapter = transport.adapter();
        adapter
            .emit(uplink_protocol::UIEvent::new(
                "session_start",
                serde_json::Map::new(),
            ))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().event_type, "session_start");
    }
}
