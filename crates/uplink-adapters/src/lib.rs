//! Transport adapters for the uplink UI event bridge.
//!
//! Every adapter implements [`uplink_protocol::UiAdapter`] — emit events,
//! optionally receive commands — over a different transport:
//!
//! - [`QueueAdapter`] — bounded in-process channel for same-process UIs
//!   (e.g. a TUI render loop polling the queue).
//! - [`LineStreamAdapter`] / [`StdioAdapter`] — one JSON object per line
//!   over a byte stream, for sidecar processes speaking stdin/stdout.
//! - [`WebSocketAdapter`] — broadcast fan-out to WebSocket clients behind
//!   an axum router.
//! - [`MockAdapter`] — in-memory recording double for tests.
//!
//! [`TransportConfig`] is the opaque configuration object a host passes at
//! construction time to select and build one of the above.

mod config;
mod mock;
mod queue;
mod stream;
mod websocket;

pub use config::{Transport, TransportConfig};
pub use mock::MockAdapter;
pub use queue::{CommandSender, QueueAdapter};
pub use stream::{LineStreamAdapter, StdioAdapter};
pub use websocket::WebSocketAdapter;
