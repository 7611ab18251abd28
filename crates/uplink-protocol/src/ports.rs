//! The adapter boundary port.
//!
//! [`UiAdapter`] is the only runtime boundary between the bridge core and a
//! transport implementation (in-process queue, JSON-lines stdio, WebSocket,
//! in-memory test double). The bridge is transport-agnostic by construction:
//! it holds one `Arc<dyn UiAdapter>` and calls exactly these two operations.
//!
//! Object-safety note: the trait uses `async-trait` for async dyn-dispatch.

use crate::command::UICommand;
use crate::error::BridgeResult;
use crate::event::UIEvent;
use async_trait::async_trait;

#[async_trait]
pub trait UiAdapter: Send + Sync {
    /// Deliver one event to the UI side of the transport.
    ///
    /// Bounded transports may suspend the caller until buffer space is
    /// available; they must not silently drop the event.
    async fn emit(&self, event: UIEvent) -> BridgeResult<()>;

    /// Wait for the next inbound command from the UI.
    ///
    /// Returns `None` once the transport is closed. A malformed inbound
    /// frame surfaces as `Some(Err(..))` so the caller can report it
    /// without tearing down the read loop.
    ///
    /// The default implementation pends forever, for emit-only transports.
    async fn recv_command(&self) -> Option<BridgeResult<UICommand>> {
        std::future::pending().await
    }
}
