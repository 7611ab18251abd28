//! # uplink-protocol — UI Bridge Wire Protocol
//!
//! This crate defines the event/command schema shared by the bridge core,
//! every transport adapter, and any UI front end speaking the uplink wire
//! format (terminal UI, desktop sidecar, web dashboard, editor extension).
//!
//! It is intentionally dependency-light (no runtime deps like tokio or axum)
//! so it can be used as a pure contract crate.
//!
//! ## Module Overview
//!
//! - [`ids`] — Typed ID wrappers (EventId, CommandId, SessionId, ConversationId)
//! - [`event`] — UIEvent, the outbound wire envelope
//! - [`command`] — UICommand, the inbound wire instruction
//! - [`event_types`] — UI-friendly and native event vocabularies
//! - [`ports`] — The adapter boundary trait (emit / recv_command)
//! - [`error`] — BridgeError, BridgeResult

pub mod command;
pub mod error;
pub mod event;
pub mod event_types;
pub mod ids;
pub mod ports;

pub use command::UICommand;
pub use error::{BridgeError, BridgeResult};
pub use event::UIEvent;
pub use event_types::{CommandTypes, NativeEventTypes, UiEventTypes};
pub use ids::{CommandId, ConversationId, EventId, SessionId};
pub use ports::UiAdapter;
