//! # uplink-bridge — Event Bridge Core
//!
//! Bridges a host's internal event stream to arbitrary UI front ends over
//! the transport-agnostic uplink protocol. One [`UiBridge`] instance:
//!
//! 1. Receives raw host events (`name` + JSON payload) via
//!    [`UiBridge::dispatch`].
//! 2. Runs the two-phase interception pipeline — override handlers, then
//!    enrichers — around the default [normalization](normalize) table.
//! 3. Emits every resulting [`uplink_protocol::UIEvent`] to the active
//!    adapter.
//! 4. Dispatches inbound [`uplink_protocol::UICommand`]s to registered
//!    host callbacks.
//!
//! No internal failure propagates to the host: the bridge degrades to
//! emitting `error`-typed diagnostic events.
//!
//! Scheduling is cooperative (tokio): `dispatch`, adapter I/O, and the
//! [forwarder] loops are suspension points, not parallel execution. The
//! bridge provides no locking for handler side effects across concurrent
//! dispatches.
//!
//! ## Module Overview
//!
//! - [`config`] — BridgeConfig, presets, event mode, display options
//! - [`normalize`] — raw event → UIEvent mapping per event mode
//! - [`pipeline`] — override handler chain + enrichers
//! - [`bridge`] — the orchestrator and command relay
//! - [`forwarder`] — background relays from a queue adapter to an
//!   external sender

pub mod bridge;
pub mod config;
pub mod forwarder;
pub mod normalize;
pub mod pipeline;

pub use bridge::{CommandFn, CommandHandler, CommandRelay, UiBridge};
pub use config::{AgentConfig, BridgeConfig, DisplayConfig, EventMode, HistoryConfig, Preset};
pub use forwarder::{BatchForwarder, EventForwarder, ForwarderHandle};
pub use normalize::Normalizer;
pub use pipeline::{Enricher, Next, OverrideHandler};
