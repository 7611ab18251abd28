//! UICommand — the inbound wire instruction.
//!
//! Commands flow from a UI back to the host: submit a prompt, cancel
//! generation, switch session. The `type` set is closed but extensible;
//! unknown types are rejected by the bridge with an `error` event, never a
//! crash.

use crate::error::BridgeResult;
use crate::ids::CommandId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UICommand {
    /// Command kind tag; see [`crate::event_types::CommandTypes`].
    #[serde(rename = "type")]
    pub command_type: String,
    /// Command payload, shape determined by `type`.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Unique id for response correlation. Defaulted when absent in
    /// decoded input.
    #[serde(default)]
    pub command_id: CommandId,
}

impl UICommand {
    pub fn new(command_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            command_type: command_type.into(),
            data,
            command_id: CommandId::new(),
        }
    }

    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
