//! UIEvent — the outbound wire envelope.
//!
//! One `UIEvent` is one observable occurrence delivered to a UI, regardless
//! of transport. Events are immutable once constructed (builder methods
//! consume `self`) and serialize to a single JSON object:
//!
//! ```json
//! {"type": "tool_start", "timestamp": "2026-08-07T12:00:00Z",
//!  "data": {"tool_name": "todo"}, "event_id": "…", "session_id": "…"}
//! ```
//!
//! Optional correlation fields are omitted from the wire when absent.
//! Unknown top-level keys found while decoding are preserved in [`UIEvent::extra`]
//! and re-serialized, so UI-added fields survive a round-trip through the
//! bridge.

use crate::error::BridgeResult;
use crate::event_types::UiEventTypes;
use crate::ids::{ConversationId, EventId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIEvent {
    /// Event kind tag. Open vocabulary; see [`crate::event_types`].
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event was produced (not when the underlying host action
    /// occurred, if different).
    pub timestamp: DateTime<Utc>,
    /// Event-specific payload. Shape is determined by `type` and is not
    /// validated by the bridge.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Process-unique id, generated at construction.
    #[serde(default)]
    pub event_id: EventId,
    /// Correlates a completion event with its matching start event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// Originating sub-agent, for delegated tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Platform-specific rendering hints. Consumers must ignore keys they
    /// do not recognize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Map<String, Value>>,
    /// Unknown top-level keys preserved from decoded input.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UIEvent {
    /// Construct an event with a fresh id and the current timestamp.
    pub fn new(event_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            data,
            event_id: EventId::new(),
            parent_event_id: None,
            session_id: None,
            conversation_id: None,
            agent_name: None,
            hints: None,
            extra: Map::new(),
        }
    }

    /// Diagnostic `error` event carrying the failing component and message.
    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("source".to_owned(), Value::String(source.into()));
        data.insert("message".to_owned(), Value::String(message.into()));
        Self::new(UiEventTypes::ERROR, data)
    }

    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn with_parent(mut self, parent: EventId) -> Self {
        self.parent_event_id = Some(parent);
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    pub fn with_hints(mut self, hints: Map<String, Value>) -> Self {
        self.hints = Some(hints);
        self
    }

    /// Serialize to one JSON object (no trailing newline).
    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_of(pairs: Value) -> Map<String, Value> {
        match pairs {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn roundtrip_preserves_all_fields() {
        let event = UIEvent::new(
            "tool_result",
            data_of(json!({
                "tool_name": "todo",
                "output": {"items": [1, 2, 3], "nested": {"ok": true}},
                "success": true,
            })),
        )
        .with_parent(EventId::from("parent-1"))
        .with_session(SessionId::from("sess-1"))
        .with_conversation(ConversationId::from("conv-1"))
        .with_agent_name("zen-architect")
        .with_hints(data_of(json!({"priority": "high"})));

        let encoded = event.to_json().unwrap();
        let decoded = UIEvent::from_json(&encoded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn optional_fields_are_omitted_on_the_wire() {
        let event = UIEvent::new("session_start", Map::new());
        let value = serde_json::to_value(&event).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("type"));
        assert!(object.contains_key("timestamp"));
        assert!(object.contains_key("event_id"));
        assert!(!object.contains_key("parent_event_id"));
        assert!(!object.contains_key("session_id"));
        assert!(!object.contains_key("hints"));
    }

    #[test]
    fn unknown_top_level_keys_are_preserved() {
        let raw = json!({
            "type": "message_end",
            "timestamp": "2026-08-07T12:00:00Z",
            "data": {"content": "done"},
            "event_id": "E1",
            "uiInjectedField": {"anything": 42},
        })
        .to_string();

        let decoded = UIEvent::from_json(&raw).unwrap();
        assert_eq!(decoded.extra["uiInjectedField"]["anything"], 42);

        let reencoded: Value = serde_json::from_str(&decoded.to_json().unwrap()).unwrap();
        assert_eq!(reencoded["uiInjectedField"]["anything"], 42);
    }

    #[test]
    fn missing_event_id_is_defaulted() {
        let raw = json!({
            "type": "error",
            "timestamp": "2026-08-07T12:00:00Z",
            "data": {},
        })
        .to_string();
        let decoded = UIEvent::from_json(&raw).unwrap();
        assert!(!decoded.event_id.as_str().is_empty());
    }

    #[test]
    fn error_constructor_carries_source_and_message() {
        let event = UIEvent::error("adapter", "socket closed");
        assert_eq!(event.event_type, UiEventTypes::ERROR);
        assert_eq!(event.data["source"], "adapter");
        assert_eq!(event.data["message"], "socket closed");
    }

    #[test]
    fn fresh_events_have_unique_ids() {
        let a = UIEvent::new("x", Map::new());
        let b = UIEvent::new("x", Map::new());
        assert_ne!(a.event_id, b.event_id);
    }
}
