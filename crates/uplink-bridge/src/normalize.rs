//! Normalization layer.
//!
//! Translates one raw host event (name + payload) into zero or more
//! [`UIEvent`]s according to the active [`EventMode`]:
//!
//! - `ui_friendly` — a fixed table collapses raw events into the semantic
//!   vocabulary. Some raw events buffer state (thinking deltas, open tool
//!   spans) and surface it on the terminating event; unrecognized names
//!   produce zero events so unknown host events never crash the bridge.
//! - `native` — 1:1 pass-through: `type` is the raw name, payload is
//!   forwarded unmodified. Unknown names still pass through; native mode
//!   makes no closed-vocabulary claim.
//! - `both` — the union of the two, `ui_friendly` outputs first, each with
//!   its own event id but shared session/conversation scoping.
//!
//! When one raw event collapses into several semantic outputs, the order
//! is fixed: closing events before starting events, thinking-related before
//! tool-related, with `token_usage` trailing the event that carried it.
//! Missing payload fields degrade to omitted fields or a skipped event,
//! never an error.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use uplink_protocol::{EventId, SessionId, UIEvent, UiEventTypes};

use crate::config::{AgentConfig, DisplayConfig, EventMode};

struct ThinkingSpan {
    event_id: EventId,
    buffer: String,
}

struct ToolSpan {
    event_id: EventId,
    started: Instant,
}

#[derive(Default)]
struct NormalizerState {
    /// Open thinking spans by block index.
    thinking: HashMap<u64, ThinkingSpan>,
    /// Open tool spans, keyed by invocation instance (`tool_use_id` when
    /// the payload carries one, else the tool name).
    tools: HashMap<String, ToolSpan>,
}

pub struct Normalizer {
    display: DisplayConfig,
    agents: AgentConfig,
    state: Mutex<NormalizerState>,
}

impl Normalizer {
    pub fn new(display: DisplayConfig, agents: AgentConfig) -> Self {
        Self {
            display,
            agents,
            state: Mutex::new(NormalizerState::default()),
        }
    }

    /// Map one raw event into its normalized outputs for `mode`.
    pub fn normalize(&self, mode: EventMode, name: &str, payload: &Map<String, Value>) -> Vec<UIEvent> {
        match mode {
            EventMode::UiFriendly => self.ui_friendly(name, payload),
            EventMode::Native => vec![self.native(name, payload)],
            EventMode::Both => {
                let mut events = self.ui_friendly(name, payload);
                events.push(self.native(name, payload));
                events
            }
        }
    }

    fn native(&self, name: &str, payload: &Map<String, Value>) -> UIEvent {
        self.scoped(UIEvent::new(name, payload.clone()), payload)
    }

    fn ui_friendly(&self, name: &str, payload: &Map<String, Value>) -> Vec<UIEvent> {
        match name {
            "session:start" => {
                let mut data = Map::new();
                data.insert(
                    "prompt".to_owned(),
                    Value::String(str_field(payload, "prompt").unwrap_or_default().to_owned()),
                );
                vec![self.scoped(UIEvent::new(UiEventTypes::SESSION_START, data), payload)]
            }

            "session:end" => {
                vec![self.scoped(
                    UIEvent::new(UiEventTypes::SESSION_END, payload.clone()),
                    payload,
                )]
            }

            "content_block:start" => self.on_block_start(payload),
            "content_block:delta" | "thinking:delta" => self.on_thinking_delta(payload),
            "content_block:end" => self.on_block_end(payload),

            "tool:pre" => self.on_tool_pre(payload),
            "tool:post" => self.on_tool_post(payload),

            "orchestrator:complete" => self.on_orchestrator_complete(payload),

            "token_usage" => usage_event(payload)
                .map(|event| self.scoped(event, payload))
                .into_iter()
                .collect(),

            other if other.starts_with("error") => {
                vec![self.scoped(
                    UIEvent::new(UiEventTypes::ERROR, payload.clone()),
                    payload,
                )]
            }

            // No mapping entry: deliberately dropped.
            _ => Vec::new(),
        }
    }

    fn on_block_start(&self, payload: &Map<String, Value>) -> Vec<UIEvent> {
        if !is_thinking_block(str_field(payload, "block_type")) || !self.display.show_thinking {
            return Vec::new();
        }
        let block_index = u64_field(payload, "block_index").unwrap_or(0);
        let event_id = EventId::new();
        self.state.lock().thinking.insert(
            block_index,
            ThinkingSpan {
                event_id: event_id.clone(),
                buffer: String::new(),
            },
        );

        let mut data = Map::new();
        data.insert("block_index".to_owned(), Value::from(block_index));
        vec![self.scoped(
            UIEvent::new(UiEventTypes::THINKING_START, data).with_event_id(event_id),
            payload,
        )]
    }

    fn on_thinking_delta(&self, payload: &Map<String, Value>) -> Vec<UIEvent> {
        let block_index = u64_field(payload, "block_index").unwrap_or(0);
        let delta = str_field(payload, "delta")
            .or_else(|| str_field(payload, "thinking"))
            .or_else(|| str_field(payload, "text"))
            .unwrap_or_default();

        let mut state = self.state.lock();
        let Some(span) = state.thinking.get_mut(&block_index) else {
            // Delta for a block we never opened (or thinking hidden).
            return Vec::new();
        };
        span.buffer.push_str(delta);
        let parent = span.event_id.clone();
        drop(state);

        if !self.display.stream_thinking_chunks || delta.is_empty() {
            return Vec::new();
        }
        let mut data = Map::new();
        data.insert("block_index".to_owned(), Value::from(block_index));
        data.insert("delta".to_owned(), Value::String(delta.to_owned()));
        vec![self.scoped(
            UIEvent::new(UiEventTypes::THINKING_CHUNK, data).with_parent(parent),
            payload,
        )]
    }

    fn on_block_end(&self, payload: &Map<String, Value>) -> Vec<UIEvent> {
        let block = payload
            .get("block")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let block_type = block
            .get("type")
            .and_then(Value::as_str)
            .or_else(|| str_field(payload, "block_type"));

        let mut events = Vec::new();
        if is_thinking_block(block_type) && self.display.show_thinking {
            let block_index = u64_field(payload, "block_index").unwrap_or(0);
            let span = self.state.lock().thinking.remove(&block_index);

            let block_text = block
                .get("thinking")
                .or_else(|| block.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let content = if block_text.is_empty() {
                span.as_ref().map(|span| span.buffer.clone()).unwrap_or_default()
            } else {
                block_text.to_owned()
            };

            let mut data = Map::new();
            data.insert("block_index".to_owned(), Value::from(block_index));
            data.insert("content".to_owned(), Value::String(content));
            let mut event = UIEvent::new(UiEventTypes::THINKING_END, data);
            if let Some(span) = span {
                event = event.with_parent(span.event_id);
            }
            events.push(self.scoped(event, payload));
        }

        // Closing event first, its usage metadata after.
        if let Some(usage) = payload.get("usage").and_then(Value::as_object) {
            events.push(self.scoped(token_usage_from(usage), payload));
        }
        events
    }

    fn on_tool_pre(&self, payload: &Map<String, Value>) -> Vec<UIEvent> {
        let tool_name = str_field(payload, "tool_name").unwrap_or("unknown");
        let event_id = EventId::new();
        self.state.lock().tools.insert(
            tool_span_key(payload, tool_name),
            ToolSpan {
                event_id: event_id.clone(),
                started: Instant::now(),
            },
        );

        let mut data = Map::new();
        data.insert("tool_name".to_owned(), Value::String(tool_name.to_owned()));
        if self.display.show_tool_arguments
            && let Some(input) = payload.get("tool_input")
        {
            let rendered = serde_json::to_string(input).unwrap_or_default();
            data.insert(
                "arguments".to_owned(),
                Value::String(truncate(&rendered, self.display.truncate_output)),
            );
        }
        vec![self.scoped(
            UIEvent::new(UiEventTypes::TOOL_START, data).with_event_id(event_id),
            payload,
        )]
    }

    fn on_tool_post(&self, payload: &Map<String, Value>) -> Vec<UIEvent> {
        let tool_name = str_field(payload, "tool_name").unwrap_or("unknown");
        let span = self
            .state
            .lock()
            .tools
            .remove(&tool_span_key(payload, tool_name));

        let (success, output) = tool_outcome(payload);

        // Unrecognized payload fields pass through for custom handlers.
        const KNOWN: &[&str] = &[
            "tool_name",
            "tool_use_id",
            "tool_input",
            "tool_response",
            "result",
            "session_id",
            "conversation_id",
        ];
        let mut data: Map<String, Value> = payload
            .iter()
            .filter(|(key, _)| !KNOWN.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        data.insert("tool_name".to_owned(), Value::String(tool_name.to_owned()));
        data.insert("success".to_owned(), Value::Bool(success));
        if self.display.show_tool_output {
            data.insert(
                "output".to_owned(),
                Value::String(truncate(&output, self.display.truncate_output)),
            );
        }
        if self.display.include_duration
            && let Some(span) = &span
        {
            data.insert(
                "duration_ms".to_owned(),
                Value::from(span.started.elapsed().as_millis() as u64),
            );
        }

        let mut event = UIEvent::new(UiEventTypes::TOOL_RESULT, data);
        if let Some(span) = span {
            event = event.with_parent(span.event_id);
        }
        vec![self.scoped(event, payload)]
    }

    fn on_orchestrator_complete(&self, payload: &Map<String, Value>) -> Vec<UIEvent> {
        let content = str_field(payload, "content").unwrap_or_default();
        if content.is_empty() {
            return Vec::new();
        }
        let mut data = Map::new();
        data.insert("content".to_owned(), Value::String(content.to_owned()));
        data.insert(
            "role".to_owned(),
            Value::String(str_field(payload, "role").unwrap_or("assistant").to_owned()),
        );
        for key in ["turn_count", "status", "orchestrator"] {
            if let Some(value) = payload.get(key) {
                data.insert(key.to_owned(), value.clone());
            }
        }
        vec![self.scoped(UIEvent::new(UiEventTypes::MESSAGE_END, data), payload)]
    }

    /// Apply session/conversation scoping and agent-name parsing from the
    /// raw payload.
    fn scoped(&self, mut event: UIEvent, payload: &Map<String, Value>) -> UIEvent {
        if let Some(session) = str_field(payload, "session_id") {
            let session = SessionId::from(session);
            if self.agents.parse_agent_names
                && let Some(agent) = session.agent_suffix()
            {
                event = event.with_agent_name(agent);
            }
            event = event.with_session(session);
        }
        if let Some(conversation) = str_field(payload, "conversation_id") {
            event = event.with_conversation(conversation.into());
        }
        event
    }
}

fn is_thinking_block(block_type: Option<&str>) -> bool {
    matches!(block_type, Some("thinking" | "reasoning"))
}

fn str_field<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn u64_field(payload: &Map<String, Value>, key: &str) -> Option<u64> {
    payload.get(key).and_then(Value::as_u64)
}

fn tool_span_key(payload: &Map<String, Value>, tool_name: &str) -> String {
    str_field(payload, "tool_use_id")
        .unwrap_or(tool_name)
        .to_owned()
}

fn tool_outcome(payload: &Map<String, Value>) -> (bool, String) {
    let result = payload.get("tool_response").or_else(|| payload.get("result"));
    match result {
        Some(Value::Object(map)) => {
            let success = map.get("success").and_then(Value::as_bool).unwrap_or(true);
            let output = match map.get("output") {
                Some(Value::String(text)) => text.clone(),
                Some(value) => value.to_string(),
                None => Value::Object(map.clone()).to_string(),
            };
            (success, output)
        }
        Some(Value::String(text)) => (true, text.clone()),
        Some(value) => (true, value.to_string()),
        None => (true, String::new()),
    }
}

fn usage_event(usage: &Map<String, Value>) -> Option<UIEvent> {
    if usage.is_empty() {
        return None;
    }
    Some(token_usage_from(usage))
}

fn token_usage_from(usage: &Map<String, Value>) -> UIEvent {
    let mut data = Map::new();
    data.insert(
        "input_tokens".to_owned(),
        Value::from(u64_field(usage, "input_tokens").unwrap_or(0)),
    );
    data.insert(
        "output_tokens".to_owned(),
        Value::from(u64_field(usage, "output_tokens").unwrap_or(0)),
    );
    UIEvent::new(UiEventTypes::TOKEN_USAGE, data)
}

/// Char-boundary-safe truncation with a trailing elision note.
pub(crate) fn truncate(text: &str, limit: usize) -> String {
    if limit == 0 {
        return text.to_owned();
    }
    let total = text.chars().count();
    if total <= limit {
        return text.to_owned();
    }
    let kept: String = text.chars().take(limit).collect();
    format!("{kept}... ({} more chars)", total - limit)
}
