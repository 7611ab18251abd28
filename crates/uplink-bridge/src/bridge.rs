//! Bridge orchestrator.
//!
//! [`UiBridge`] owns the registries (override handlers, enrichers, command
//! handlers), the active adapter slot, the normalizer, and the optional
//! event history. One bridge instance is the explicit context for every
//! dispatch call — there is no ambient process-wide state.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use globset::GlobSet;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uplink_protocol::{BridgeResult, UIEvent, UiAdapter, UICommand, UiEventTypes};

use crate::config::BridgeConfig;
use crate::normalize::Normalizer;
use crate::pipeline::{self, Enricher, OverrideHandler};

/// Host-side callback for one inbound command type.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, data: Map<String, Value>) -> BridgeResult<Value>;
}

/// Adapter for plain async closures as command handlers.
pub struct CommandFn<F>(pub F);

#[async_trait]
impl<F, Fut> CommandHandler for CommandFn<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = BridgeResult<Value>> + Send,
{
    async fn call(&self, data: Map<String, Value>) -> BridgeResult<Value> {
        (self.0)(data).await
    }
}

pub struct UiBridge {
    config: BridgeConfig,
    filter: GlobSet,
    normalizer: Normalizer,
    adapter: RwLock<Option<Arc<dyn UiAdapter>>>,
    handlers: RwLock<HashMap<String, Vec<Arc<dyn OverrideHandler>>>>,
    enrichers: RwLock<HashMap<String, Vec<Arc<dyn Enricher>>>>,
    commands: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
    history: Mutex<VecDeque<UIEvent>>,
}

impl UiBridge {
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        let filter = config.compile_event_filter()?;
        let normalizer = Normalizer::new(config.display.clone(), config.agents.clone());
        Ok(Self {
            config,
            filter,
            normalizer,
            adapter: RwLock::new(None),
            handlers: RwLock::new(HashMap::new()),
            enrichers: RwLock::new(HashMap::new()),
            commands: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // ─── Registration ──────────────────────────────────────────────

    /// Replace the active adapter. Last writer wins; not synchronized
    /// against in-flight `dispatch` calls.
    pub fn set_adapter(&self, adapter: Arc<dyn UiAdapter>) {
        *self.adapter.write() = Some(adapter);
    }

    pub fn get_adapter(&self) -> Option<Arc<dyn UiAdapter>> {
        self.adapter.read().clone()
    }

    pub fn clear_adapter(&self) {
        *self.adapter.write() = None;
    }

    /// Append an override handler for one raw event name. Intended for
    /// startup-time configuration.
    pub fn register_handler(
        &self,
        event_name: impl Into<String>,
        handler: impl OverrideHandler + 'static,
    ) {
        self.handlers
            .write()
            .entry(event_name.into())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Append an enricher for one raw event name.
    pub fn register_enricher(
        &self,
        event_name: impl Into<String>,
        enricher: impl Enricher + 'static,
    ) {
        self.enrichers
            .write()
            .entry(event_name.into())
            .or_default()
            .push(Arc::new(enricher));
    }

    /// Register the callback for one command type, replacing any previous
    /// registration for that type.
    pub fn register_command(
        &self,
        command_type: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) {
        self.commands
            .write()
            .insert(command_type.into(), Arc::new(handler));
    }

    // ─── Outbound path ─────────────────────────────────────────────

    /// Run one raw host event through filtering, the interception
    /// pipeline, and normalization, emitting every resulting event to the
    /// active adapter.
    ///
    /// Never fails toward the host: internal errors are converted into
    /// `error`-typed events and emitted instead. Returns the emitted
    /// events.
    pub async fn dispatch(&self, name: &str, payload: Map<String, Value>) -> Vec<UIEvent> {
        if !self.filter.is_match(name) {
            debug!(event = name, "raw event filtered out");
            return Vec::new();
        }

        let handlers = self.handlers.read().get(name).cloned().unwrap_or_default();
        let enrichers = self.enrichers.read().get(name).cloned().unwrap_or_default();
        let mode = self.config.event_mode;
        let default =
            |raw: &str, payload: &Map<String, Value>| self.normalizer.normalize(mode, raw, payload);

        let mut payload = payload;
        let output = pipeline::run(&handlers, &enrichers, &default, name, &mut payload);

        let mut events = output.events;
        for failure in output.failures {
            events.push(UIEvent::error("pipeline", failure.to_string()));
        }

        for event in &events {
            self.emit(event.clone()).await;
        }
        events
    }

    /// Hand one event to the active adapter, recording it in the history
    /// ring when enabled. An adapter failure degrades to one diagnostic
    /// `error` event (single attempt — a failing diagnostic is only
    /// logged).
    pub async fn emit(&self, event: UIEvent) {
        self.record(&event);
        let adapter = self.get_adapter();
        let Some(adapter) = adapter else {
            return;
        };
        if let Err(error) = adapter.emit(event).await {
            warn!(%error, "adapter emit failed");
            let diagnostic = UIEvent::error("adapter", error.to_string());
            self.record(&diagnostic);
            if let Err(error) = adapter.emit(diagnostic).await {
                warn!(%error, "adapter diagnostic emit failed");
            }
        }
    }

    fn record(&self, event: &UIEvent) {
        if !self.config.history.enabled {
            return;
        }
        let mut history = self.history.lock();
        history.push_back(event.clone());
        while history.len() > self.config.history.max_events {
            history.pop_front();
        }
    }

    /// Events recorded so far, oldest first (empty unless history is
    /// enabled).
    pub fn event_history(&self) -> Vec<UIEvent> {
        self.history.lock().iter().cloned().collect()
    }

    /// Re-emit previously captured events through the active adapter.
    pub async fn replay(&self, events: Vec<UIEvent>) {
        for event in events {
            self.emit(event).await;
        }
    }

    // ─── Inbound path ──────────────────────────────────────────────

    /// Dispatch one UI command to its registered callback.
    ///
    /// Unknown command types and failing callbacks are reported as `error`
    /// events, never as a crash; a successful callback additionally emits
    /// a `command_result` event correlated by command id.
    pub async fn handle_command(&self, command: UICommand) -> Option<Value> {
        let handler = self.commands.read().get(&command.command_type).cloned();
        let Some(handler) = handler else {
            warn!(command = %command.command_type, "unknown command type");
            self.emit(UIEvent::error(
                "command",
                format!("unknown command type: {}", command.command_type),
            ))
            .await;
            return None;
        };

        match handler.call(command.data.clone()).await {
            Ok(result) => {
                let mut data = Map::new();
                data.insert(
                    "command_id".to_owned(),
                    Value::String(command.command_id.to_string()),
                );
                data.insert(
                    "command_type".to_owned(),
                    Value::String(command.command_type.clone()),
                );
                data.insert("result".to_owned(), result.clone());
                self.emit(UIEvent::new(UiEventTypes::COMMAND_RESULT, data)).await;
                Some(result)
            }
            Err(error) => {
                warn!(command = %command.command_type, %error, "command handler failed");
                self.emit(UIEvent::error("command", error.to_string())).await;
                None
            }
        }
    }

    /// Spawn a background task pumping inbound commands from `adapter`
    /// into [`UiBridge::handle_command`]. Malformed frames surface as
    /// `error` events without stopping the loop.
    pub fn spawn_command_relay(self: &Arc<Self>, adapter: Arc<dyn UiAdapter>) -> CommandRelay {
        let bridge = self.clone();
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            debug!("command relay started");
            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    inbound = adapter.recv_command() => match inbound {
                        None => break,
                        Some(Ok(command)) => {
                            bridge.handle_command(command).await;
                        }
                        Some(Err(error)) => {
                            warn!(%error, "dropping malformed inbound command");
                            bridge
                                .emit(UIEvent::error("transport", error.to_string()))
                                .await;
                        }
                    },
                }
            }
            debug!("command relay stopped");
        });
        CommandRelay { token, handle }
    }
}

/// Handle to a running command relay task.
pub struct CommandRelay {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl CommandRelay {
    /// Request cooperative termination; observed within one wait cycle.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EventMode, HistoryConfig, Preset};
    use crate::pipeline::Next;
    use serde_json::json;
    use std::sync::Arc;
    use uplink_adapters::{MockAdapter, QueueAdapter};
    use uplink_protocol::BridgeError;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn bridge_with(config: BridgeConfig) -> (Arc<UiBridge>, Arc<MockAdapter>) {
        let bridge = Arc::new(UiBridge::new(config).unwrap());
        let adapter = Arc::new(MockAdapter::new());
        bridge.set_adapter(adapter.clone());
        (bridge, adapter)
    }

    fn open_config(event_mode: EventMode) -> BridgeConfig {
        BridgeConfig {
            events: vec!["*".to_owned()],
            event_mode,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn tool_lifecycle_reaches_the_adapter_correlated() {
        let (bridge, adapter) = bridge_with(BridgeConfig::default());

        bridge
            .dispatch(
                "tool:pre",
                payload(json!({"tool_name": "todo", "tool_input": {"action": "list"}})),
            )
            .await;
        bridge
            .dispatch(
                "tool:post",
                payload(json!({"tool_name": "todo", "tool_response": {"output": "ok"}})),
            )
            .await;

        let starts = adapter.events_of_type(UiEventTypes::TOOL_START);
        let results = adapter.events_of_type(UiEventTypes::TOOL_RESULT);
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].data["tool_name"], "todo");
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].parent_event_id,
            Some(starts[0].event_id.clone())
        );
    }

    #[tokio::test]
    async fn unknown_command_produces_exactly_one_error_event() {
        let (bridge, adapter) = bridge_with(BridgeConfig::default());

        let result = bridge
            .handle_command(UICommand::new("unknown_command", Map::new()))
            .await;

        assert!(result.is_none());
        assert_eq!(adapter.events().len(), 1);
        let event = adapter.last_event().unwrap();
        assert_eq!(event.event_type, UiEventTypes::ERROR);
        assert!(
            event.data["message"]
                .as_str()
                .unwrap()
                .contains("unknown_command")
        );
    }

    #[tokio::test]
    async fn registered_command_runs_and_reports_its_result() {
        let (bridge, adapter) = bridge_with(BridgeConfig::default());
        bridge.register_command(
            "submit_prompt",
            CommandFn(|data: Map<String, Value>| async move {
                Ok::<_, BridgeError>(json!({"accepted": data["prompt"]}))
            }),
        );

        let result = bridge
            .handle_command(UICommand::new(
                "submit_prompt",
                payload(json!({"prompt": "hello"})),
            ))
            .await;

        assert_eq!(result.unwrap()["accepted"], "hello");
        let results = adapter.events_of_type(UiEventTypes::COMMAND_RESULT);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data["command_type"], "submit_prompt");
    }

    #[tokio::test]
    async fn failing_command_handler_degrades_to_an_error_event() {
        let (bridge, adapter) = bridge_with(BridgeConfig::default());
        bridge.register_command(
            "cancel_generation",
            CommandFn(|_data: Map<String, Value>| async move {
                Err::<Value, _>(BridgeError::CommandFailed {
                    command: "cancel_generation".to_owned(),
                    message: "nothing running".to_owned(),
                })
            }),
        );

        let result = bridge
            .handle_command(UICommand::new("cancel_generation", Map::new()))
            .await;
        assert!(result.is_none());
        assert_eq!(adapter.events_of_type(UiEventTypes::ERROR).len(), 1);
    }

    #[tokio::test]
    async fn throwing_enricher_never_suppresses_the_primary() {
        let (bridge, adapter) = bridge_with(open_config(EventMode::UiFriendly));
        bridge.register_enricher(
            "tool:pre",
            |name: &str, _payload: &Map<String, Value>, _primary: &[UIEvent]| {
                Err::<Vec<UIEvent>, _>(BridgeError::Enricher {
                    event: name.to_owned(),
                    message: "always fails".to_owned(),
                })
            },
        );

        bridge
            .dispatch("tool:pre", payload(json!({"tool_name": "todo"})))
            .await;
        // Primary survives, plus one pipeline error event.
        assert_eq!(adapter.events_of_type(UiEventTypes::TOOL_START).len(), 1);
        assert_eq!(adapter.events_of_type(UiEventTypes::ERROR).len(), 1);

        // Other raw event names are unaffected.
        adapter.clear();
        bridge
            .dispatch("session:start", payload(json!({"prompt": "hi"})))
            .await;
        assert_eq!(adapter.events_of_type(UiEventTypes::ERROR).len(), 0);
        assert_eq!(adapter.events_of_type(UiEventTypes::SESSION_START).len(), 1);
    }

    #[tokio::test]
    async fn emission_order_is_primary_then_enrichers_and_stable() {
        for _run in 0..3 {
            let (bridge, adapter) = bridge_with(open_config(EventMode::UiFriendly));
            bridge.register_enricher(
                "session:start",
                |_name: &str, _payload: &Map<String, Value>, _primary: &[UIEvent]| {
                    Ok(vec![UIEvent::new("derived:first", Map::new())])
                },
            );
            bridge.register_enricher(
                "session:start",
                |_name: &str, _payload: &Map<String, Value>, _primary: &[UIEvent]| {
                    Ok(vec![UIEvent::new("derived:second", Map::new())])
                },
            );

            bridge
                .dispatch("session:start", payload(json!({"prompt": "go"})))
                .await;
            let types: Vec<String> = adapter
                .events()
                .iter()
                .map(|event| event.event_type.clone())
                .collect();
            assert_eq!(
                types,
                vec!["session_start", "derived:first", "derived:second"]
            );
        }
    }

    #[tokio::test]
    async fn override_handler_can_replace_the_default() {
        let (bridge, adapter) = bridge_with(open_config(EventMode::UiFriendly));
        bridge.register_handler(
            "tool:post",
            |_name: &str, _payload: &mut Map<String, Value>, _next: Next<'_>| {
                Ok(vec![UIEvent::new("custom_result", Map::new())])
            },
        );

        let events = bridge
            .dispatch("tool:post", payload(json!({"tool_name": "todo"})))
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(adapter.last_event().unwrap().event_type, "custom_result");
    }

    #[tokio::test]
    async fn override_handler_can_mutate_and_delegate() {
        let (bridge, adapter) = bridge_with(open_config(EventMode::UiFriendly));
        bridge.register_handler(
            "tool:post",
            |name: &str, payload: &mut Map<String, Value>, next: Next<'_>| {
                payload.insert("badge".to_owned(), json!("⚡"));
                Ok(next.run(name, payload))
            },
        );

        bridge
            .dispatch(
                "tool:post",
                payload(json!({"tool_name": "todo", "result": {"output": "ok"}})),
            )
            .await;
        let result = adapter.last_event().unwrap();
        assert_eq!(result.event_type, UiEventTypes::TOOL_RESULT);
        assert_eq!(result.data["badge"], "⚡");
    }

    #[tokio::test]
    async fn both_mode_equals_the_union_of_the_other_modes() {
        let raw = json!({"tool_name": "todo", "session_id": "s1"});

        let (ui_bridge, ui_adapter) = bridge_with(open_config(EventMode::UiFriendly));
        ui_bridge.dispatch("tool:pre", payload(raw.clone())).await;
        let (native_bridge, native_adapter) = bridge_with(open_config(EventMode::Native));
        native_bridge.dispatch("tool:pre", payload(raw.clone())).await;
        let (both_bridge, both_adapter) = bridge_with(open_config(EventMode::Both));
        both_bridge.dispatch("tool:pre", payload(raw)).await;

        let mut expected: Vec<String> = ui_adapter
            .events()
            .iter()
            .chain(native_adapter.events().iter())
            .map(|event| event.event_type.clone())
            .collect();
        let mut actual: Vec<String> = both_adapter
            .events()
            .iter()
            .map(|event| event.event_type.clone())
            .collect();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn filtered_events_produce_nothing() {
        let (bridge, adapter) = bridge_with(BridgeConfig {
            preset: Some(Preset::Minimal),
            ..Default::default()
        });

        let events = bridge
            .dispatch("tool:pre", payload(json!({"tool_name": "todo"})))
            .await;
        assert!(events.is_empty());
        assert!(adapter.events().is_empty());
    }

    #[tokio::test]
    async fn dispatch_without_adapter_still_returns_events() {
        let bridge = UiBridge::new(BridgeConfig::default()).unwrap();
        let events = bridge
            .dispatch("session:start", payload(json!({"prompt": "hi"})))
            .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn history_ring_is_capped() {
        let config = BridgeConfig {
            events: vec!["*".to_owned()],
            history: HistoryConfig {
                enabled: true,
                max_events: 3,
            },
            ..Default::default()
        };
        let (bridge, _adapter) = bridge_with(config);

        for index in 0..5 {
            bridge
                .dispatch("session:start", payload(json!({"prompt": index.to_string()})))
                .await;
        }
        let history = bridge.event_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].data["prompt"], "2");
        assert_eq!(history[2].data["prompt"], "4");
    }

    #[tokio::test]
    async fn broken_adapter_degrades_to_logged_diagnostics() {
        let config = BridgeConfig {
            history: HistoryConfig {
                enabled: true,
                max_events: 10,
            },
            ..Default::default()
        };
        let bridge = UiBridge::new(config).unwrap();
        let queue = Arc::new(QueueAdapter::new(4));
        drop(queue.take_event_receiver());
        bridge.set_adapter(queue);

        // Does not panic or error toward the host.
        bridge
            .dispatch("session:start", payload(json!({"prompt": "hi"})))
            .await;
        let history = bridge.event_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type, UiEventTypes::SESSION_START);
        assert_eq!(history[1].event_type, UiEventTypes::ERROR);
    }

    #[tokio::test]
    async fn command_relay_pumps_commands_and_reports_bad_frames() {
        let (bridge, adapter) = bridge_with(BridgeConfig::default());
        bridge.register_command(
            "submit_prompt",
            CommandFn(|_data: Map<String, Value>| async move { Ok::<_, BridgeError>(json!("ok")) }),
        );

        let relay = bridge.spawn_command_relay(adapter.clone());
        adapter.inject_command(UICommand::new("submit_prompt", Map::new()));
        adapter.inject_decode_error("truncated frame");

        // Wait until both inbound items have been processed.
        for _ in 0..50 {
            if adapter.events().len() >= 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(
            adapter.events_of_type(UiEventTypes::COMMAND_RESULT).len(),
            1
        );
        assert_eq!(adapter.events_of_type(UiEventTypes::ERROR).len(), 1);

        relay.stop();
        relay.join().await;
    }
}
