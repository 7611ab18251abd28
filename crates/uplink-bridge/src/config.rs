//! Bridge configuration.
//!
//! Deserialized from the host's profile; every field has a default so a
//! partial config object works. A [`Preset`] is a named bundle of raw-event
//! filter patterns; explicit `events` patterns win over the preset.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use uplink_protocol::{BridgeError, BridgeResult};

/// Which normalized vocabulary (or both) is produced from raw events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    /// Semantic vocabulary for simple front ends.
    #[default]
    UiFriendly,
    /// 1:1 pass-through of raw host event names.
    Native,
    /// Union of both vocabularies per raw event.
    Both,
}

/// Named bundles of raw-event filter patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Minimal,
    Standard,
    Verbose,
    Debug,
}

impl Preset {
    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            Self::Minimal => &["tool:post", "error*"],
            Self::Standard => &[
                "session:*",
                "content_block:*",
                "thinking:*",
                "tool:*",
                "orchestrator:*",
                "token_usage",
                "error*",
            ],
            Self::Verbose | Self::Debug => &["*"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_thinking: bool,
    pub show_tool_arguments: bool,
    pub show_tool_output: bool,
    /// Maximum chars for tool arguments/output; 0 disables truncation.
    pub truncate_output: usize,
    pub include_duration: bool,
    /// Emit `thinking_chunk` events per delta instead of only buffering.
    pub stream_thinking_chunks: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_thinking: true,
            show_tool_arguments: true,
            show_tool_output: true,
            truncate_output: 500,
            include_duration: true,
            stream_thinking_chunks: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Derive `agent_name` from hierarchical session ids (`<id>_<agent>`).
    pub parse_agent_names: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            parse_agent_names: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub max_events: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_events: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub preset: Option<Preset>,
    /// Raw-event glob patterns; when empty, the preset (or `standard`)
    /// applies.
    pub events: Vec<String>,
    pub event_mode: EventMode,
    pub display: DisplayConfig,
    pub agents: AgentConfig,
    pub history: HistoryConfig,
}

impl BridgeConfig {
    /// Compile the raw-event filter from explicit patterns, falling back to
    /// the preset and then to [`Preset::Standard`].
    pub fn compile_event_filter(&self) -> BridgeResult<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        if self.events.is_empty() {
            let preset = self.preset.unwrap_or(Preset::Standard);
            for pattern in preset.patterns() {
                builder.add(glob(pattern)?);
            }
        } else {
            for pattern in &self.events {
                builder.add(glob(pattern)?);
            }
        }
        builder
            .build()
            .map_err(|error| BridgeError::Config(error.to_string()))
    }
}

fn glob(pattern: &str) -> BridgeResult<Glob> {
    Glob::new(pattern).map_err(|error| {
        BridgeError::Config(format!("invalid event pattern {pattern:?}: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_follow_the_standard_preset() {
        let config = BridgeConfig::default();
        let filter = config.compile_event_filter().unwrap();
        assert!(filter.is_match("tool:pre"));
        assert!(filter.is_match("session:start"));
        assert!(filter.is_match("error:provider"));
        assert!(!filter.is_match("internal:debug"));
    }

    #[test]
    fn minimal_preset_narrows_the_filter() {
        let config = BridgeConfig {
            preset: Some(Preset::Minimal),
            ..Default::default()
        };
        let filter = config.compile_event_filter().unwrap();
        assert!(filter.is_match("tool:post"));
        assert!(!filter.is_match("tool:pre"));
        assert!(!filter.is_match("session:start"));
    }

    #[test]
    fn explicit_patterns_override_the_preset() {
        let config = BridgeConfig {
            preset: Some(Preset::Minimal),
            events: vec!["session:*".to_owned()],
            ..Default::default()
        };
        let filter = config.compile_event_filter().unwrap();
        assert!(filter.is_match("session:end"));
        assert!(!filter.is_match("tool:post"));
    }

    #[test]
    fn partial_config_deserializes_over_defaults() {
        let config: BridgeConfig = serde_json::from_value(json!({
            "event_mode": "native",
            "display": {"truncate_output": 100},
        }))
        .unwrap();
        assert_eq!(config.event_mode, EventMode::Native);
        assert_eq!(config.display.truncate_output, 100);
        assert!(config.display.show_thinking);
        assert!(!config.history.enabled);
    }

    #[test]
    fn verbose_preset_matches_everything() {
        let config = BridgeConfig {
            preset: Some(Preset::Verbose),
            ..Default::default()
        };
        let filter = config.compile_event_filter().unwrap();
        assert!(filter.is_match("anything:at_all"));
    }
}
