//! Typed ID wrappers for the bridge wire protocol.
//!
//! IDs are opaque String wrappers (serde-transparent). The bridge generates
//! UUID v4 values; UIs may round-trip ids they received without caring about
//! the generation strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random (UUID v4) id.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// View as string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(
    /// Process-unique identifier for an emitted event. Never reused.
    EventId
);
typed_id!(
    /// Identifier for an inbound command, used for response correlation.
    CommandId
);
typed_id!(
    /// Identifier of the host session an event belongs to.
    SessionId
);
typed_id!(
    /// Identifier of the UI-side conversation thread.
    ConversationId
);

impl SessionId {
    /// Sub-agent sessions carry a hierarchical id of the form
    /// `<parent>_<agent>`; returns the agent suffix when present.
    pub fn agent_suffix(&self) -> Option<&str> {
        self.0.split_once('_').map(|(_, agent)| agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_new_is_unique() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn typed_id_serde_is_transparent() {
        let id = EventId::from("EVT001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"EVT001\"");
        let back: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn session_id_agent_suffix() {
        assert_eq!(
            SessionId::from("sess-1_zen-architect").agent_suffix(),
            Some("zen-architect")
        );
        assert_eq!(SessionId::from("sess-1").agent_suffix(), None);
    }

    #[test]
    fn typed_id_display_matches_inner() {
        let id = ConversationId::from("conv-9");
        assert_eq!(id.to_string(), "conv-9");
        assert_eq!(id.as_str(), "conv-9");
    }
}
