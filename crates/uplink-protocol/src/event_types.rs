//! Event type vocabularies.
//!
//! The bridge can speak two parallel vocabularies, selected by the
//! configured event mode:
//!
//! - [`NativeEventTypes`] — raw host event names passed through 1:1,
//!   for sophisticated UIs that want fine-grained streaming control.
//! - [`UiEventTypes`] — a smaller semantic vocabulary collapsed from the
//!   native events, for simple front ends.
//!
//! Both are open string sets; these constants cover the names the default
//! normalization table knows about.

/// Native host event names (pass-through mode).
pub struct NativeEventTypes;

impl NativeEventTypes {
    // Session lifecycle
    pub const SESSION_START: &str = "session:start";
    pub const SESSION_END: &str = "session:end";

    // Content streaming
    pub const CONTENT_BLOCK_START: &str = "content_block:start";
    pub const CONTENT_BLOCK_DELTA: &str = "content_block:delta";
    pub const CONTENT_BLOCK_END: &str = "content_block:end";
    pub const THINKING_DELTA: &str = "thinking:delta";

    // Tool execution
    pub const TOOL_PRE: &str = "tool:pre";
    pub const TOOL_POST: &str = "tool:post";

    // Orchestrator lifecycle
    pub const ORCHESTRATOR_COMPLETE: &str = "orchestrator:complete";

    // Provider lifecycle
    pub const PROVIDER_START: &str = "provider:start";
    pub const PROVIDER_END: &str = "provider:end";

    // Metadata
    pub const TOKEN_USAGE: &str = "token_usage";

    pub const ERROR: &str = "error";
}

/// UI-friendly semantic event names.
pub struct UiEventTypes;

impl UiEventTypes {
    // Session lifecycle
    pub const SESSION_START: &str = "session_start";
    pub const SESSION_END: &str = "session_end";

    // Thinking/reasoning (collapsed from content_block events)
    pub const THINKING_START: &str = "thinking_start";
    pub const THINKING_CHUNK: &str = "thinking_chunk";
    pub const THINKING_END: &str = "thinking_end";

    // Tool execution (mapped from tool:pre / tool:post)
    pub const TOOL_START: &str = "tool_start";
    pub const TOOL_PROGRESS: &str = "tool_progress";
    pub const TOOL_RESULT: &str = "tool_result";

    // Message streaming
    pub const MESSAGE_START: &str = "message_start";
    pub const MESSAGE_CHUNK: &str = "message_chunk";
    pub const MESSAGE_END: &str = "message_end";

    // Metadata
    pub const TOKEN_USAGE: &str = "token_usage";
    pub const CONTEXT_UPDATE: &str = "context_update";

    // Notifications
    pub const NOTIFICATION: &str = "notification";
    pub const ERROR: &str = "error";

    // Command responses
    pub const COMMAND_RESULT: &str = "command_result";
    pub const COMMAND_ERROR: &str = "command_error";
}

/// Standard inbound command types.
pub struct CommandTypes;

impl CommandTypes {
    pub const SUBMIT_PROMPT: &str = "submit_prompt";
    pub const CANCEL_GENERATION: &str = "cancel_generation";
    pub const SWITCH_SESSION: &str = "switch_session";
    pub const CREATE_SESSION: &str = "create_session";
    pub const DELETE_SESSION: &str = "delete_session";
    pub const UPDATE_CONFIG: &str = "update_config";
}
