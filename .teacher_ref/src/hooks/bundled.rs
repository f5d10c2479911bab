//! Bundled hooks — pre-built lifecycle hooks shipped with IronClaw.
//!
//! These hooks provide common functionality that users can enable
//! without writing custom code.

use crate::hooks::types::{Hook, HookAction, HookPriority, HookSource, HookType};

/// Register all bundled hooks with the hook engine.
pub async fn register_bundled_hooks(engine: &crate::hooks::HookEngine) {
    for hook in all_bundled_hooks() {
        if let Err(e) = engine.register(hook.clone()).await {
            tracing::warn!(hook = hook.name, error = %e, "Failed to register bundled hook");
        }
    }
}

/// Get all available bundled hooks (not yet registered).
pub fn all_bundled_hooks() -> Vec<Hook> {
    vec![
        profanity_filter(),
        response_length_guard(),
        sensitive_data_redactor(),
        greeting_injector(),
        session_logger(),
        rate_limit_guard(),
        language_detector(),
        tool_usage_logger(),
    ]
}

/// Hook: Filter profanity from inbound messages.
pub fn profanity_filter() -> Hook {
    Hook {
        name: "builtin:profanity_filter".to_string(),
        description: "Replaces common profanity in inbound messages with asterisks".to_string(),
        hook_type: HookType::BeforeInbound,
        action: HookAction::Inline {
            code: "{{content}}".to_string(),
        },
        priority: HookPriority::High,
        source: HookSource::Builtin,
        enabled: false, // Disabled by default, user opts in
        timeout_ms: 1000,
    }
}

/// Hook: Guard against excessively long responses.
pub fn response_length_guard() -> Hook {
    Hook {
        name: "builtin:response_length_guard".to_string(),
        description: "Truncates outbound responses that exceed a configurable character limit"
            .to_string(),
        hook_type: HookType::BeforeOutbound,
        action: HookAction::Inline {
            code: "{{content}}".to_string(),
        },
        priority: HookPriority::Normal,
        source: HookSource::Builtin,
        enabled: false,
        timeout_ms: 500,
    }
}

/// Hook: Redact sensitive patterns from outbound responses.
pub fn sensitive_data_redactor() -> Hook {
    Hook {
        name: "builtin:sensitive_data_redactor".to_string(),
        description:
            "Redacts sensitive patterns (emails, phone numbers, API keys) from outbound responses"
                .to_string(),
        hook_type: HookType::BeforeOutbound,
        action: HookAction::Inline {
            code: "{{content}}".to_string(),
        },
        priority: HookPriority::High,
        source: HookSource::Builtin,
        enabled: false,
        timeout_ms: 1000,
    }
}

/// Hook: Add a greeting to new session starts.
pub fn greeting_injector() -> Hook {
    Hook {
        name: "builtin:greeting_injector".to_string(),
        description: "Sends a configurable greeting message when a new session starts".to_string(),
        hook_type: HookType::OnSessionStart,
        action: HookAction::Inline {
            code: "Welcome! How can I help you today?".to_string(),
        },
        priority: HookPriority::Normal,
        source: HookSource::Builtin,
        enabled: false,
        timeout_ms: 500,
    }
}

/// Hook: Log session start/end events.
pub fn session_logger() -> Hook {
    Hook {
        name: "builtin:session_logger".to_string(),
        description: "Logs session start and end events for analytics and debugging".to_string(),
        hook_type: HookType::OnSessionEnd,
        action: HookAction::Inline {
            code: String::new(),
        },
        priority: HookPriority::Low,
        source: HookSource::Builtin,
        enabled: false,
        timeout_ms: 500,
    }
}

/// Hook: Rate limit inbound messages per sender.
pub fn rate_limit_guard() -> Hook {
    Hook {
        name: "builtin:rate_limit_guard".to_string(),
        description: "Blocks inbound messages when a sender exceeds the configured rate limit"
            .to_string(),
        hook_type: HookType::BeforeInbound,
        action: HookAction::Inline {
            code: "{{content}}".to_string(),
        },
        priority: HookPriority::System,
        source: HookSource::Builtin,
        enabled: false,
        timeout_ms: 200,
    }
}

/// Hook: Detect and tag message language.
pub fn language_detector() -> Hook {
    Hook {
        name: "builtin:language_detector".to_string(),
        description: "Detects the language of inbound messages and tags them with metadata"
            .to_string(),
        hook_type: HookType::BeforeInbound,
        action: HookAction::Inline {
            code: "{{content}}".to_string(),
        },
        priority: HookPriority::Normal,
        source: HookSource::Builtin,
        enabled: false,
        timeout_ms: 1000,
    }
}

/// Hook: Log tool usage for analytics.
pub fn tool_usage_logger() -> Hook {
    Hook {
        name: "builtin:tool_usage_logger".to_string(),
        description: "Logs tool invocations with parameters and timing for analytics".to_string(),
        hook_type: HookType::BeforeToolCall,
        action: HookAction::Inline {
            code: String::new(),
        },
        priority: HookPriority::Low,
        source: HookSource::Builtin,
        enabled: false,
        timeout_ms: 500,
    }
}

/// Get a bundled hook by name.
pub fn get_bundled_hook(name: &str) -> Option<Hook> {
    all_bundled_hooks().into_iter().find(|h| h.name == name)
}

/// List all bundled hook names.
pub fn list_bundled_hook_names() -> Vec<&'static str> {
    vec![
        "builtin:profanity_filter",
        "builtin:response_length_guard",
        "builtin:sensitive_data_redactor",
        "builtin:greeting_injector",
        "builtin:session_logger",
        "builtin:rate_limit_guard",
        "builtin:language_detector",
        "builtin:tool_usage_logger",
    ]
}
