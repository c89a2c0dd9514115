use serde::{Deserialize, Serialize};

// ===================================================================
// Hook Input Types (received via stdin, snake_case JSON)
// ===================================================================

/// Fields shared by all hook event inputs.
///
/// Every field is optional here: the gate never needs them to decide, so a
/// sparse payload from an older runtime must still parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommonInput {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StopInput {
    #[serde(flatten)]
    pub common: CommonInput,
    #[serde(default)]
    pub stop_hook_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubagentStopInput {
    #[serde(flatten)]
    pub common: CommonInput,
    #[serde(default)]
    pub stop_hook_active: bool,
}

/// Top-level hook input, deserialized from stdin JSON.
///
/// Tagged by the `hook_event_name` field. Only the two stop events are
/// modelled; every other event collapses into `Other` and passes through.
#[derive(Debug, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookInput {
    Stop(StopInput),
    SubagentStop(SubagentStopInput),
    #[serde(other)]
    Other,
}

impl HookInput {
    /// Whether this event should run the review gate.
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop(_) | Self::SubagentStop(_))
    }

    fn common(&self) -> Option<&CommonInput> {
        match self {
            Self::Stop(e) => Some(&e.common),
            Self::SubagentStop(e) => Some(&e.common),
            Self::Other => None,
        }
    }

    /// The working directory reported by the runtime, if any.
    pub fn cwd(&self) -> Option<&str> {
        self.common()?
            .cwd
            .as_deref()
            .filter(|c| !c.trim().is_empty())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.common().map(|c| c.session_id.as_str())
    }

    /// Whether the assistant is already continuing because of a stop hook.
    pub fn stop_hook_active(&self) -> bool {
        match self {
            Self::Stop(e) => e.stop_hook_active,
            Self::SubagentStop(e) => e.stop_hook_active,
            Self::Other => false,
        }
    }
}

// ===================================================================
// Hook Output Types (written to stdout as JSON, camelCase)
// ===================================================================

/// Top-level hook output written to stdout on exit code 0.
///
/// An allowed stop serializes to `{}`.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Set to `"block"` to prevent the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,

    /// Instruction shown to Claude when `decision` is `"block"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HookOutput {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn block(reason: String) -> Self {
        Self {
            decision: Some("block".into()),
            reason: Some(reason),
        }
    }
}
