//! Run-control signals threaded through tool results.
//!
//! A tool normally answers with a message, but it can instead ask the runner
//! to pause the turn (for human input or for another agent) or to finish the
//! agent outright. The string sentinels are kept so that raw tool output and
//! persisted logs remain recognizable as control flow.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PAUSE_FOR_INPUT_SENTINEL: &str = "__PAUSE4INPUT__";
pub const PAUSE_FOR_CHILD_SENTINEL: &str = "__PAUSE__CHILD";
pub const FINISH_AGENT_SENTINEL: &str = "__FINISH__";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum ToolControl {
    /// Pause the turn until the caller supplies the requested values.
    /// Keys map to human-readable descriptions of what is needed.
    PauseForInput {
        request_keys: BTreeMap<String, String>,
    },
    /// Pause the turn while a child agent produces a result. `values` carries
    /// whatever the delegating tool needs echoed back (agent name, message).
    PauseForChild {
        values: BTreeMap<String, serde_json::Value>,
    },
    /// Abort any further processing by the agent for this turn.
    FinishAgent,
}

impl ToolControl {
    pub fn sentinel(&self) -> &'static str {
        match self {
            ToolControl::PauseForInput { .. } => PAUSE_FOR_INPUT_SENTINEL,
            ToolControl::PauseForChild { .. } => PAUSE_FOR_CHILD_SENTINEL,
            ToolControl::FinishAgent => FINISH_AGENT_SENTINEL,
        }
    }

    /// Whether a raw tool result value is one of the control sentinels.
    pub fn matches_sentinel(value: &str) -> bool {
        matches!(
            value,
            PAUSE_FOR_INPUT_SENTINEL | PAUSE_FOR_CHILD_SENTINEL | FINISH_AGENT_SENTINEL
        )
    }

    pub fn is_pause_for_input(value: &str) -> bool {
        value == PAUSE_FOR_INPUT_SENTINEL
    }

    pub fn is_pause_for_child(value: &str) -> bool {
        value == PAUSE_FOR_CHILD_SENTINEL
    }

    pub fn is_finish_agent(value: &str) -> bool {
        value == FINISH_AGENT_SENTINEL
    }

    pub fn pause_for_input<K, V, I>(request_keys: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        ToolControl::PauseForInput {
            request_keys: request_keys
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_round_trip() {
        let pause = ToolControl::pause_for_input([("topic", "What is the news topic?")]);
        assert_eq!(pause.sentinel(), PAUSE_FOR_INPUT_SENTINEL);
        assert!(ToolControl::matches_sentinel(pause.sentinel()));
        assert!(ToolControl::is_pause_for_input(pause.sentinel()));

        assert_eq!(ToolControl::FinishAgent.sentinel(), FINISH_AGENT_SENTINEL);
        assert!(ToolControl::is_finish_agent(FINISH_AGENT_SENTINEL));
        assert!(ToolControl::is_pause_for_child(PAUSE_FOR_CHILD_SENTINEL));
        assert!(!ToolControl::matches_sentinel("a normal tool result"));
    }
}
