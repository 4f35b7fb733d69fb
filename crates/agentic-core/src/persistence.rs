//! Persistence traits for checkpointing a run between turns, so a paused
//! agent (waiting for input) can be resumed after a process restart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::messaging::AgentMessage;

/// Unique identifier for a conversation thread/session.
pub type ThreadId = String;

/// A sub-agent delegation that paused mid-turn. Held so that resuming the
/// parent can route the supplied values into the paused child and then fold
/// the child's answer back in as the original tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingChild {
    pub agent: String,
    pub handoff: bool,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Everything needed to resume a run: the message history, the turn's context
/// variables, and the outstanding input request if the run is paused.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub history: Vec<AgentMessage>,
    #[serde(default)]
    pub context_variables: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_wait: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_child: Option<PendingChild>,
    /// Depth the turn was paused at; post-resume events keep this depth.
    #[serde(default)]
    pub pending_depth: u32,
}

#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Save the current run state for a given thread.
    async fn save_state(&self, thread_id: &ThreadId, state: &RunState) -> anyhow::Result<()>;

    /// Load the last saved state for a given thread.
    /// Returns None if no state exists for this thread.
    async fn load_state(&self, thread_id: &ThreadId) -> anyhow::Result<Option<RunState>>;

    /// Delete all saved state for a given thread.
    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()>;

    /// List all thread IDs that have saved state.
    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>>;
}

/// In-memory checkpointer for testing and development.
/// State is not persisted between process restarts.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    states: std::sync::RwLock<HashMap<ThreadId, RunState>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save_state(&self, thread_id: &ThreadId, state: &RunState) -> anyhow::Result<()> {
        let mut states = self.states.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory checkpointer")
        })?;
        states.insert(thread_id.clone(), state.clone());
        tracing::debug!(thread_id = %thread_id, "Saved run state to memory");
        Ok(())
    }

    async fn load_state(&self, thread_id: &ThreadId) -> anyhow::Result<Option<RunState>> {
        let states = self.states.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory checkpointer")
        })?;
        Ok(states.get(thread_id).cloned())
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()> {
        let mut states = self.states.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory checkpointer")
        })?;
        states.remove(thread_id);
        tracing::debug!(thread_id = %thread_id, "Deleted thread from memory");
        Ok(())
    }

    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>> {
        let states = self.states.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory checkpointer")
        })?;
        Ok(states.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_state() -> RunState {
        RunState {
            history: vec![
                AgentMessage::user("what's the news?"),
                AgentMessage::assistant("checking..."),
            ],
            context_variables: BTreeMap::from([("topic".to_string(), json!("rust"))]),
            pending_wait: Some(BTreeMap::from([(
                "topic".to_string(),
                "What is the news topic?".to_string(),
            )])),
            pending_child: Some(PendingChild {
                agent: "reporter".to_string(),
                handoff: false,
                tool_name: "reporter".to_string(),
                tool_call_id: Some("call-1".to_string()),
            }),
            pending_depth: 1,
        }
    }

    #[tokio::test]
    async fn in_memory_checkpointer_save_and_load() {
        let checkpointer = InMemoryCheckpointer::new();
        let thread_id = "test-thread".to_string();

        checkpointer
            .save_state(&thread_id, &sample_state())
            .await
            .unwrap();

        let loaded = checkpointer.load_state(&thread_id).await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.context_variables.get("topic").unwrap(), &json!("rust"));
        assert!(loaded.pending_wait.is_some());
        assert_eq!(loaded.pending_child.as_ref().unwrap().agent, "reporter");
        assert_eq!(loaded.pending_depth, 1);
    }

    #[tokio::test]
    async fn in_memory_checkpointer_nonexistent_thread() {
        let checkpointer = InMemoryCheckpointer::new();
        let result = checkpointer
            .load_state(&"nonexistent".to_string())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn in_memory_checkpointer_delete_and_list() {
        let checkpointer = InMemoryCheckpointer::new();
        checkpointer
            .save_state(&"thread1".to_string(), &sample_state())
            .await
            .unwrap();
        checkpointer
            .save_state(&"thread2".to_string(), &sample_state())
            .await
            .unwrap();

        let threads = checkpointer.list_threads().await.unwrap();
        assert_eq!(threads.len(), 2);

        checkpointer.delete_thread(&"thread1".to_string()).await.unwrap();
        assert!(checkpointer
            .load_state(&"thread1".to_string())
            .await
            .unwrap()
            .is_none());
    }
}
