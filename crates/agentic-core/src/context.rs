use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-run context handed to tools: which agent is running, on which thread,
/// how deep in the sub-agent chain, and the turn's context variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub agent_name: String,
    pub thread_id: String,
    pub depth: u32,
    #[serde(default)]
    pub context_variables: BTreeMap<String, serde_json::Value>,
}

impl RunContext {
    pub fn new(agent_name: impl Into<String>, thread_id: impl Into<String>, depth: u32) -> Self {
        Self {
            agent_name: agent_name.into(),
            thread_id: thread_id.into(),
            depth,
            context_variables: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.context_variables.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context_variables.insert(key.into(), value);
    }

    pub fn merge(&mut self, values: BTreeMap<String, serde_json::Value>) {
        self.context_variables.extend(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_existing_keys() {
        let mut ctx = RunContext::new("producer", "thread-1", 0);
        ctx.set("topic", json!("old"));
        ctx.merge(BTreeMap::from([
            ("topic".to_string(), json!("rust")),
            ("region".to_string(), json!("eu")),
        ]));
        assert_eq!(ctx.get_str("topic"), Some("rust"));
        assert_eq!(ctx.get_str("region"), Some("eu"));
    }
}
