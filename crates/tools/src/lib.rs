//! Tool trait and registry, plus the builtin tools every bundle carries.
//!
//! A tool is a callable `(args) → result` with a JSON-schema description.
//! Registries are snapshotted per provider request so a mount that
//! happens mid-execution becomes visible on the next iteration.

pub mod exec;
pub mod todo;

use std::sync::Arc;

use hive_domain::error::Result;
use hive_domain::tool::ToolDefinition;
use parking_lot::RwLock;

pub use exec::ExecTool;
pub use todo::{TodoItem, TodoListTool, TodoStatus};

/// A callable capability exposed to the LLM.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters(&self) -> serde_json::Value;

    async fn execute(&self, args: &serde_json::Value) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameters(),
        }
    }
}

/// Mounted tools for one session. Append-only; lookups by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<Vec<Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        tracing::debug!(tool = tool.name(), "tool registered");
        self.tools.write().push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .read()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// Definitions for the next provider request (point-in-time snapshot).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.read().iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the input back."
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(&self, args: &serde_json::Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or("").to_string())
        }
    }

    #[tokio::test]
    async fn register_lookup_and_execute() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);

        let tool = registry.get("echo").expect("echo registered");
        let out = tool.execute(&serde_json::json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, "hi");

        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn definitions_snapshot_reflects_later_mounts() {
        let registry = ToolRegistry::new();
        let before = registry.definitions();
        registry.register(Arc::new(EchoTool));
        let after = registry.definitions();
        assert!(before.is_empty());
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].name, "echo");
    }
}
