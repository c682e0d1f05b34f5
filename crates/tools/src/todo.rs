//! Per-session todo list tool.
//!
//! The LLM plans multi-step work through this tool; the progress
//! pipeline mirrors the same items into the status message (plan mode).

use std::sync::Arc;

use hive_domain::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Tool;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    pub content: String,
    /// Present-continuous form shown while the item is in progress.
    #[serde(default, rename = "activeForm")]
    pub active_form: String,
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Completed,
    InProgress,
    Pending,
}

/// The `todo` tool: `create` replaces the list, `update` merges statuses
/// by content, `list` returns the current items.
pub struct TodoListTool {
    items: Arc<Mutex<Vec<TodoItem>>>,
}

#[derive(Deserialize)]
struct TodoArgs {
    action: String,
    #[serde(default)]
    todos: Vec<TodoItem>,
}

impl TodoListTool {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn snapshot(&self) -> Vec<TodoItem> {
        self.items.lock().clone()
    }

    fn render(items: &[TodoItem]) -> String {
        if items.is_empty() {
            return "(no todos)".into();
        }
        let lines: Vec<String> = items
            .iter()
            .map(|t| {
                let mark = match t.status {
                    TodoStatus::Completed => "x",
                    TodoStatus::InProgress => ">",
                    TodoStatus::Pending => " ",
                };
                format!("[{mark}] {}", t.content)
            })
            .collect();
        lines.join("\n")
    }
}

impl Default for TodoListTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for TodoListTool {
    fn name(&self) -> &str {
        "todo"
    }

    fn description(&self) -> &str {
        "Track a plan for multi-step work. Actions: create (replace the list), \
         update (set statuses), list (show current items). Keep exactly one item \
         in_progress while working."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["create", "update", "list"],
                },
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": {"type": "string"},
                            "activeForm": {"type": "string"},
                            "status": {
                                "type": "string",
                                "enum": ["completed", "in_progress", "pending"],
                            },
                        },
                        "required": ["content", "status"],
                    },
                },
            },
            "required": ["action"],
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        // Some models send arguments as a JSON string; accept both.
        let parsed: TodoArgs = match args {
            serde_json::Value::String(s) => serde_json::from_str(s)?,
            other => serde_json::from_value(other.clone())?,
        };

        match parsed.action.as_str() {
            "create" => {
                let mut items = self.items.lock();
                *items = parsed.todos;
                Ok(format!("created {} todo(s)\n{}", items.len(), Self::render(&items)))
            }
            "update" => {
                let mut items = self.items.lock();
                for update in parsed.todos {
                    match items.iter_mut().find(|t| t.content == update.content) {
                        Some(existing) => {
                            existing.status = update.status;
                            if !update.active_form.is_empty() {
                                existing.active_form = update.active_form;
                            }
                        }
                        None => items.push(update),
                    }
                }
                Ok(Self::render(&items))
            }
            "list" => {
                let items = self.items.lock();
                Ok(serde_json::to_string(&serde_json::json!({
                    "todos": *items
                }))?)
            }
            other => Err(Error::Other(format!("unknown todo action: {other}"))),
        }
    }
}
