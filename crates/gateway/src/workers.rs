//! Gateway-bound tools: background workers and inline delegates.
//!
//! Both close over live gateway state (registry, active-execution set),
//! so they are mounted on a session after creation rather than shipped
//! with the bundle.

use std::sync::Arc;

use hive_domain::error::Result;
use hive_domain::tool::Message;
use hive_providers::{ChatRequest, LlmProvider};
use hive_sessions::ConversationId;
use hive_tools::Tool;
use serde::Deserialize;

use crate::dispatch::active::ActiveExecutions;
use crate::runtime::session::SessionRegistry;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// dispatch_worker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hand a task to a background worker and return immediately.
///
/// The worker's completion report arrives through `notify`, i.e. it is
/// prepended to the *next* execution on this conversation instead of
/// being injected into the current one — injecting would re-trigger the
/// post-response drain and keep the loop alive after the force-respond
/// answer.
pub struct DispatchWorkerTool {
    registry: Arc<SessionRegistry>,
    active: Arc<ActiveExecutions>,
    instance: String,
    conversation: ConversationId,
}

#[derive(Deserialize)]
struct WorkerArgs {
    task: String,
    #[serde(default)]
    label: Option<String>,
}

impl DispatchWorkerTool {
    pub fn new(
        registry: Arc<SessionRegistry>,
        active: Arc<ActiveExecutions>,
        instance: String,
        conversation: ConversationId,
    ) -> Self {
        Self {
            registry,
            active,
            instance,
            conversation,
        }
    }
}

#[async_trait::async_trait]
impl Tool for DispatchWorkerTool {
    fn name(&self) -> &str {
        "dispatch_worker"
    }

    fn description(&self) -> &str {
        "Start a background worker on a self-contained task and return \
         immediately. The worker's report is delivered before your next \
         turn in this conversation. After dispatching, tell the user what \
         you started."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": {"type": "string", "description": "Complete, standalone task description."},
                "label": {"type": "string", "description": "Short human-readable label."},
            },
            "required": ["task"],
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let parsed: WorkerArgs = match args {
            serde_json::Value::String(s) => serde_json::from_str(s)?,
            other => serde_json::from_value(other.clone())?,
        };
        let label = parsed
            .label
            .unwrap_or_else(|| "background task".to_string());

        let registry = self.registry.clone();
        let provider = self.registry.provider();
        let instance = self.instance.clone();
        let conversation = self.conversation.clone();
        let task = parsed.task;
        let label_for_task = label.clone();

        let handle = tokio::spawn(async move {
            let req = ChatRequest {
                messages: vec![
                    Message::system(
                        "You are a background worker. Complete the task below and \
                         reply with a concise report of what you did and found.",
                    ),
                    Message::user(&task),
                ],
                ..ChatRequest::default()
            };
            let report = match provider.chat(req).await {
                Ok(resp) => resp.content,
                Err(e) => {
                    tracing::warn!(error = %e, label = %label_for_task, "worker failed");
                    format!("the worker hit an error: {e}")
                }
            };
            registry.notify(
                &instance,
                &conversation,
                &format!("[worker \"{label_for_task}\" completed]\n{report}"),
            );
        });
        self.active.register_task(handle);

        Ok(format!(
            "worker \"{label}\" dispatched; its report will arrive before your next turn"
        ))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// delegate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run a named specialist inline and return its answer as the tool
/// result. Unlike `dispatch_worker` this blocks the loop, so it suits
/// short, focused subtasks.
pub struct DelegateTool {
    provider: Arc<dyn LlmProvider>,
}

#[derive(Deserialize)]
struct DelegateArgs {
    agent: String,
    task: String,
}

impl DelegateTool {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        "delegate"
    }

    fn description(&self) -> &str {
        "Delegate a focused subtask to a named specialist agent and get \
         its answer back inline."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agent": {"type": "string", "description": "Specialist name, e.g. \"researcher\"."},
                "task": {"type": "string"},
            },
            "required": ["agent", "task"],
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let parsed: DelegateArgs = match args {
            serde_json::Value::String(s) => serde_json::from_str(s)?,
            other => serde_json::from_value(other.clone())?,
        };

        let req = ChatRequest {
            messages: vec![
                Message::system(format!(
                    "You are \"{}\", a focused specialist sub-agent. Complete the \
                     task and answer directly; no preamble.",
                    parsed.agent
                )),
                Message::user(&parsed.task),
            ],
            ..ChatRequest::default()
        };
        let resp = self.provider.chat(req).await?;
        Ok(resp.content)
    }
}
