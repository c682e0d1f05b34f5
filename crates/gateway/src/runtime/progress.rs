//! Progress events and the throttled status-message renderer.
//!
//! The orchestrator emits [`ProgressEvent`]s through an opaque sink; the
//! dispatcher builds a [`StatusRenderer`] per execution that folds those
//! events into local state and edits the bot-identity status message at
//! most once per throttle window. Events are advisory: a lost update
//! never affects conversation state, and the sink never blocks the loop
//! (Slack calls are spawned).

use std::sync::Arc;
use std::time::{Duration, Instant};

use hive_tools::{TodoItem, TodoStatus};
use parking_lot::Mutex;

use crate::slack::client::SlackClient;

use super::inject::InjectQueue;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Done,
    Cancelled,
}

/// Events emitted during one execution of the agent loop.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Thinking {
        iteration: u32,
    },
    ContentDelta {
        text: String,
    },
    ToolStart {
        name: String,
        args_digest: String,
        /// Delegate target, only meaningful for the `delegate` tool.
        agent: Option<String>,
        todos: Option<Vec<TodoItem>>,
    },
    ToolEnd {
        name: String,
        duration_ms: u64,
        todos: Option<Vec<TodoItem>>,
    },
    InjectionApplied {
        count: usize,
    },
    Complete {
        status: CompletionStatus,
    },
    Error {
        message: String,
    },
}

/// Consumer of progress events. Must not block; losing events is fine.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A sink that drops everything (roundtable sub-executions, tests).
pub fn null_sink() -> ProgressSink {
    Arc::new(|_| {})
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payload coercion
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extract a todo list from tool arguments or a tool result. Accepts a
/// parsed object or a JSON string (models produce both shapes).
pub fn extract_todos(value: &serde_json::Value) -> Option<Vec<TodoItem>> {
    let obj = match value {
        serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(s).ok()?,
        other => other.clone(),
    };
    let todos = obj.get("todos")?;
    serde_json::from_value(todos.clone()).ok()
}

/// Extract the delegate agent name from tool arguments, object or
/// JSON-string form.
pub fn extract_agent(value: &serde_json::Value) -> Option<String> {
    let obj = match value {
        serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(s).ok()?,
        other => other.clone(),
    };
    obj.get("agent")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rendering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Elapsed-time label: empty under 10 s, `Ns` under a minute, then
/// `Mm Ss` (or `Mm` on the whole minute).
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 10 {
        String::new()
    } else if secs < 60 {
        format!("{secs}s")
    } else {
        let m = secs / 60;
        let s = secs % 60;
        if s == 0 {
            format!("{m}m")
        } else {
            format!("{m}m {s}s")
        }
    }
}

fn friendly_tool_name(tool: &str) -> String {
    match tool {
        "exec" => "Running a command".into(),
        "todo" => "Updating the plan".into(),
        "dispatch_worker" => "Dispatching a worker".into(),
        other => {
            let spaced = other.replace('_', " ");
            let mut chars = spaced.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
                None => spaced,
            }
        }
    }
}

struct RenderState {
    /// `None` = simple mode, `Some` = plan mode. The transition is
    /// one-way within an execution.
    todos: Option<Vec<TodoItem>>,
    current_tool: Option<String>,
    current_agent: Option<String>,
    started: Instant,
    last_push: Option<Instant>,
}

impl RenderState {
    /// At most one Slack edit per throttle window: returns whether an
    /// edit may fire now, claiming the window when it does.
    fn claim_push(&mut self, throttle: Duration) -> bool {
        let due = self
            .last_push
            .map(|t| t.elapsed() >= throttle)
            .unwrap_or(true);
        if due {
            self.last_push = Some(Instant::now());
        }
        due
    }
}

fn render_simple(state: &RenderState, queued: usize) -> String {
    let activity = match (&state.current_tool, &state.current_agent) {
        (Some(tool), Some(agent)) if tool == "delegate" => {
            format!("Delegating to {agent}")
        }
        (Some(tool), _) => friendly_tool_name(tool),
        (None, _) => "Thinking".into(),
    };
    let mut line = format!("⚙️ {activity}…");
    let elapsed = format_elapsed(state.started.elapsed());
    if !elapsed.is_empty() {
        line.push_str(&format!(" · {elapsed}"));
    }
    if queued > 0 {
        let plural = if queued == 1 { "" } else { "s" };
        line.push_str(&format!(" · {queued} message{plural} queued"));
    }
    line
}

fn render_plan(state: &RenderState, instance_label: &str, queued: usize) -> String {
    let todos = state.todos.as_deref().unwrap_or(&[]);
    let completed: Vec<&TodoItem> = todos
        .iter()
        .filter(|t| t.status == TodoStatus::Completed)
        .collect();
    let in_progress: Vec<&TodoItem> = todos
        .iter()
        .filter(|t| t.status == TodoStatus::InProgress)
        .collect();
    let pending: Vec<&TodoItem> = todos
        .iter()
        .filter(|t| t.status == TodoStatus::Pending)
        .collect();

    let mut lines = Vec::new();

    let elapsed = format_elapsed(state.started.elapsed());
    if elapsed.is_empty() {
        lines.push(format!("⚙️ {instance_label}"));
    } else {
        lines.push(format!("⚙️ {instance_label} · {elapsed}"));
    }
    lines.push("─────".into());

    if completed.len() <= 2 {
        for t in &completed {
            lines.push(format!("✅ {}", t.content));
        }
    } else {
        lines.push(format!("✅ {} completed", completed.len()));
    }

    for t in &in_progress {
        let label = if t.active_form.is_empty() {
            &t.content
        } else {
            &t.active_form
        };
        lines.push(format!("▸ *{label}*"));
    }

    for t in pending.iter().take(2) {
        lines.push(format!("◦ {}", t.content));
    }
    if pending.len() > 2 {
        lines.push(format!("+{} more", pending.len() - 2));
    }

    let activity = match (&state.current_tool, &state.current_agent) {
        (Some(tool), Some(agent)) if tool == "delegate" => format!("Delegating to {agent}"),
        (Some(tool), _) => friendly_tool_name(tool),
        (None, _) => "Thinking".into(),
    };
    let mut footer = format!(
        "🔧 {activity} · {} of {} complete",
        completed.len(),
        todos.len()
    );
    if queued > 0 {
        footer.push_str(&format!(" · {queued} queued"));
    }
    lines.push(footer);

    lines.join("\n")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// StatusRenderer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drives the editable status message for one execution.
pub struct StatusRenderer {
    slack: Arc<SlackClient>,
    channel: String,
    status_ts: String,
    instance_label: String,
    queue: Arc<InjectQueue>,
    throttle: Duration,
    state: Mutex<RenderState>,
}

impl StatusRenderer {
    pub fn new(
        slack: Arc<SlackClient>,
        channel: String,
        status_ts: String,
        instance_label: String,
        queue: Arc<InjectQueue>,
        throttle: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            slack,
            channel,
            status_ts,
            instance_label,
            queue,
            throttle,
            state: Mutex::new(RenderState {
                todos: None,
                current_tool: None,
                current_agent: None,
                started: Instant::now(),
                last_push: None,
            }),
        })
    }

    /// Build the sink the orchestrator will call. State updates happen on
    /// every event; the Slack edit fires at most once per throttle window
    /// and is spawned so the loop never waits on the Slack API.
    pub fn sink(self: &Arc<Self>) -> ProgressSink {
        let this = self.clone();
        Arc::new(move |event| this.on_event(event))
    }

    fn on_event(&self, event: ProgressEvent) {
        let rendered = {
            let mut state = self.state.lock();
            match event {
                ProgressEvent::ToolStart {
                    name,
                    agent,
                    todos,
                    ..
                } => {
                    state.current_agent = agent;
                    state.current_tool = Some(name);
                    if let Some(t) = todos {
                        state.todos = Some(t);
                    }
                }
                ProgressEvent::ToolEnd { todos, .. } => {
                    if let Some(t) = todos {
                        state.todos = Some(t);
                    }
                }
                // Complete/Error end with the status message deleted by
                // the dispatcher; deltas and injections only matter at
                // render time (queue length is read live).
                ProgressEvent::Thinking { .. }
                | ProgressEvent::ContentDelta { .. }
                | ProgressEvent::InjectionApplied { .. } => {}
                ProgressEvent::Complete { .. } | ProgressEvent::Error { .. } => return,
            }

            if !state.claim_push(self.throttle) {
                return;
            }

            let queued = self.queue.len();
            if state.todos.is_some() {
                render_plan(&state, &self.instance_label, queued)
            } else {
                render_simple(&state, queued)
            }
        };

        let slack = self.slack.clone();
        let channel = self.channel.clone();
        let ts = self.status_ts.clone();
        tokio::spawn(async move {
            if let Err(e) = slack.update_message(&channel, &ts, &rendered).await {
                tracing::debug!(error = %e, "status update dropped");
            }
        });
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(content: &str, active: &str, status: TodoStatus) -> TodoItem {
        TodoItem {
            content: content.into(),
            active_form: active.into(),
            status,
        }
    }

    fn state_with(todos: Option<Vec<TodoItem>>, tool: Option<&str>) -> RenderState {
        RenderState {
            todos,
            current_tool: tool.map(String::from),
            current_agent: None,
            started: Instant::now(),
            last_push: None,
        }
    }

    #[test]
    fn elapsed_formatting_bands() {
        assert_eq!(format_elapsed(Duration::from_secs(3)), "");
        assert_eq!(format_elapsed(Duration::from_secs(10)), "10s");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "59s");
        assert_eq!(format_elapsed(Duration::from_secs(60)), "1m");
        assert_eq!(format_elapsed(Duration::from_secs(95)), "1m 35s");
        assert_eq!(format_elapsed(Duration::from_secs(180)), "3m");
    }

    #[test]
    fn simple_mode_one_line() {
        let state = state_with(None, Some("exec"));
        let line = render_simple(&state, 0);
        assert_eq!(line, "⚙️ Running a command…");
    }

    #[test]
    fn simple_mode_shows_queue_depth() {
        let state = state_with(None, None);
        let line = render_simple(&state, 1);
        assert_eq!(line, "⚙️ Thinking… · 1 message queued");
        let line = render_simple(&state, 3);
        assert!(line.ends_with("3 messages queued"));
    }

    #[test]
    fn simple_mode_delegate_names_the_agent() {
        let mut state = state_with(None, Some("delegate"));
        state.current_agent = Some("researcher".into());
        let line = render_simple(&state, 0);
        assert_eq!(line, "⚙️ Delegating to researcher…");
    }

    #[test]
    fn plan_mode_lists_few_completed_individually() {
        let todos = vec![
            todo("scan", "Scanning", TodoStatus::Completed),
            todo("fix", "Fixing", TodoStatus::InProgress),
            todo("test", "Testing", TodoStatus::Pending),
        ];
        let state = state_with(Some(todos), Some("exec"));
        let text = render_plan(&state, "alpha", 0);
        assert!(text.contains("⚙️ alpha"));
        assert!(text.contains("✅ scan"));
        assert!(text.contains("▸ *Fixing*"));
        assert!(text.contains("◦ test"));
        assert!(text.contains("🔧 Running a command · 1 of 3 complete"));
    }

    #[test]
    fn plan_mode_summarizes_many_completed_and_pending() {
        let mut todos = vec![
            todo("a", "", TodoStatus::Completed),
            todo("b", "", TodoStatus::Completed),
            todo("c", "", TodoStatus::Completed),
        ];
        for name in ["p1", "p2", "p3", "p4"] {
            todos.push(todo(name, "", TodoStatus::Pending));
        }
        let state = state_with(Some(todos), None);
        let text = render_plan(&state, "alpha", 2);
        assert!(text.contains("✅ 3 completed"));
        assert!(!text.contains("✅ a"));
        assert!(text.contains("◦ p1"));
        assert!(text.contains("◦ p2"));
        assert!(!text.contains("◦ p3"));
        assert!(text.contains("+2 more"));
        assert!(text.contains("🔧 Thinking · 3 of 7 complete · 2 queued"));
    }

    #[test]
    fn throttle_allows_one_push_per_window() {
        let mut state = state_with(None, None);
        let window = Duration::from_secs(2);
        assert!(state.claim_push(window), "first push is always due");
        assert!(!state.claim_push(window), "second push inside the window drops");
        assert!(!state.claim_push(window));

        // A zero-length window never throttles.
        let mut state = state_with(None, None);
        assert!(state.claim_push(Duration::ZERO));
        assert!(state.claim_push(Duration::ZERO));
    }

    #[test]
    fn extract_todos_accepts_object_and_string_forms() {
        let obj = serde_json::json!({
            "action": "create",
            "todos": [{"content": "x", "activeForm": "Doing x", "status": "pending"}]
        });
        assert_eq!(extract_todos(&obj).unwrap().len(), 1);

        let as_string = serde_json::Value::String(obj.to_string());
        assert_eq!(extract_todos(&as_string).unwrap().len(), 1);

        assert!(extract_todos(&serde_json::json!({"action": "list"})).is_none());
        assert!(extract_todos(&serde_json::Value::String("not json".into())).is_none());
    }

    #[test]
    fn extract_agent_accepts_both_forms() {
        let obj = serde_json::json!({"agent": "researcher", "task": "dig"});
        assert_eq!(extract_agent(&obj).as_deref(), Some("researcher"));
        let s = serde_json::Value::String(obj.to_string());
        assert_eq!(extract_agent(&s).as_deref(), Some("researcher"));
        assert!(extract_agent(&serde_json::json!({"task": "dig"})).is_none());
    }
}
