//! Hook coordinator — the per-session capability mount point.
//!
//! Holds the session's tools, event hooks, and back-channels (display,
//! approval, the running execution's inject queue) behind a named
//! lookup. Components reach each other only through this object, which
//! is what breaks the orchestrator ↔ tools cycle: tools that need to
//! inject look up `orchestrator.inject` late instead of holding the
//! orchestrator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hive_domain::error::Result;
use hive_tools::{Tool, ToolRegistry};
use parking_lot::RwLock;

use super::inject::InjectQueue;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Hook events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    ToolPre,
    ToolPost,
    PromptSubmit,
    ProviderRequest,
    InjectionApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Continue,
    Deny,
}

/// What a hook handler decided, plus optional metadata (a deny reason,
/// annotations for downstream handlers).
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub action: HookAction,
    pub metadata: Option<serde_json::Value>,
}

impl HookOutcome {
    pub fn proceed() -> Self {
        Self {
            action: HookAction::Continue,
            metadata: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            action: HookAction::Deny,
            metadata: Some(serde_json::json!({"reason": reason.into()})),
        }
    }

    pub fn deny_reason(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("reason"))
            .and_then(|r| r.as_str())
    }
}

#[async_trait::async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, event: HookEvent, payload: &serde_json::Value) -> HookOutcome;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Back-channel traits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayLevel {
    Info,
    Warning,
    Error,
}

/// Fire-and-forget user-visible output. Implementations must never
/// block the caller on delivery and must swallow (log) transport errors.
#[async_trait::async_trait]
pub trait DisplayChannel: Send + Sync {
    async fn show_message(&self, text: &str, level: DisplayLevel, source: &str);
}

/// Interactive approval. Resolves to the chosen option, or the default
/// when the timeout elapses.
#[async_trait::async_trait]
pub trait ApprovalChannel: Send + Sync {
    async fn request_approval(
        &self,
        prompt: &str,
        options: &[String],
        default: &str,
        timeout: Duration,
    ) -> Result<String>;
}

/// A named capability handle returned by [`HookCoordinator::get_capability`].
#[derive(Clone)]
pub enum Capability {
    Tool(Arc<dyn Tool>),
    Display(Arc<dyn DisplayChannel>),
    Approval(Arc<dyn ApprovalChannel>),
    Inject(Arc<InjectQueue>),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Coordinator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-session capability mount point. Mounts may happen after session
/// creation (connector tools closing over a live Slack thread are the
/// usual case); the next `execute` sees them.
#[derive(Default)]
pub struct HookCoordinator {
    tools: ToolRegistry,
    hooks: RwLock<HashMap<HookEvent, Vec<Arc<dyn HookHandler>>>>,
    display: RwLock<Option<Arc<dyn DisplayChannel>>>,
    approval: RwLock<Option<Arc<dyn ApprovalChannel>>>,
    /// The running execution's inject queue. Bound by the orchestrator
    /// for the duration of each `execute`, cleared afterwards.
    inject: RwLock<Option<Arc<InjectQueue>>>,
}

impl HookCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount_tool(&self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    pub fn mount_hook(&self, event: HookEvent, handler: Arc<dyn HookHandler>) {
        self.hooks.write().entry(event).or_default().push(handler);
    }

    pub fn set_display(&self, display: Arc<dyn DisplayChannel>) {
        *self.display.write() = Some(display);
    }

    pub fn set_approval(&self, approval: Arc<dyn ApprovalChannel>) {
        *self.approval.write() = Some(approval);
    }

    pub fn bind_inject(&self, queue: Option<Arc<InjectQueue>>) {
        *self.inject.write() = queue;
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn display(&self) -> Option<Arc<dyn DisplayChannel>> {
        self.display.read().clone()
    }

    pub fn approval(&self) -> Option<Arc<dyn ApprovalChannel>> {
        self.approval.read().clone()
    }

    /// Named capability lookup. `tool:<name>` addresses a mounted tool;
    /// `display`, `approval`, and `orchestrator.inject` address the
    /// singleton channels. Returns `None` when nothing is mounted under
    /// the name.
    pub fn get_capability(&self, name: &str) -> Option<Capability> {
        if let Some(tool_name) = name.strip_prefix("tool:") {
            return self.tools.get(tool_name).map(Capability::Tool);
        }
        match name {
            "display" => self.display.read().clone().map(Capability::Display),
            "approval" => self.approval.read().clone().map(Capability::Approval),
            "orchestrator.inject" => self.inject.read().clone().map(Capability::Inject),
            _ => None,
        }
    }

    /// Run all handlers for an event. The first `Deny` wins; its outcome
    /// (with the deny reason) is returned unchanged.
    pub async fn fire(&self, event: HookEvent, payload: &serde_json::Value) -> HookOutcome {
        let handlers: Vec<Arc<dyn HookHandler>> = self
            .hooks
            .read()
            .get(&event)
            .map(|v| v.to_vec())
            .unwrap_or_default();

        for handler in handlers {
            let outcome = handler.handle(event, payload).await;
            if outcome.action == HookAction::Deny {
                return outcome;
            }
        }
        HookOutcome::proceed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyExec;

    #[async_trait::async_trait]
    impl HookHandler for DenyExec {
        async fn handle(&self, _event: HookEvent, payload: &serde_json::Value) -> HookOutcome {
            if payload.get("tool_name").and_then(|v| v.as_str()) == Some("exec") {
                HookOutcome::deny("exec is not allowed here")
            } else {
                HookOutcome::proceed()
            }
        }
    }

    #[tokio::test]
    async fn fire_returns_first_deny() {
        let hooks = HookCoordinator::new();
        hooks.mount_hook(HookEvent::ToolPre, Arc::new(DenyExec));

        let outcome = hooks
            .fire(HookEvent::ToolPre, &serde_json::json!({"tool_name": "exec"}))
            .await;
        assert_eq!(outcome.action, HookAction::Deny);
        assert_eq!(outcome.deny_reason(), Some("exec is not allowed here"));

        let outcome = hooks
            .fire(HookEvent::ToolPre, &serde_json::json!({"tool_name": "todo"}))
            .await;
        assert_eq!(outcome.action, HookAction::Continue);
    }

    #[tokio::test]
    async fn fire_without_handlers_continues() {
        let hooks = HookCoordinator::new();
        let outcome = hooks
            .fire(HookEvent::PromptSubmit, &serde_json::json!({}))
            .await;
        assert_eq!(outcome.action, HookAction::Continue);
    }

    #[test]
    fn inject_capability_follows_binding() {
        let hooks = HookCoordinator::new();
        assert!(hooks.get_capability("orchestrator.inject").is_none());

        let queue = Arc::new(InjectQueue::new());
        hooks.bind_inject(Some(queue.clone()));
        match hooks.get_capability("orchestrator.inject") {
            Some(Capability::Inject(q)) => {
                q.push("steer");
                assert_eq!(queue.len(), 1);
            }
            _ => panic!("expected inject capability"),
        }

        hooks.bind_inject(None);
        assert!(hooks.get_capability("orchestrator.inject").is_none());
    }

    #[test]
    fn tool_capability_lookup_by_name() {
        let hooks = HookCoordinator::new();
        hooks.mount_tool(Arc::new(hive_tools::TodoListTool::new()));
        assert!(matches!(
            hooks.get_capability("tool:todo"),
            Some(Capability::Tool(_))
        ));
        assert!(hooks.get_capability("tool:missing").is_none());
        assert!(hooks.get_capability("nonsense").is_none());
    }
}
