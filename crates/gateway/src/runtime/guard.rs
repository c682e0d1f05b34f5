//! Approval gate for dangerous exec commands.
//!
//! A `tool:pre` hook that pauses `exec` calls matching the configured
//! patterns until a human clicks Approve in the thread. Deny is the
//! safe resolution everywhere: no approval channel mounted, timeout,
//! or an explicit Deny click all drop the call with a synthetic error
//! result (the loop continues and the model can react).

use std::sync::Weak;
use std::time::Duration;

use regex::RegexSet;

use super::hooks::{HookCoordinator, HookEvent, HookHandler, HookOutcome};

pub struct ExecApprovalHook {
    /// Late-bound: the coordinator owns this hook, so the backref must
    /// be weak.
    coordinator: Weak<HookCoordinator>,
    patterns: RegexSet,
    timeout: Duration,
}

impl ExecApprovalHook {
    pub fn new(
        coordinator: Weak<HookCoordinator>,
        patterns: &[String],
        timeout: Duration,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            coordinator,
            patterns: RegexSet::new(patterns)?,
            timeout,
        })
    }
}

fn command_from_payload(payload: &serde_json::Value) -> Option<String> {
    let args = payload.get("arguments")?;
    // Arguments arrive as an object or a JSON string.
    match args {
        serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(s)
            .ok()?
            .get("command")?
            .as_str()
            .map(String::from),
        other => other.get("command")?.as_str().map(String::from),
    }
}

#[async_trait::async_trait]
impl HookHandler for ExecApprovalHook {
    async fn handle(&self, event: HookEvent, payload: &serde_json::Value) -> HookOutcome {
        if event != HookEvent::ToolPre {
            return HookOutcome::proceed();
        }
        if payload.get("tool_name").and_then(|v| v.as_str()) != Some("exec") {
            return HookOutcome::proceed();
        }
        let Some(command) = command_from_payload(payload) else {
            return HookOutcome::proceed();
        };
        if !self.patterns.is_match(&command) {
            return HookOutcome::proceed();
        }

        let Some(coordinator) = self.coordinator.upgrade() else {
            return HookOutcome::deny("approval unavailable");
        };
        let Some(approval) = coordinator.approval() else {
            tracing::warn!(command = %command, "guarded command with no approval channel");
            return HookOutcome::deny("this command needs approval and no approver is reachable");
        };

        let options = vec!["Approve".to_string(), "Deny".to_string()];
        match approval
            .request_approval(
                &format!("The assistant wants to run:\n`{command}`"),
                &options,
                "Deny",
                self.timeout,
            )
            .await
        {
            Ok(choice) if choice == "Approve" => HookOutcome::proceed(),
            Ok(_) => HookOutcome::deny("the command was not approved"),
            Err(e) => {
                tracing::warn!(error = %e, "approval request failed");
                HookOutcome::deny("the approval request could not be delivered")
            }
        }
    }
}
