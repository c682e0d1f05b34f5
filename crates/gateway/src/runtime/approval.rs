//! Interactive approvals over Slack buttons.
//!
//! A hook that needs a human decision posts a button message (one button
//! per option, each action id carrying a unique correlation id) and
//! waits on a oneshot. Button clicks arrive through the Socket Mode
//! event stream and resolve the pending entry; an unanswered request
//! resolves to its default at the deadline. The pending map is keyed by
//! correlation id so concurrent approvals never cross.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hive_domain::error::Result;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::slack::client::SlackClient;

const ACTION_PREFIX: &str = "approval";

struct PendingApproval {
    options: Vec<String>,
    respond: oneshot::Sender<String>,
}

pub struct ApprovalBroker {
    slack: Arc<SlackClient>,
    pending: Mutex<HashMap<Uuid, PendingApproval>>,
}

/// Build the block payload for an approval prompt.
fn approval_blocks(id: Uuid, prompt: &str, options: &[String]) -> serde_json::Value {
    let buttons: Vec<serde_json::Value> = options
        .iter()
        .enumerate()
        .map(|(i, opt)| {
            serde_json::json!({
                "type": "button",
                "text": {"type": "plain_text", "text": opt},
                "action_id": format!("{ACTION_PREFIX}:{id}:{i}"),
                "value": opt,
            })
        })
        .collect();

    serde_json::json!([
        {"type": "section", "text": {"type": "mrkdwn", "text": prompt}},
        {"type": "actions", "elements": buttons},
    ])
}

impl ApprovalBroker {
    pub fn new(slack: Arc<SlackClient>) -> Self {
        Self {
            slack,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Post the prompt and wait for a click or the deadline.
    ///
    /// On click the message is edited in place to show the resolution;
    /// on timeout it is edited to show that the default applied.
    pub async fn request(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        prompt: &str,
        options: &[String],
        default: &str,
        timeout: Duration,
    ) -> Result<String> {
        let id = Uuid::new_v4();
        let blocks = approval_blocks(id, prompt, options);
        let ts = self
            .slack
            .post_blocks(channel, thread_ts, prompt, &blocks)
            .await?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            id,
            PendingApproval {
                options: options.to_vec(),
                respond: tx,
            },
        );

        let chosen = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(choice)) => {
                let done = format!("✅ {prompt} — *{choice}*");
                if let Err(e) = self.slack.update_message(channel, &ts, &done).await {
                    tracing::warn!(error = %e, "failed to edit resolved approval message");
                }
                choice
            }
            _ => {
                // Deadline elapsed (or the sender vanished): default wins.
                self.pending.lock().remove(&id);
                let done = format!("{prompt} — *{default}* (default)");
                if let Err(e) = self.slack.update_message(channel, &ts, &done).await {
                    tracing::warn!(error = %e, "failed to edit expired approval message");
                }
                default.to_string()
            }
        };

        Ok(chosen)
    }

    /// Resolve a pending approval from a button click. Returns `false`
    /// for unknown or already-resolved correlation ids (stale clicks).
    pub fn handle_action(&self, action_id: &str) -> bool {
        let Some((id, index)) = parse_action_id(action_id) else {
            return false;
        };
        let Some(pending) = self.pending.lock().remove(&id) else {
            return false;
        };
        let Some(choice) = pending.options.get(index).cloned() else {
            tracing::warn!(action_id, "approval click with out-of-range option index");
            return false;
        };
        pending.respond.send(choice).is_ok()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

fn parse_action_id(action_id: &str) -> Option<(Uuid, usize)> {
    let mut parts = action_id.splitn(3, ':');
    if parts.next()? != ACTION_PREFIX {
        return None;
    }
    let id = Uuid::parse_str(parts.next()?).ok()?;
    let index = parts.next()?.parse().ok()?;
    Some((id, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_id_round_trip() {
        let id = Uuid::new_v4();
        let action = format!("{ACTION_PREFIX}:{id}:2");
        assert_eq!(parse_action_id(&action), Some((id, 2)));
    }

    #[test]
    fn action_id_rejects_garbage() {
        assert!(parse_action_id("not-an-approval").is_none());
        assert!(parse_action_id("approval:not-a-uuid:0").is_none());
        let id = Uuid::new_v4();
        assert!(parse_action_id(&format!("approval:{id}:x")).is_none());
        assert!(parse_action_id(&format!("other:{id}:0")).is_none());
    }

    #[test]
    fn approval_blocks_carry_correlated_action_ids() {
        let id = Uuid::new_v4();
        let options = vec!["Yes".to_string(), "No".to_string()];
        let blocks = approval_blocks(id, "Deploy?", &options);
        let buttons = blocks[1]["elements"].as_array().unwrap();
        assert_eq!(buttons.len(), 2);
        for (i, button) in buttons.iter().enumerate() {
            let action_id = button["action_id"].as_str().unwrap();
            assert_eq!(parse_action_id(action_id), Some((id, i)));
        }
    }
}
