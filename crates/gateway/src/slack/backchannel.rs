//! Slack implementations of the display and approval back-channels.
//!
//! Both close over a concrete channel/thread, so the dispatcher builds
//! fresh instances per execution and installs them on the session.

use std::sync::Arc;
use std::time::Duration;

use hive_domain::error::Result;

use crate::runtime::approval::ApprovalBroker;
use crate::runtime::hooks::{ApprovalChannel, DisplayChannel, DisplayLevel};
use crate::slack::client::SlackClient;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Display
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SlackDisplay {
    slack: Arc<SlackClient>,
    channel: String,
    thread_ts: Option<String>,
}

impl SlackDisplay {
    pub fn new(slack: Arc<SlackClient>, channel: String, thread_ts: Option<String>) -> Self {
        Self {
            slack,
            channel,
            thread_ts,
        }
    }
}

/// Level prefix for the posted text: warnings and errors get a marker,
/// info goes through bare.
pub fn level_prefix(level: DisplayLevel) -> &'static str {
    match level {
        DisplayLevel::Info => "",
        DisplayLevel::Warning => "⚠️ ",
        DisplayLevel::Error => "🚨 ",
    }
}

#[async_trait::async_trait]
impl DisplayChannel for SlackDisplay {
    async fn show_message(&self, text: &str, level: DisplayLevel, source: &str) {
        let body = format!("{}{}", level_prefix(level), text);
        let slack = self.slack.clone();
        let channel = self.channel.clone();
        let thread = self.thread_ts.clone();
        let source = source.to_string();
        // Fire-and-forget: hooks must never block on Slack, and a failed
        // post is logged, not raised.
        tokio::spawn(async move {
            if let Err(e) = slack.post_text(&channel, thread.as_deref(), &body).await {
                tracing::warn!(error = %e, source = %source, "display post failed");
            }
        });
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Approval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SlackApproval {
    broker: Arc<ApprovalBroker>,
    channel: String,
    thread_ts: Option<String>,
    /// Applied when a hook passes a zero deadline.
    default_timeout: Duration,
}

impl SlackApproval {
    pub fn new(
        broker: Arc<ApprovalBroker>,
        channel: String,
        thread_ts: Option<String>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            broker,
            channel,
            thread_ts,
            default_timeout,
        }
    }
}

#[async_trait::async_trait]
impl ApprovalChannel for SlackApproval {
    async fn request_approval(
        &self,
        prompt: &str,
        options: &[String],
        default: &str,
        timeout: Duration,
    ) -> Result<String> {
        let timeout = if timeout.is_zero() {
            self.default_timeout
        } else {
            timeout
        };
        self.broker
            .request(
                &self.channel,
                self.thread_ts.as_deref(),
                prompt,
                options,
                default,
                timeout,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_prefixes() {
        assert_eq!(level_prefix(DisplayLevel::Info), "");
        assert_eq!(level_prefix(DisplayLevel::Warning), "⚠️ ");
        assert_eq!(level_prefix(DisplayLevel::Error), "🚨 ");
    }
}
