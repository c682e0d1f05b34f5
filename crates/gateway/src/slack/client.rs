//! Slack Web API wrapper.
//!
//! Thin typed surface over the handful of methods the gateway needs.
//! Two posting identities matter: `post_text`/`post_blocks` post as the
//! bot itself (editable — used for status messages), while
//! `post_as_persona` sets `username`/`icon_emoji` (non-editable by the
//! API — used for final responses). Rate-limited calls honor
//! `Retry-After`; 5xx responses retry with backoff.

use std::path::Path;
use std::time::Duration;

use hive_domain::error::{Error, Result};
use serde_json::Value;

const SLACK_API: &str = "https://slack.com/api";
const MAX_ATTEMPTS: u32 = 3;

/// A fetched Slack message (summon target lookup).
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub user: Option<String>,
    pub text: String,
    pub thread_ts: Option<String>,
    pub bot_id: Option<String>,
}

/// Channel metadata the dispatcher cares about.
#[derive(Debug, Clone, Default)]
pub struct ChannelInfo {
    pub name: String,
    pub topic: String,
}

pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(bot_token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            bot_token,
            base_url: SLACK_API.to_string(),
        })
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // ── Core call with rate-limit handling ─────────────────────────

    async fn call(&self, method: &str, payload: Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, method);
        let mut delay = Duration::from_millis(500);

        for attempt in 1..=MAX_ATTEMPTS {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(&self.bot_token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| Error::Http(e.to_string()))?;

            let status = resp.status();
            if status.as_u16() == 429 {
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                tracing::warn!(method, attempt, wait_sec = wait, "Slack rate limit");
                if attempt == MAX_ATTEMPTS {
                    return Err(Error::Slack {
                        method: method.into(),
                        message: "rate limited".into(),
                    });
                }
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }
            if status.is_server_error() {
                tracing::warn!(method, attempt, status = status.as_u16(), "Slack 5xx");
                if attempt == MAX_ATTEMPTS {
                    return Err(Error::Slack {
                        method: method.into(),
                        message: format!("HTTP {}", status.as_u16()),
                    });
                }
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            let body: Value = resp
                .json()
                .await
                .map_err(|e| Error::Http(e.to_string()))?;
            if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
                let err = body
                    .get("error")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown_error");
                return Err(Error::Slack {
                    method: method.into(),
                    message: err.into(),
                });
            }
            return Ok(body);
        }

        unreachable!("attempt loop always returns")
    }

    // ── Posting ────────────────────────────────────────────────────

    /// Post under the bot's own identity. The returned ts can be edited
    /// with `update_message` (persona posts cannot).
    pub async fn post_text(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<String> {
        let mut payload = serde_json::json!({"channel": channel, "text": text});
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = Value::String(ts.into());
        }
        let body = self.call("chat.postMessage", payload).await?;
        Ok(extract_ts(&body))
    }

    /// Post with a persona's display name and emoji (needs
    /// `chat:write.customize`).
    pub async fn post_as_persona(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
        display_name: &str,
        icon_emoji: &str,
    ) -> Result<String> {
        let mut payload = serde_json::json!({
            "channel": channel,
            "text": text,
            "username": display_name,
            "icon_emoji": icon_emoji,
        });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = Value::String(ts.into());
        }
        let body = self.call("chat.postMessage", payload).await?;
        Ok(extract_ts(&body))
    }

    pub async fn post_blocks(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        fallback: &str,
        blocks: &Value,
    ) -> Result<String> {
        let mut payload = serde_json::json!({
            "channel": channel,
            "text": fallback,
            "blocks": blocks,
        });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = Value::String(ts.into());
        }
        let body = self.call("chat.postMessage", payload).await?;
        Ok(extract_ts(&body))
    }

    /// Edit a bot-identity message in place. Replaces blocks with plain
    /// text, which is what the approval and status flows want.
    pub async fn update_message(&self, channel: &str, ts: &str, text: &str) -> Result<()> {
        self.call(
            "chat.update",
            serde_json::json!({
                "channel": channel,
                "ts": ts,
                "text": text,
                "blocks": [],
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_message(&self, channel: &str, ts: &str) -> Result<()> {
        self.call(
            "chat.delete",
            serde_json::json!({"channel": channel, "ts": ts}),
        )
        .await?;
        Ok(())
    }

    // ── Reactions ──────────────────────────────────────────────────

    pub async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<()> {
        match self
            .call(
                "reactions.add",
                serde_json::json!({"channel": channel, "timestamp": ts, "name": name}),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::Slack { message, .. }) if message == "already_reacted" => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn remove_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<()> {
        match self
            .call(
                "reactions.remove",
                serde_json::json!({"channel": channel, "timestamp": ts, "name": name}),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::Slack { message, .. }) if message == "no_reaction" => Ok(()),
            Err(e) => Err(e),
        }
    }

    // ── Lookups ────────────────────────────────────────────────────

    /// Fetch a single message by timestamp (summon + regenerate paths).
    pub async fn fetch_message(&self, channel: &str, ts: &str) -> Result<Option<FetchedMessage>> {
        let body = self
            .call(
                "conversations.history",
                serde_json::json!({
                    "channel": channel,
                    "latest": ts,
                    "oldest": ts,
                    "inclusive": true,
                    "limit": 1,
                }),
            )
            .await?;
        let msg = match body
            .get("messages")
            .and_then(|m| m.as_array())
            .and_then(|a| a.first())
        {
            Some(m) => m,
            None => return Ok(None),
        };
        Ok(Some(FetchedMessage {
            user: msg.get("user").and_then(|v| v.as_str()).map(String::from),
            text: msg
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            thread_ts: msg
                .get("thread_ts")
                .and_then(|v| v.as_str())
                .map(String::from),
            bot_id: msg.get("bot_id").and_then(|v| v.as_str()).map(String::from),
        }))
    }

    /// Channel name + topic (topic directives live in the topic string).
    pub async fn channel_info(&self, channel: &str) -> Result<ChannelInfo> {
        let body = self
            .call(
                "conversations.info",
                serde_json::json!({"channel": channel}),
            )
            .await?;
        let ch = body.get("channel").cloned().unwrap_or_default();
        Ok(ChannelInfo {
            name: ch
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            topic: ch
                .pointer("/topic/value")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        })
    }

    /// Open (or fetch) the DM channel with a user.
    pub async fn open_dm(&self, user: &str) -> Result<String> {
        let body = self
            .call("conversations.open", serde_json::json!({"users": user}))
            .await?;
        body.pointer("/channel/id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| Error::Slack {
                method: "conversations.open".into(),
                message: "no channel id in response".into(),
            })
    }

    /// Identity check; returns the bot's user id.
    pub async fn auth_test(&self) -> Result<String> {
        let body = self.call("auth.test", serde_json::json!({})).await?;
        body.get("user_id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| Error::Slack {
                method: "auth.test".into(),
                message: "no user_id in response".into(),
            })
    }

    // ── Files ──────────────────────────────────────────────────────

    /// Download a shared file's private URL to `dest`. Returns bytes
    /// written.
    pub async fn download_file(&self, url_private: &str, dest: &Path) -> Result<u64> {
        let resp = self
            .http
            .get(url_private)
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Slack {
                method: "files.download".into(),
                message: format!("HTTP {}", resp.status().as_u16()),
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        std::fs::write(dest, &bytes).map_err(Error::Io)?;
        Ok(bytes.len() as u64)
    }

    /// Upload a local file into a channel/thread, multipart form.
    pub async fn upload_file(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        path: &Path,
    ) -> Result<()> {
        let bytes = std::fs::read(path).map_err(Error::Io)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let mut form = reqwest::multipart::Form::new()
            .text("channels", channel.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            );
        if let Some(ts) = thread_ts {
            form = form.text("thread_ts", ts.to_string());
        }

        let resp = self
            .http
            .post(format!("{}/files.upload", self.base_url))
            .bearer_auth(&self.bot_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let err = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown_error");
            return Err(Error::Slack {
                method: "files.upload".into(),
                message: err.into(),
            });
        }
        Ok(())
    }
}

fn extract_ts(body: &Value) -> String {
    body.get("ts")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
