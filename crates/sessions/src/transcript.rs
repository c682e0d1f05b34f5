//! Append-only JSONL transcripts.
//!
//! Each session gets a `<instance>-<conv_id>.jsonl` file under the
//! sessions directory. Every message, tool call, tool result, and system
//! event is appended as a single JSON line. Transcripts outlive Slack's
//! retention and survive process restarts; replaying one reconstructs
//! the session's message context.

use std::path::{Path, PathBuf};

use chrono::Utc;
use hive_domain::error::{Error, Result};
use hive_domain::tool::{Message, Role, ToolCall};
use serde::{Deserialize, Serialize};

/// A single transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub timestamp: String,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Writes append-only JSONL transcript files.
pub struct TranscriptWriter {
    base_dir: PathBuf,
}

impl TranscriptWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    /// Append one or more lines to a session's transcript.
    pub fn append(&self, session_stem: &str, lines: &[TranscriptLine]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.base_dir).map_err(Error::Io)?;
        let path = self.base_dir.join(format!("{session_stem}.jsonl"));
        let mut buf = String::new();
        for line in lines {
            let json = serde_json::to_string(line)
                .map_err(|e| Error::Other(format!("serializing transcript line: {e}")))?;
            buf.push_str(&json);
            buf.push('\n');
        }

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(Error::Io)?;
        file.write_all(buf.as_bytes()).map_err(Error::Io)?;

        Ok(())
    }

    /// Helper to create a transcript line with the current timestamp.
    pub fn line(role: &str, content: &str) -> TranscriptLine {
        TranscriptLine {
            timestamp: Utc::now().to_rfc3339(),
            role: role.to_owned(),
            content: content.to_owned(),
            metadata: None,
        }
    }

    /// Read back a transcript. Malformed lines are skipped with a warning
    /// so one bad write never poisons a session.
    pub fn read(&self, session_stem: &str) -> Result<Vec<TranscriptLine>> {
        let path = self.base_dir.join(format!("{session_stem}.jsonl"));
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
        let mut lines = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TranscriptLine>(line) {
                Ok(tl) => lines.push(tl),
                Err(e) => {
                    tracing::warn!(
                        session = session_stem,
                        error = %e,
                        "skipping malformed transcript line"
                    );
                }
            }
        }
        Ok(lines)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Replay
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert transcript lines back into LLM messages.
///
/// Assistant lines carrying `tool_calls` metadata become assistant
/// messages with tool-use parts; tool lines need a `call_id` to become
/// tool results (orphans are skipped); system event lines are skipped
/// (they are operator breadcrumbs, not model context).
pub fn lines_to_messages(lines: &[TranscriptLine]) -> Vec<Message> {
    let mut messages = Vec::new();

    for line in lines {
        let role = match line.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => continue,
        };

        match role {
            Role::Tool => {
                if let Some(meta) = &line.metadata {
                    if let Some(call_id) = meta.get("call_id").and_then(|v| v.as_str()) {
                        let is_error = meta
                            .get("is_error")
                            .and_then(|v| v.as_bool())
                            .unwrap_or(false);
                        if is_error {
                            messages.push(Message::tool_error(call_id, &line.content));
                        } else {
                            messages.push(Message::tool_result(call_id, &line.content));
                        }
                    }
                }
            }
            Role::Assistant => {
                let tool_calls: Vec<ToolCall> = line
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("tool_calls"))
                    .and_then(|v| v.as_str())
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_default();
                if tool_calls.is_empty() {
                    messages.push(Message::assistant(&line.content));
                } else {
                    messages.push(Message::assistant_with_tool_calls(
                        &line.content,
                        &tool_calls,
                    ));
                }
            }
            _ => messages.push(Message::user(&line.content)),
        }
    }

    messages
}
