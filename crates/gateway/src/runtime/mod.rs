//! Core runtime — sessions, the agent loop, capability mounting, and
//! progress plumbing.
//!
//! Entry point: [`session::SessionRegistry::execute`] takes an
//! `(instance, conversation)` pair plus a user prompt and drives
//! [`orchestrator::Orchestrator::run`] under the session's mutex.

pub mod approval;
pub mod cancel;
pub mod guard;
pub mod hooks;
pub mod inject;
pub mod orchestrator;
pub mod progress;
pub mod session;

use std::sync::Arc;

use hive_sessions::TranscriptWriter;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transcript sink
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Write handle for one session's transcript. Append failures are
/// logged, never raised: the durable record is best-effort relative to
/// the live conversation.
#[derive(Clone)]
pub struct TranscriptSink {
    writer: Arc<TranscriptWriter>,
    stem: String,
}

impl TranscriptSink {
    pub fn new(writer: Arc<TranscriptWriter>, stem: String) -> Self {
        Self { writer, stem }
    }

    pub fn record(&self, role: &str, content: &str, metadata: Option<serde_json::Value>) {
        let mut line = TranscriptWriter::line(role, content);
        line.metadata = metadata;
        if let Err(e) = self.writer.append(&self.stem, &[line]) {
            tracing::warn!(
                session = %self.stem,
                error = %e,
                "failed to persist transcript line"
            );
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Small helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Truncate at a char boundary, appending `...` when anything was cut.
pub(crate) fn truncate_str(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Short display form of tool arguments for progress events.
pub(crate) fn args_digest(args: &serde_json::Value) -> String {
    let compact = match args {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_str(&compact, 100)
}
