//! File shares in, outbox out.
//!
//! Shared files are downloaded into the instance working directory
//! (respecting the configured size cap) and surfaced to the model
//! through a preamble enumerating what landed where. After each
//! execution, anything a tool left in the session's `.outbox/` is
//! uploaded to the thread and removed locally.

use std::path::Path;
use std::sync::Arc;

use crate::slack::client::SlackClient;
use crate::slack::events::SlackFile;

/// Human-readable size, Slack style.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(['.', ' ']).to_string();
    if trimmed.is_empty() {
        "file".into()
    } else {
        trimmed
    }
}

/// Download shared files and build the user-visible preamble.
///
/// Oversized files are skipped with a friendly note; download failures
/// are noted the same way (the message itself still goes through).
pub async fn ingest_files(
    slack: &Arc<SlackClient>,
    files: &[SlackFile],
    working_dir: &Path,
    user: &str,
    size_cap: u64,
) -> String {
    let mut lines = Vec::new();

    for file in files {
        if file.size > size_cap {
            lines.push(format!(
                "- {} — that file's a bit too big for me ({}, my limit is {}), so I skipped it",
                file.name,
                format_size(file.size),
                format_size(size_cap),
            ));
            continue;
        }

        let dest = working_dir.join(safe_file_name(&file.name));
        match slack.download_file(&file.url_private, &dest).await {
            Ok(written) => {
                lines.push(format!(
                    "- {} ({}) → {}",
                    file.name,
                    format_size(written),
                    dest.display(),
                ));
            }
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "file download failed");
                lines.push(format!(
                    "- {} — I couldn't download that one, sorry",
                    file.name
                ));
            }
        }
    }

    format!(
        "[<@{user}> shared {} file(s):]\n{}",
        files.len(),
        lines.join("\n")
    )
}

/// Upload everything in the session's `.outbox/` to the thread, then
/// delete the local copies. Failures leave the file in place for the
/// next sweep.
pub async fn sweep_outbox(
    slack: &Arc<SlackClient>,
    outbox: &Path,
    channel: &str,
    thread_ts: Option<&str>,
) {
    let entries = match std::fs::read_dir(outbox) {
        Ok(entries) => entries,
        Err(_) => return, // no outbox yet
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match slack.upload_file(channel, thread_ts, &path).await {
            Ok(()) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "outbox cleanup failed");
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "outbox upload failed");
            }
        }
    }
}
