//! Exec tool — run a shell command in the instance working directory.
//!
//! Foreground only: run the command, wait up to the timeout, return
//! combined output. On timeout the child is killed and the partial
//! output is returned with a marker. Output is capped so a chatty
//! command can't blow up the model context.

use std::path::PathBuf;
use std::time::Duration;

use hive_domain::error::Result;
use serde::Deserialize;
use tokio::process::Command;

use crate::Tool;

const DEFAULT_TIMEOUT_SEC: u64 = 60;
const MAX_OUTPUT_CHARS: usize = 20_000;

pub struct ExecTool {
    working_dir: PathBuf,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ExecArgs {
    command: String,
    /// Override the hard timeout (seconds).
    #[serde(default)]
    timeout_sec: Option<u64>,
}

impl ExecTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SEC),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Truncate command output at a char boundary, keeping the head.
fn cap_output(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}\n[output truncated at {max} chars]", &s[..end])
}

#[async_trait::async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Run a shell command in the working directory and return its combined \
         stdout/stderr. Long-running commands are killed at the timeout."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "timeout_sec": {"type": "integer", "minimum": 1},
            },
            "required": ["command"],
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let parsed: ExecArgs = match args {
            serde_json::Value::String(s) => serde_json::from_str(s)?,
            other => serde_json::from_value(other.clone())?,
        };
        let timeout = parsed
            .timeout_sec
            .map(Duration::from_secs)
            .unwrap_or(self.timeout);

        std::fs::create_dir_all(&self.working_dir)?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&parsed.command)
            .current_dir(&self.working_dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let waited = tokio::time::timeout(timeout, async {
            use tokio::io::AsyncReadExt;
            let mut out = String::new();
            let mut err = String::new();
            if let Some(mut s) = stdout {
                let _ = s.read_to_string(&mut out).await;
            }
            if let Some(mut s) = stderr {
                let _ = s.read_to_string(&mut err).await;
            }
            let status = child.wait().await;
            (out, err, status)
        })
        .await;

        match waited {
            Ok((out, err, status)) => {
                let code = status
                    .map(|s| s.code().unwrap_or(-1))
                    .unwrap_or(-1);
                let mut combined = out;
                if !err.is_empty() {
                    if !combined.is_empty() {
                        combined.push('\n');
                    }
                    combined.push_str(&err);
                }
                let body = cap_output(combined.trim_end(), MAX_OUTPUT_CHARS);
                if code == 0 {
                    Ok(body)
                } else {
                    Ok(format!("exit code {code}\n{body}"))
                }
            }
            Err(_) => {
                tracing::warn!(
                    command = %parsed.command,
                    timeout_sec = timeout.as_secs(),
                    "exec timed out, killing child"
                );
                Ok(format!(
                    "command timed out after {}s and was killed",
                    timeout.as_secs()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(dir: &tempfile::TempDir) -> ExecTool {
        ExecTool::new(dir.path().to_path_buf())
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let out = tool(&dir)
            .execute(&serde_json::json!({"command": "ls"}))
            .await
            .unwrap();
        assert!(out.contains("marker.txt"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = tool(&dir)
            .execute(&serde_json::json!({"command": "exit 3"}))
            .await
            .unwrap();
        assert!(out.starts_with("exit code 3"));
    }

    #[tokio::test]
    async fn stderr_is_captured() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = tool(&dir)
            .execute(&serde_json::json!({"command": "echo oops >&2"}))
            .await
            .unwrap();
        assert!(out.contains("oops"));
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = tool(&dir)
            .with_timeout(Duration::from_millis(100))
            .execute(&serde_json::json!({"command": "sleep 5"}))
            .await
            .unwrap();
        assert!(out.contains("timed out"));
    }

    #[test]
    fn cap_output_respects_char_boundaries() {
        let s = "h\u{00e9}llo";
        let capped = cap_output(s, 2);
        assert!(capped.starts_with('h'));
        assert!(capped.contains("truncated"));
    }
}
