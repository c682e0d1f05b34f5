use serde::{Deserialize, Serialize};

/// Tuning knobs for the orchestrator and dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Hard cap on orchestrator loop iterations per execution.
    #[serde(default = "d_max_iterations")]
    pub max_iterations: u32,
    /// Tools that, once run, force the next provider request to carry no
    /// tools so the model must address the user directly.
    #[serde(default = "d_force_respond_tools")]
    pub force_respond_tools: Vec<String>,
    /// Seconds before an unanswered approval resolves to its default.
    #[serde(default = "d_approval_timeout")]
    pub approval_default_timeout_sec: u64,
    /// Exec commands matching any of these regexes pause for human
    /// approval before running.
    #[serde(default = "d_approval_patterns")]
    pub exec_approval_patterns: Vec<String>,
    /// Minimum seconds between status-message updates.
    #[serde(default = "d_status_throttle")]
    pub status_throttle_secs: u64,
    /// Capacity of the thread-ownership LRU.
    #[serde(default = "d_thread_owner_capacity")]
    pub thread_owner_capacity: usize,
    /// Milliseconds between sequential roundtable persona posts.
    /// Slack's per-channel post rate is 1/s; the extra headroom also
    /// paces the thread visually.
    #[serde(default = "d_roundtable_gap")]
    pub roundtable_post_gap_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: d_max_iterations(),
            force_respond_tools: d_force_respond_tools(),
            approval_default_timeout_sec: d_approval_timeout(),
            exec_approval_patterns: d_approval_patterns(),
            status_throttle_secs: d_status_throttle(),
            thread_owner_capacity: d_thread_owner_capacity(),
            roundtable_post_gap_ms: d_roundtable_gap(),
        }
    }
}

fn d_max_iterations() -> u32 {
    40
}

fn d_force_respond_tools() -> Vec<String> {
    vec!["dispatch_worker".into()]
}

fn d_approval_timeout() -> u64 {
    120
}

fn d_approval_patterns() -> Vec<String> {
    vec![
        r"^sudo\b".into(),
        r"rm\s+-[a-z]*[rf]".into(),
        r"git\s+push\s+.*--force".into(),
    ]
}

fn d_status_throttle() -> u64 {
    2
}

fn d_thread_owner_capacity() -> usize {
    10_000
}

fn d_roundtable_gap() -> u64 {
    1_500
}
