use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted state layout. Everything lives under one directory:
///
/// - `sessions/<instance>-<conv_id>.jsonl` — append-only transcripts
/// - `users/<user_id>/onboarding.json`     — onboarding records
/// - `workspace/<instance>/`               — per-instance working dirs
///   (including `.outbox/` for outbound files)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "d_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: d_state_path(),
        }
    }
}

impl StateConfig {
    pub fn sessions_dir(&self) -> PathBuf {
        self.path.join("sessions")
    }

    pub fn users_dir(&self) -> PathBuf {
        self.path.join("users")
    }

    pub fn workspace_dir(&self, instance: &str) -> PathBuf {
        self.path.join("workspace").join(instance)
    }

    pub fn outbox_dir(&self, instance: &str) -> PathBuf {
        self.workspace_dir(instance).join(".outbox")
    }
}

fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}
