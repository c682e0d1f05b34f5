use serde::{Deserialize, Serialize};

/// Slack connection settings. Tokens are read from environment variables
/// at startup, never stored in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Env var holding the app-level token (`xapp-…`) for Socket Mode.
    #[serde(default = "d_app_token_env")]
    pub app_token_env: String,
    /// Env var holding the bot token (`xoxb-…`) for the Web API.
    #[serde(default = "d_bot_token_env")]
    pub bot_token_env: String,
    /// Maximum accepted size for a shared file, in bytes.
    #[serde(default = "d_file_size_cap")]
    pub file_size_cap_bytes: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            app_token_env: d_app_token_env(),
            bot_token_env: d_bot_token_env(),
            file_size_cap_bytes: d_file_size_cap(),
        }
    }
}

fn d_app_token_env() -> String {
    "HIVE_SLACK_APP_TOKEN".into()
}

fn d_bot_token_env() -> String {
    "HIVE_SLACK_BOT_TOKEN".into()
}

fn d_file_size_cap() -> u64 {
    25 * 1024 * 1024
}
