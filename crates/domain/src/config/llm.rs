use serde::{Deserialize, Serialize};

/// LLM provider configuration. When `providers` is empty the registry
/// falls back to credential detection (Anthropic > OpenAI > Gemini).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider id referenced in logs and errors.
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Model used when a request carries no override.
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    OpenaiCompat,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Environment variable to read the API key from.
    #[serde(default)]
    pub env: Option<String>,
    /// Plaintext key (discouraged; a warning is logged when used).
    #[serde(default)]
    pub key: Option<String>,
    /// OS keychain service name (with `account`).
    #[serde(default)]
    pub service: Option<String>,
    /// OS keychain account name (with `service`).
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    ApiKey,
    Keychain,
    None,
}
