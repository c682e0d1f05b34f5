//! Provider registry.
//!
//! Constructs the LLM provider used by every session in this process.
//! Selection happens once at startup: explicitly configured providers win;
//! otherwise credentials are detected from the environment in priority
//! order Anthropic > OpenAI > Gemini. With neither, startup fails with
//! [`Error::NoProviderConfigured`] so the user sees a setup error instead
//! of a silent drop.

use crate::anthropic::AnthropicProvider;
use crate::google::GoogleProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use hive_domain::config::{AuthConfig, LlmConfig, ProviderConfig, ProviderKind};
use hive_domain::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Detection table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// (provider id, kind, env var, default base URL), highest priority first.
const DETECTION_ORDER: &[(&str, ProviderKind, &str, &str)] = &[
    (
        "anthropic",
        ProviderKind::Anthropic,
        "ANTHROPIC_API_KEY",
        "https://api.anthropic.com",
    ),
    (
        "openai",
        ProviderKind::OpenaiCompat,
        "OPENAI_API_KEY",
        "https://api.openai.com/v1",
    ),
    (
        "gemini",
        ProviderKind::Google,
        "GEMINI_API_KEY",
        "https://generativelanguage.googleapis.com",
    ),
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers; the first successfully
/// initialized one is the process-wide primary.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    primary: String,
    init_errors: Vec<ProviderInitError>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("primary", &self.primary)
            .field("init_errors", &self.init_errors)
            .finish()
    }
}

/// Records a provider that failed to initialize.
#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    pub kind: String,
    /// Error message with any potential secrets masked.
    pub error: String,
}

/// Mask substrings that look like API keys or bearer tokens in an error
/// message, so raw secrets never reach logs or status output.
fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let masked = format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..]);
            result = result.replace(trimmed, &masked);
        }
    }
    result
}

fn instantiate(pc: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    match pc.kind {
        ProviderKind::Anthropic => {
            AnthropicProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
        }
        ProviderKind::OpenaiCompat => {
            OpenAiCompatProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
        }
        ProviderKind::Google => {
            GoogleProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
        }
    }
}

impl ProviderRegistry {
    /// Select the process-wide provider.
    ///
    /// Explicitly configured providers take priority; when the config has
    /// none, credentials are detected from the environment in the order
    /// Anthropic > OpenAI > Gemini.
    pub fn detect(config: &LlmConfig) -> Result<Self> {
        if !config.providers.is_empty() {
            return Self::from_config(config);
        }

        for (id, kind, env_var, base_url) in DETECTION_ORDER {
            if std::env::var(env_var).map(|v| !v.is_empty()).unwrap_or(false) {
                let pc = ProviderConfig {
                    id: (*id).into(),
                    kind: *kind,
                    base_url: (*base_url).into(),
                    auth: AuthConfig {
                        env: Some((*env_var).into()),
                        ..AuthConfig::default()
                    },
                    default_model: None,
                };
                tracing::info!(provider = %id, env_var = %env_var, "LLM provider detected from credentials");
                return Self::from_config(&LlmConfig { providers: vec![pc] });
            }
        }

        Err(Error::NoProviderConfigured)
    }

    /// Build the registry from explicitly configured providers.
    ///
    /// Providers that fail to initialize are logged (secrets masked) and
    /// skipped; if none survive, startup fails.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut primary: Option<String> = None;
        let mut init_errors: Vec<ProviderInitError> = Vec::new();

        for pc in &config.providers {
            match instantiate(pc) {
                Ok(provider) => {
                    tracing::info!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        "registered LLM provider"
                    );
                    if primary.is_none() {
                        primary = Some(pc.id.clone());
                    }
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    let safe_error = mask_secrets(&e.to_string());
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %safe_error,
                        "failed to initialize LLM provider, skipping"
                    );
                    init_errors.push(ProviderInitError {
                        provider_id: pc.id.clone(),
                        kind: format!("{:?}", pc.kind),
                        error: safe_error,
                    });
                }
            }
        }

        let primary = primary.ok_or(Error::NoProviderConfigured)?;

        Ok(Self {
            providers,
            primary,
            init_errors,
        })
    }

    /// The process-wide primary provider.
    pub fn primary(&self) -> Arc<dyn LlmProvider> {
        self.providers
            .get(&self.primary)
            .cloned()
            .expect("primary provider always present after construction")
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Provider initialization errors (empty if all succeeded).
    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_secrets_hides_long_tokens() {
        let msg = "auth failed for key sk-ant-REDACTED";
        let masked = mask_secrets(msg);
        assert!(!masked.contains("abcdefghijklmnopqrstuvwxyz"));
        assert!(masked.contains("sk-a...3456"));
    }

    #[test]
    fn mask_secrets_leaves_short_words_alone() {
        let msg = "environment variable 'MY_KEY' not set";
        assert_eq!(mask_secrets(msg), msg);
    }

    #[test]
    fn empty_config_and_no_credentials_fails() {
        // Ensure a hermetic environment for this test.
        for (_, _, env_var, _) in DETECTION_ORDER {
            std::env::remove_var(env_var);
        }
        let err = ProviderRegistry::detect(&LlmConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NoProviderConfigured));
    }

    #[test]
    fn explicit_config_wins_over_detection() {
        let config = LlmConfig {
            providers: vec![ProviderConfig {
                id: "local".into(),
                kind: ProviderKind::OpenaiCompat,
                base_url: "http://localhost:11434/v1".into(),
                auth: AuthConfig {
                    mode: hive_domain::config::AuthMode::None,
                    ..AuthConfig::default()
                },
                default_model: Some("llama3".into()),
            }],
        };
        let registry = ProviderRegistry::detect(&config).unwrap();
        assert_eq!(registry.primary().provider_id(), "local");
        assert_eq!(registry.list_providers(), vec!["local"]);
    }

    #[test]
    fn first_working_provider_becomes_primary() {
        let config = LlmConfig {
            providers: vec![
                // Fails: api_key mode with a missing env var.
                ProviderConfig {
                    id: "broken".into(),
                    kind: ProviderKind::Anthropic,
                    base_url: "https://api.anthropic.com".into(),
                    auth: AuthConfig {
                        env: Some("HIVE_TEST_MISSING_KEY_4242".into()),
                        ..AuthConfig::default()
                    },
                    default_model: None,
                },
                ProviderConfig {
                    id: "local".into(),
                    kind: ProviderKind::OpenaiCompat,
                    base_url: "http://localhost:8000/v1".into(),
                    auth: AuthConfig {
                        mode: hive_domain::config::AuthMode::None,
                        ..AuthConfig::default()
                    },
                    default_model: None,
                },
            ],
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.primary().provider_id(), "local");
        assert_eq!(registry.init_errors().len(), 1);
        assert_eq!(registry.init_errors()[0].provider_id, "broken");
    }
}
