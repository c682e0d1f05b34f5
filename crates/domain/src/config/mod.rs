mod instances;
mod llm;
mod runtime;
mod slack;
mod state;

pub use instances::*;
pub use llm::*;
pub use runtime::*;
pub use slack::*;
pub use state::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub state: StateConfig,
}

impl Config {
    /// The default instance name: `defaults.instance` when set, otherwise
    /// the first configured instance.
    pub fn default_instance(&self) -> Option<&str> {
        if !self.defaults.instance.is_empty() {
            return Some(self.defaults.instance.as_str());
        }
        self.instances.first().map(|i| i.name.as_str())
    }

    /// Look up an instance by name (case-insensitive, as Slack reaction
    /// names are lowercase).
    pub fn instance(&self, name: &str) -> Option<&InstanceConfig> {
        self.instances
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Names of all configured instances.
    pub fn instance_names(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.name.clone()).collect()
    }

    /// Effective working directory for an instance: its configured
    /// override, or `<state>/workspace/<name>`.
    pub fn working_dir_for(&self, instance: &InstanceConfig) -> std::path::PathBuf {
        instance
            .working_dir
            .clone()
            .unwrap_or_else(|| self.state.workspace_dir(&instance.name))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

/// Instance names double as Slack reaction names: lowercase ASCII
/// letters, digits, `_` and `-`, non-empty.
fn valid_instance_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.instances.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "instances".into(),
                message: "at least one [[instances]] entry is required".into(),
            });
        }

        let mut seen_names: HashSet<&str> = HashSet::new();
        for (i, inst) in self.instances.iter().enumerate() {
            if !valid_instance_name(&inst.name) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("instances[{i}].name"),
                    message: format!(
                        "\"{}\" is not a valid instance name (lowercase letters, digits, '_', '-'; it doubles as the summon reaction)",
                        inst.name
                    ),
                });
            }
            if !inst.name.is_empty() && !seen_names.insert(&inst.name) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("instances[{i}].name"),
                    message: format!("duplicate instance name \"{}\"", inst.name),
                });
            }
            let emoji = &inst.persona.emoji;
            if !emoji.is_empty() && !(emoji.starts_with(':') && emoji.ends_with(':')) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("instances[{i}].persona.emoji"),
                    message: format!(
                        "emoji \"{emoji}\" should be a shortcode like \":robot_face:\""
                    ),
                });
            }
        }

        if !self.defaults.instance.is_empty()
            && self.instance(&self.defaults.instance).is_none()
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "defaults.instance".into(),
                message: format!(
                    "\"{}\" does not match any configured instance",
                    self.defaults.instance
                ),
            });
        }

        if self.runtime.max_iterations == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "runtime.max_iterations".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.runtime.thread_owner_capacity == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "runtime.thread_owner_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.slack.file_size_cap_bytes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "slack.file_size_cap_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }

        // ── LLM provider validation ───────────────────────────────────
        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if !provider.base_url.starts_with("http://")
                && !provider.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
            if !provider.id.is_empty() && !seen_ids.insert(&provider.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("llm.providers[{i}].id"),
                    message: format!(
                        "duplicate provider id \"{}\" — later provider will shadow earlier one",
                        provider.id
                    ),
                });
            }
            if provider.auth.mode == AuthMode::ApiKey {
                let has_env = provider.auth.env.as_ref().is_some_and(|v| !v.is_empty());
                let has_key = provider.auth.key.as_ref().is_some_and(|v| !v.is_empty());
                if !has_env && !has_key {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("llm.providers[{i}].auth"),
                        message: format!(
                            "provider \"{}\" uses api_key auth mode but has no auth.env or auth.key configured",
                            provider.id
                        ),
                    });
                }
            }
        }

        // Force-respond tools that no bundle provides are almost always a
        // typo; warn rather than error (bundles may mount them later).
        for (i, name) in self.runtime.force_respond_tools.iter().enumerate() {
            if name.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("runtime.force_respond_tools[{i}]"),
                    message: "empty tool name".into(),
                });
            }
        }

        // Approval patterns must compile; a bad regex would otherwise
        // only surface on the first dangerous command.
        for (i, pattern) in self.runtime.exec_approval_patterns.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("runtime.exec_approval_patterns[{i}]"),
                    message: format!("invalid regex \"{pattern}\": {e}"),
                });
            }
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: build a minimal valid Config.
    fn valid_config() -> Config {
        Config {
            instances: vec![
                InstanceConfig {
                    name: "alpha".into(),
                    bundle: "default".into(),
                    working_dir: None,
                    persona: PersonaConfig {
                        display_name: "Alpha".into(),
                        emoji: ":owl:".into(),
                    },
                    enabled: true,
                },
                InstanceConfig {
                    name: "beta".into(),
                    bundle: "default".into(),
                    working_dir: None,
                    persona: PersonaConfig::default(),
                    enabled: true,
                },
            ],
            defaults: DefaultsConfig {
                instance: "alpha".into(),
            },
            ..Config::default()
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn no_instances_is_error() {
        let mut cfg = valid_config();
        cfg.instances.clear();
        cfg.defaults.instance.clear();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "instances").expect("expected instances error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn uppercase_instance_name_is_error() {
        let mut cfg = valid_config();
        cfg.instances[0].name = "Alpha".into();
        cfg.defaults.instance = "beta".into();
        let issues = cfg.validate();
        let issue =
            find_issue(&issues, "instances[0].name").expect("expected instance name error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn duplicate_instance_name_is_error() {
        let mut cfg = valid_config();
        cfg.instances[1].name = "alpha".into();
        let issues = cfg.validate();
        let issue =
            find_issue(&issues, "instances[1].name").expect("expected duplicate name error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
        assert!(issue.message.contains("duplicate"));
    }

    #[test]
    fn unknown_default_instance_is_error() {
        let mut cfg = valid_config();
        cfg.defaults.instance = "gamma".into();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "defaults.instance").expect("expected defaults error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn bare_emoji_is_warning() {
        let mut cfg = valid_config();
        cfg.instances[0].persona.emoji = "owl".into();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "instances[0].persona.emoji")
            .expect("expected emoji warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn zero_max_iterations_is_error() {
        let mut cfg = valid_config();
        cfg.runtime.max_iterations = 0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "runtime.max_iterations").is_some());
    }

    #[test]
    fn provider_api_key_mode_no_credentials_is_error() {
        let mut cfg = valid_config();
        cfg.llm.providers.push(ProviderConfig {
            id: "anthropic".into(),
            kind: ProviderKind::Anthropic,
            base_url: "https://api.anthropic.com".into(),
            auth: AuthConfig::default(),
            default_model: None,
        });
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.providers[0].auth").expect("expected auth error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn provider_bad_url_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.llm.providers.push(ProviderConfig {
            id: "local".into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "ws://localhost:1234".into(),
            auth: AuthConfig {
                mode: AuthMode::None,
                ..AuthConfig::default()
            },
            default_model: None,
        });
        let issues = cfg.validate();
        let issue =
            find_issue(&issues, "llm.providers[0].base_url").expect("expected base_url error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn default_approval_patterns_are_valid_regexes() {
        let cfg = valid_config();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "runtime.exec_approval_patterns").is_none());
    }

    #[test]
    fn invalid_approval_pattern_is_error() {
        let mut cfg = valid_config();
        cfg.runtime.exec_approval_patterns = vec!["[unclosed".into()];
        let issues = cfg.validate();
        let issue = find_issue(&issues, "runtime.exec_approval_patterns[0]")
            .expect("expected regex error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn default_instance_falls_back_to_first() {
        let mut cfg = valid_config();
        cfg.defaults.instance.clear();
        assert_eq!(cfg.default_instance(), Some("alpha"));
    }

    #[test]
    fn instance_lookup_is_case_insensitive() {
        let cfg = valid_config();
        assert!(cfg.instance("ALPHA").is_some());
        assert!(cfg.instance("gamma").is_none());
    }

    #[test]
    fn defaults_from_empty_toml() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.runtime.max_iterations, 40);
        assert_eq!(cfg.runtime.force_respond_tools, vec!["dispatch_worker"]);
        assert_eq!(cfg.runtime.thread_owner_capacity, 10_000);
        assert_eq!(cfg.runtime.status_throttle_secs, 2);
        assert_eq!(cfg.slack.app_token_env, "HIVE_SLACK_APP_TOKEN");
    }

    #[test]
    fn instance_toml_round_trip() {
        let raw = r#"
            [[instances]]
            name = "alpha"
            bundle = "research"

            [instances.persona]
            display_name = "Alpha"
            emoji = ":owl:"

            [defaults]
            instance = "alpha"
        "#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.instances.len(), 1);
        assert_eq!(cfg.instances[0].bundle, "research");
        assert_eq!(cfg.instances[0].display_name(), "Alpha");
        assert!(cfg.instances[0].enabled);
        assert_eq!(cfg.default_instance(), Some("alpha"));
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "instances".into(),
            message: "at least one [[instances]] entry is required".into(),
        };
        assert_eq!(
            format!("{err}"),
            "[ERROR] instances: at least one [[instances]] entry is required"
        );
    }
}
