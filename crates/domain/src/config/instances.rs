use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named AI instance: bundle, working directory, persona.
///
/// Multiple instances coexist in one process; each gets independent
/// sessions keyed by `(instance, conversation)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Instance name. Doubles as the summon reaction name, so it must be
    /// a valid Slack emoji name (lowercase, digits, `_`, `-`).
    pub name: String,
    /// Bundle identifier: which packaged tool set to load at session creation.
    #[serde(default = "d_bundle")]
    pub bundle: String,
    /// Working directory for file shares and the exec tool.
    /// Defaults to `<state>/workspace/<name>`.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub persona: PersonaConfig,
    /// Whether this instance participates in roundtable fan-out.
    #[serde(default = "d_true")]
    pub enabled: bool,
}

/// Display name + emoji used when posting a final response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default)]
    pub display_name: String,
    /// Slack emoji shortcode, e.g. `":robot_face:"`.
    #[serde(default = "d_emoji")]
    pub emoji: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            emoji: d_emoji(),
        }
    }
}

impl InstanceConfig {
    /// The persona display name, falling back to the instance name.
    pub fn display_name(&self) -> &str {
        if self.persona.display_name.is_empty() {
            &self.name
        } else {
            &self.persona.display_name
        }
    }
}

fn d_bundle() -> String {
    "default".into()
}

fn d_emoji() -> String {
    ":robot_face:".into()
}

fn d_true() -> bool {
    true
}

/// Default-target selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Instance that receives unaddressed mentions when no channel
    /// directive applies. Empty = first configured instance.
    #[serde(default)]
    pub instance: String,
}
