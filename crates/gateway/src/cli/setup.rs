//! `hive setup` — write a starter config and the state layout.

use std::path::Path;

use hive_domain::config::Config;

const STARTER_CONFIG: &str = r#"# hive configuration.
# Slack tokens are read from the environment:
#   HIVE_SLACK_APP_TOKEN  (xapp-..., Socket Mode)
#   HIVE_SLACK_BOT_TOKEN  (xoxb-..., Web API)
# LLM credentials are detected from ANTHROPIC_API_KEY, OPENAI_API_KEY,
# or GEMINI_API_KEY unless [[llm.providers]] is set explicitly.

[[instances]]
name = "alpha"
bundle = "default"

[instances.persona]
display_name = "Alpha"
emoji = ":robot_face:"

[defaults]
instance = "alpha"

[state]
path = "./data"
"#;

pub fn run(config_path: &str, force: bool) -> anyhow::Result<()> {
    if Path::new(config_path).exists() && !force {
        anyhow::bail!("{config_path} already exists (use --force to overwrite)");
    }

    std::fs::write(config_path, STARTER_CONFIG)?;
    println!("wrote {config_path}");

    let config: Config = toml::from_str(STARTER_CONFIG)?;
    std::fs::create_dir_all(config.state.sessions_dir())?;
    std::fs::create_dir_all(config.state.users_dir())?;
    for instance in &config.instances {
        std::fs::create_dir_all(config.state.outbox_dir(&instance.name))?;
    }
    println!("created state layout under {}", config.state.path.display());
    println!();
    println!("next steps:");
    println!("  1. export HIVE_SLACK_APP_TOKEN=xapp-...");
    println!("  2. export HIVE_SLACK_BOT_TOKEN=xoxb-...");
    println!("  3. export ANTHROPIC_API_KEY=... (or OPENAI_API_KEY / GEMINI_API_KEY)");
    println!("  4. hive serve");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_parses_and_validates() {
        let config: Config = toml::from_str(STARTER_CONFIG).unwrap();
        assert_eq!(config.instances.len(), 1);
        assert_eq!(config.default_instance(), Some("alpha"));
        let errors: Vec<_> = config
            .validate()
            .into_iter()
            .filter(|i| i.severity == hive_domain::config::ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "starter config must validate: {errors:?}");
    }

    #[test]
    fn setup_refuses_to_overwrite_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# existing").unwrap();

        let result = run(path.to_str().unwrap(), false);
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# existing");
    }
}
