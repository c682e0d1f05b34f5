pub mod admin;
pub mod config;
pub mod service;
pub mod setup;
pub mod slack_cmd;

use clap::{Parser, Subcommand};

/// hive — a Slack-hosted multi-instance AI assistant.
#[derive(Debug, Parser)]
#[command(name = "hive", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to Slack and serve (default when no subcommand is given).
    Serve,
    /// Write a starter config.toml and create the state directory layout.
    Setup {
        /// Overwrite an existing config.toml.
        #[arg(long)]
        force: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage the systemd service.
    #[command(subcommand)]
    Service(ServiceCommand),
    /// Slack utilities.
    #[command(subcommand)]
    Slack(SlackCommand),
    /// Admin utilities.
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum ServiceCommand {
    /// Write the systemd unit and reload the daemon.
    Install {
        /// Linux user to run the service as.
        #[arg(long, default_value = "hive")]
        user: String,
        /// Working directory for the service.
        #[arg(long)]
        working_dir: Option<String>,
        /// Path to the config file.
        #[arg(long, default_value = "config.toml")]
        config: String,
    },
    Start,
    Stop,
    Restart,
    Status,
    /// Follow the service journal.
    Logs,
    /// Stop, disable, and remove the unit.
    Uninstall,
}

#[derive(Debug, Subcommand)]
pub enum SlackCommand {
    /// Check both tokens against the Slack API.
    Status,
    /// Export a conversation transcript.
    Export {
        /// Instance name.
        instance: String,
        /// Conversation id (e.g. "C123:1700000000.000100" or "dm:U42").
        conversation: String,
        /// Emit markdown instead of JSON lines.
        #[arg(long)]
        markdown: bool,
    },
    /// Upload pending outbox files for an instance.
    Sync {
        /// Instance name.
        instance: String,
        /// Channel to receive the files.
        #[arg(long)]
        channel: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Set the admin dashboard password (stored as a SHA-256 hash).
    SetPassword,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `HIVE_CONFIG` (default
/// `config.toml`). Returns the parsed config and the path used. Shared
/// by every subcommand so the logic lives in one place.
pub fn load_config() -> anyhow::Result<(hive_domain::config::Config, String)> {
    let config_path = std::env::var("HIVE_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        hive_domain::config::Config::default()
    };

    Ok((config, config_path))
}
