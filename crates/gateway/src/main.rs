use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hive_domain::config::{Config, ConfigSeverity};
use hive_gateway::cli::{AdminCommand, Cli, Command, ConfigCommand, ServiceCommand, SlackCommand};
use hive_gateway::dispatch::active::ActiveExecutions;
use hive_gateway::dispatch::owners::ThreadOwnerMap;
use hive_gateway::dispatch::{ChannelInfoCache, DedupeStore, Dispatcher, RecentResponses};
use hive_gateway::onboarding::OnboardingNudger;
use hive_gateway::runtime::approval::ApprovalBroker;
use hive_gateway::runtime::session::SessionRegistry;
use hive_gateway::slack::client::SlackClient;
use hive_gateway::slack::socket::run_socket_mode;
use hive_gateway::state::AppState;
use hive_providers::ProviderRegistry;
use hive_sessions::OnboardingStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = hive_gateway::cli::load_config()?;
            serve(Arc::new(config)).await
        }
        Some(Command::Setup { force }) => {
            let config_path =
                std::env::var("HIVE_CONFIG").unwrap_or_else(|_| "config.toml".into());
            hive_gateway::cli::setup::run(&config_path, force)
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = hive_gateway::cli::load_config()?;
            if !hive_gateway::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _) = hive_gateway::cli::load_config()?;
            hive_gateway::cli::config::show(&config);
            Ok(())
        }
        Some(Command::Service(cmd)) => match cmd {
            ServiceCommand::Install {
                user,
                working_dir,
                config,
            } => hive_gateway::cli::service::install(&user, working_dir.as_deref(), &config),
            ServiceCommand::Start => hive_gateway::cli::service::systemctl(&["start", "hive.service"]),
            ServiceCommand::Stop => hive_gateway::cli::service::systemctl(&["stop", "hive.service"]),
            ServiceCommand::Restart => {
                hive_gateway::cli::service::systemctl(&["restart", "hive.service"])
            }
            ServiceCommand::Status => {
                hive_gateway::cli::service::systemctl(&["status", "hive.service"])
            }
            ServiceCommand::Logs => hive_gateway::cli::service::logs(),
            ServiceCommand::Uninstall => hive_gateway::cli::service::uninstall(),
        },
        Some(Command::Slack(cmd)) => {
            let (config, _) = hive_gateway::cli::load_config()?;
            match cmd {
                SlackCommand::Status => hive_gateway::cli::slack_cmd::status(&config).await,
                SlackCommand::Export {
                    instance,
                    conversation,
                    markdown,
                } => hive_gateway::cli::slack_cmd::export(&config, &instance, &conversation, markdown),
                SlackCommand::Sync { instance, channel } => {
                    hive_gateway::cli::slack_cmd::sync(&config, &instance, &channel).await
                }
            }
        }
        Some(Command::Admin(AdminCommand::SetPassword)) => {
            let (config, _) = hive_gateway::cli::load_config()?;
            hive_gateway::cli::admin::set_password(&config)
        }
        Some(Command::Version) => {
            println!("hive {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured tracing (only for the serve path).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hive_gateway=debug")),
        )
        .init();
}

/// Bring the whole gateway up and run the Socket Mode loop.
async fn serve(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("hive starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Slack tokens ─────────────────────────────────────────────────
    let bot_token = std::env::var(&config.slack.bot_token_env).with_context(|| {
        format!(
            "{} is not set — run `hive setup` for instructions",
            config.slack.bot_token_env
        )
    })?;
    let app_token = std::env::var(&config.slack.app_token_env).with_context(|| {
        format!(
            "{} is not set — run `hive setup` for instructions",
            config.slack.app_token_env
        )
    })?;

    let slack = Arc::new(SlackClient::new(bot_token).context("building Slack client")?);
    let bot_user_id = slack
        .auth_test()
        .await
        .context("Slack auth check failed — is the bot token valid?")?;
    tracing::info!(bot_user_id = %bot_user_id, "Slack Web API ready");

    // ── LLM provider (explicit config > credential detection) ────────
    let providers =
        ProviderRegistry::detect(&config.llm).context("selecting an LLM provider")?;
    let provider = providers.primary();
    tracing::info!(provider = provider.provider_id(), "LLM provider ready");

    // ── State directory layout ───────────────────────────────────────
    std::fs::create_dir_all(config.state.sessions_dir())
        .context("creating sessions directory")?;
    std::fs::create_dir_all(config.state.users_dir()).context("creating users directory")?;
    for instance in &config.instances {
        std::fs::create_dir_all(config.state.outbox_dir(&instance.name))
            .with_context(|| format!("creating workspace for {}", instance.name))?;
    }
    tracing::info!(path = %config.state.path.display(), "state layout ready");

    // ── Core components ──────────────────────────────────────────────
    let registry = Arc::new(SessionRegistry::new(config.clone(), provider));
    let owners = Arc::new(ThreadOwnerMap::new(config.runtime.thread_owner_capacity));
    let active = Arc::new(ActiveExecutions::new());
    let dedupe = Arc::new(DedupeStore::new(Duration::from_secs(86_400)));
    let channels = Arc::new(ChannelInfoCache::new(slack.clone(), Duration::from_secs(60)));
    let recent = Arc::new(RecentResponses::new(1_000));
    let approvals = Arc::new(ApprovalBroker::new(slack.clone()));
    let onboarding = Arc::new(OnboardingNudger::new(
        Arc::new(OnboardingStore::new(&config.state.users_dir())),
        slack.clone(),
    ));
    tracing::info!(
        instances = config.instances.len(),
        thread_owner_capacity = config.runtime.thread_owner_capacity,
        "dispatcher state ready"
    );

    let state = AppState {
        config: config.clone(),
        slack,
        registry,
        owners,
        active: active.clone(),
        dedupe,
        channels,
        recent,
        bot_user_id,
        approvals,
        onboarding,
    };
    let dispatcher = Dispatcher::new(state);

    // ── Socket Mode loop, until ctrl-c ───────────────────────────────
    let socket = tokio::spawn(run_socket_mode(app_token, dispatcher));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down — waiting for background workers");
    socket.abort();
    active.shutdown().await;
    tracing::info!("bye");

    Ok(())
}
