//! `hive slack` subcommands: token check, transcript export, outbox sync.

use std::sync::Arc;

use hive_domain::config::Config;
use hive_sessions::{ConversationId, TranscriptWriter};

use crate::slack::client::SlackClient;

fn bot_client(config: &Config) -> anyhow::Result<Arc<SlackClient>> {
    let token = std::env::var(&config.slack.bot_token_env).map_err(|_| {
        anyhow::anyhow!(
            "{} is not set — export the bot token first",
            config.slack.bot_token_env
        )
    })?;
    Ok(Arc::new(SlackClient::new(token)?))
}

/// Check both tokens against the Slack API.
pub async fn status(config: &Config) -> anyhow::Result<()> {
    let slack = bot_client(config)?;
    match slack.auth_test().await {
        Ok(user_id) => println!("bot token: OK (user {user_id})"),
        Err(e) => anyhow::bail!("bot token check failed: {e}"),
    }

    match std::env::var(&config.slack.app_token_env) {
        Ok(token) if token.starts_with("xapp-") => {
            println!("app token: present ({})", config.slack.app_token_env)
        }
        Ok(_) => anyhow::bail!(
            "{} does not look like an app token (expected xapp-…)",
            config.slack.app_token_env
        ),
        Err(_) => anyhow::bail!("{} is not set", config.slack.app_token_env),
    }
    Ok(())
}

/// Print a conversation transcript as JSON lines or markdown.
pub fn export(
    config: &Config,
    instance: &str,
    conversation: &str,
    markdown: bool,
) -> anyhow::Result<()> {
    let conv = ConversationId::parse(conversation)
        .ok_or_else(|| anyhow::anyhow!("\"{conversation}\" is not a conversation id"))?;
    let writer = TranscriptWriter::new(&config.state.sessions_dir());
    let lines = writer.read(&conv.file_stem(instance))?;
    if lines.is_empty() {
        anyhow::bail!("no transcript for {instance} / {conversation}");
    }

    for line in &lines {
        if markdown {
            println!("**{}** ({}):", line.role, line.timestamp);
            println!("{}", line.content);
            println!();
        } else {
            println!("{}", serde_json::to_string(line)?);
        }
    }
    Ok(())
}

/// Upload everything in an instance's outbox to a channel.
pub async fn sync(config: &Config, instance: &str, channel: &str) -> anyhow::Result<()> {
    let inst = config
        .instance(instance)
        .ok_or_else(|| anyhow::anyhow!("unknown instance \"{instance}\""))?;
    let slack = bot_client(config)?;
    let outbox = config.working_dir_for(inst).join(".outbox");
    if !outbox.exists() {
        println!("outbox empty ({})", outbox.display());
        return Ok(());
    }

    let mut uploaded = 0usize;
    for entry in std::fs::read_dir(&outbox)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        slack
            .upload_file(channel, None, &path)
            .await
            .map_err(|e| anyhow::anyhow!("uploading {}: {e}", path.display()))?;
        std::fs::remove_file(&path)?;
        uploaded += 1;
        println!("uploaded {}", path.display());
    }
    println!("{uploaded} file(s) uploaded");
    Ok(())
}
