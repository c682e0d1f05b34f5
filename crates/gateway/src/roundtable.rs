//! Roundtable executor.
//!
//! Unaddressed messages in `[mode:roundtable]` channels fan out to every
//! enabled instance in parallel. Each instance is told who else is at
//! the table and instructed to answer with the literal `[PASS]` when it
//! has nothing unique to add; passes and failures are dropped, the
//! survivors post sequentially with their personas, paced so Slack's
//! per-channel rate (1 post/s) keeps headroom.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hive_domain::config::InstanceConfig;
use hive_sessions::ConversationId;
use parking_lot::Mutex;

use crate::dispatch::active::{ActiveExecution, Steering};
use crate::dispatch::files;
use crate::dispatch::owners::ROUNDTABLE_OWNER;
use crate::dispatch::Dispatcher;
use crate::runtime::cancel::CancelToken;
use crate::runtime::inject::InjectQueue;
use crate::runtime::progress::null_sink;
use crate::runtime::session::SessionBackChannels;
use crate::slack::backchannel::{SlackApproval, SlackDisplay};
use crate::slack::events::{InboundEvent, MessageEvent};

/// Literal token an instance emits to bow out of a roundtable.
pub const PASS_TOKEN: &str = "[PASS]";

/// Case-insensitive prefix check on the trimmed text.
pub fn is_pass(text: &str) -> bool {
    text.trim_start().to_lowercase().starts_with("[pass]")
}

/// The preamble every participant sees ahead of the user's message.
pub fn roundtable_preamble(self_name: &str, others: &[String]) -> String {
    let others_label = if others.is_empty() {
        "no other instances".to_string()
    } else {
        others.join(", ")
    };
    format!(
        "[Roundtable mode: this message went to every instance in parallel. \
         You are {self_name}; the other participants are {others_label}. \
         Reply with the exact literal {PASS_TOKEN} if you have nothing \
         unique to add.]"
    )
}

/// Run a roundtable for one unaddressed message.
pub async fn run_roundtable(dispatcher: &Dispatcher, ev: MessageEvent, prompt: String) {
    let s = &dispatcher.state;
    let conversation = ConversationId::channel(&ev.channel, ev.thread_root());
    let conv_key = conversation.to_string();
    let thread_ts = ev.thread_root().to_string();

    let participants: Vec<_> = s
        .config
        .instances
        .iter()
        .filter(|i| i.enabled)
        .cloned()
        .collect();
    if participants.is_empty() {
        return;
    }

    // Shared files land once, in the default participant's working
    // directory (there is no single executing instance to own them),
    // and every participant sees the same preamble.
    let mut prompt = prompt;
    if !ev.files.is_empty() {
        let drop_target = participants
            .iter()
            .find(|i| Some(i.name.as_str()) == s.config.default_instance())
            .unwrap_or(&participants[0]);
        let dir = s.config.working_dir_for(drop_target);
        let preamble = files::ingest_files(
            &s.slack,
            &ev.files,
            &dir,
            &ev.user,
            s.config.slack.file_size_cap_bytes,
        )
        .await;
        prompt = if prompt.is_empty() {
            preamble
        } else {
            format!("{preamble}\n{prompt}")
        };
    }

    if let Err(e) = s
        .slack
        .add_reaction(&ev.channel, &ev.ts, "hourglass_flowing_sand")
        .await
    {
        tracing::debug!(error = %e, "roundtable reaction failed");
    }
    let status_ts = s
        .slack
        .post_text(
            &ev.channel,
            Some(&thread_ts),
            "⚙️ Roundtable — waiting for perspectives…",
        )
        .await
        .unwrap_or_default();

    // One compound active execution: messages arriving mid-roundtable
    // are held and replayed through classification afterwards.
    let pending: Arc<Mutex<Vec<MessageEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancelToken::new();
    s.active.register(
        &conv_key,
        Arc::new(ActiveExecution {
            steering: Steering::Replay(pending.clone()),
            cancel: cancel.clone(),
            status_channel: ev.channel.clone(),
            status_ts: status_ts.clone(),
            instance: None,
        }),
    );

    let all_names: Vec<String> = participants.iter().map(|i| i.name.clone()).collect();
    let futures: Vec<_> = participants
        .iter()
        .map(|instance| {
            let others: Vec<String> = all_names
                .iter()
                .filter(|n| **n != instance.name)
                .cloned()
                .collect();
            let wrapped = format!(
                "{}\n\n{prompt}",
                roundtable_preamble(&instance.name, &others)
            );
            let back = SessionBackChannels {
                display: Some(Arc::new(SlackDisplay::new(
                    s.slack.clone(),
                    ev.channel.clone(),
                    Some(thread_ts.clone()),
                ))),
                approval: Some(Arc::new(SlackApproval::new(
                    s.approvals.clone(),
                    ev.channel.clone(),
                    Some(thread_ts.clone()),
                    Duration::from_secs(s.config.runtime.approval_default_timeout_sec),
                ))),
            };
            let cancel = cancel.clone();
            let instance = instance.clone();
            let conversation = conversation.clone();
            async move {
                let result = s
                    .registry
                    .execute(
                        &instance.name,
                        &conversation,
                        &wrapped,
                        null_sink(),
                        Arc::new(InjectQueue::new()),
                        cancel,
                        back,
                    )
                    .await;
                (instance, result)
            }
        })
        .collect();

    let started = Instant::now();
    let results = futures_util::future::join_all(futures).await;

    // Roundtable ownership is sticky: later unaddressed messages fan out
    // again, while explicit addressing still wins in the routing table.
    s.owners.set(&conv_key, ROUNDTABLE_OWNER);

    // Collect survivors first: the onboarding suffix rides the last
    // persona post of the round.
    let survivors: Vec<(InstanceConfig, String)> = results
        .into_iter()
        .filter_map(|(instance, result)| match result {
            Ok(text) if !text.trim().is_empty() && !is_pass(&text) => Some((instance, text)),
            Ok(_) => {
                tracing::debug!(instance = %instance.name, "roundtable pass");
                None
            }
            Err(e) => {
                // Partial results are still useful.
                tracing::warn!(instance = %instance.name, error = %e, "roundtable execution failed");
                None
            }
        })
        .collect();

    let suffix = if survivors.is_empty() {
        None
    } else {
        s.onboarding
            .decorate(&ev.user, &conv_key, &prompt, started.elapsed())
            .await
    };

    let gap = Duration::from_millis(s.config.runtime.roundtable_post_gap_ms);
    let last = survivors.len().saturating_sub(1);
    for (i, (instance, text)) in survivors.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(gap).await;
        }
        let body = match &suffix {
            Some(sfx) if i == last => format!("{text}\n\n{sfx}"),
            _ => text,
        };
        if let Err(e) = s
            .slack
            .post_as_persona(
                &ev.channel,
                Some(&thread_ts),
                &body,
                instance.display_name(),
                &instance.persona.emoji,
            )
            .await
        {
            tracing::error!(instance = %instance.name, error = %e, "roundtable post failed");
        }
    }

    if !status_ts.is_empty() {
        if let Err(e) = s.slack.delete_message(&ev.channel, &status_ts).await {
            tracing::debug!(error = %e, "roundtable status delete failed");
        }
    }
    if let Err(e) = s
        .slack
        .remove_reaction(&ev.channel, &ev.ts, "hourglass_flowing_sand")
        .await
    {
        tracing::debug!(error = %e, "roundtable reaction removal failed");
    }
    s.active.remove(&conv_key);

    // Replay held messages through normal classification. Redelivery
    // protection keyed their original arrival, so release those keys
    // first or the replay gets swallowed as a duplicate.
    let held: Vec<MessageEvent> = std::mem::take(&mut *pending.lock());
    for queued in held {
        s.dedupe
            .forget(&format!("msg:{}:{}", queued.channel, queued.ts));
        Box::pin(dispatcher.handle_event(InboundEvent::Message(queued))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_detection_is_prefix_and_case_insensitive() {
        assert!(is_pass("[PASS]"));
        assert!(is_pass("[pass] nothing to add"));
        assert!(is_pass("  [Pass] — all covered"));
        assert!(!is_pass("I pass on this one"));
        assert!(!is_pass("thoughts: [PASS] was mentioned"));
        assert!(!is_pass(""));
    }

    #[test]
    fn preamble_names_the_table() {
        let p = roundtable_preamble("alpha", &["beta".into(), "gamma".into()]);
        assert!(p.contains("You are alpha"));
        assert!(p.contains("beta, gamma"));
        assert!(p.contains("[PASS]"));
    }

    #[test]
    fn preamble_handles_solo_table() {
        let p = roundtable_preamble("alpha", &[]);
        assert!(p.contains("no other instances"));
    }
}
