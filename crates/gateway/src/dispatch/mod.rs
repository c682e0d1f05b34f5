//! Event dispatcher.
//!
//! Consumes the normalized Slack event stream, classifies each event
//! (new execution, injection, summon, regenerate, cancel, roundtable),
//! and routes it to the session registry. Classification never blocks
//! the transport: injections complete in microseconds and fresh
//! executions run on their own task (the Socket Mode loop spawns us).

pub mod active;
pub mod files;
pub mod owners;
pub mod prefix;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hive_domain::config::InstanceConfig;
use hive_domain::error::Error;
use hive_sessions::ConversationId;
use lru::LruCache;
use parking_lot::Mutex;

use crate::roundtable;
use crate::runtime::cancel::CancelToken;
use crate::runtime::inject::InjectQueue;
use crate::runtime::progress::StatusRenderer;
use crate::runtime::session::SessionBackChannels;
use crate::slack::backchannel::{SlackApproval, SlackDisplay};
use crate::slack::client::ChannelInfo;
use crate::slack::events::{
    parse_topic_directives, InboundEvent, MessageEvent, ReactionEvent, TopicDirectives,
};
use crate::state::AppState;
use crate::workers::{DelegateTool, DispatchWorkerTool};

use active::{ActiveExecution, Steering};
use owners::ROUNDTABLE_OWNER;
use prefix::{find_instance_mention, parse_instance_prefix};

const REGENERATE_REACTION: &str = "arrows_counterclockwise";
const CANCEL_REACTION: &str = "x";
const BUSY_REACTION: &str = "incoming_envelope";
const WORKING_REACTION: &str = "hourglass_flowing_sand";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dedupe store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory idempotency store. Slack redelivers events on slow acks and
/// reconnects; every classified event carries a stable key checked here.
pub struct DedupeStore {
    seen: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl DedupeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns `true` if this key was already seen (duplicate).
    pub fn check_and_insert(&self, key: &str) -> bool {
        let mut map = self.seen.lock();
        let now = Instant::now();

        // Lazy cleanup when the map grows large.
        if map.len() > 10_000 {
            map.retain(|_, ts| now.duration_since(*ts) < self.ttl);
        }

        if let Some(ts) = map.get(key) {
            if now.duration_since(*ts) < self.ttl {
                return true;
            }
        }

        map.insert(key.to_string(), now);
        false
    }

    /// Release a key so the same event can be processed again
    /// (roundtable replay).
    pub fn forget(&self, key: &str) {
        self.seen.lock().remove(key);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel info cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Short-TTL cache over `conversations.info`; topic directives are read
/// on every channel message, the API only occasionally.
pub struct ChannelInfoCache {
    slack: Arc<crate::slack::client::SlackClient>,
    inner: Mutex<HashMap<String, (ChannelInfo, Instant)>>,
    ttl: Duration,
}

impl ChannelInfoCache {
    pub fn new(slack: Arc<crate::slack::client::SlackClient>, ttl: Duration) -> Self {
        Self {
            slack,
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, channel: &str) -> ChannelInfo {
        if let Some((info, at)) = self.inner.lock().get(channel) {
            if at.elapsed() < self.ttl {
                return info.clone();
            }
        }
        match self.slack.channel_info(channel).await {
            Ok(info) => {
                self.inner
                    .lock()
                    .insert(channel.to_string(), (info.clone(), Instant::now()));
                info
            }
            Err(e) => {
                tracing::warn!(channel, error = %e, "channel info lookup failed");
                ChannelInfo::default()
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Recent responses (regenerate lookup)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct RegenRecord {
    pub instance: String,
    pub conversation: String,
    pub prompt: String,
    pub channel: String,
    pub thread_ts: Option<String>,
}

/// Bounded map from bot-response timestamp to the prompt that produced
/// it, so a `:arrows_counterclockwise:` reaction can re-execute it.
pub struct RecentResponses {
    inner: Mutex<LruCache<String, RegenRecord>>,
}

impl RecentResponses {
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).expect("non-zero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn remember(&self, response_ts: &str, record: RegenRecord) {
        self.inner.lock().put(response_ts.to_string(), record);
    }

    pub fn get(&self, response_ts: &str) -> Option<RegenRecord> {
        self.inner.lock().get(response_ts).cloned()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatcher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Dispatcher {
    pub state: AppState,
}

/// The preamble a summoned instance sees ahead of the reacted message.
fn summon_prompt(user: &str, instance: &str, channel: &str, text: &str) -> String {
    format!(
        "[<@{user}> summoned you by reacting with :{instance}: to this message in #{channel}]\n{text}"
    )
}

/// Routing decision for a message event.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Roundtable,
    Instance { name: String, explicit: bool },
    Ignore,
}

/// Pure classification over the routing table (first match wins):
/// roundtable topic (unaddressed) → forced `[instance:]` topic →
/// explicit prefix/@-mention → thread owner → `[default:]` topic →
/// mention/DM with the global default → ignore.
fn classify(
    ev: &MessageEvent,
    directives: &TopicDirectives,
    explicit: Option<&str>,
    thread_owner: Option<&str>,
    global_default: Option<&str>,
) -> Route {
    if !ev.is_dm && directives.roundtable && explicit.is_none() {
        return Route::Roundtable;
    }
    if let Some(forced) = &directives.forced {
        return Route::Instance {
            name: forced.clone(),
            explicit: false,
        };
    }
    if let Some(name) = explicit {
        return Route::Instance {
            name: name.to_string(),
            explicit: true,
        };
    }
    if let Some(owner) = thread_owner {
        if owner != ROUNDTABLE_OWNER {
            return Route::Instance {
                name: owner.to_string(),
                explicit: false,
            };
        }
    }
    if let Some(default) = &directives.default {
        return Route::Instance {
            name: default.clone(),
            explicit: false,
        };
    }
    if ev.is_mention || ev.is_dm {
        if let Some(default) = global_default {
            return Route::Instance {
                name: default.to_string(),
                explicit: false,
            };
        }
    }
    Route::Ignore
}

impl Dispatcher {
    pub fn new(state: AppState) -> Arc<Self> {
        Arc::new(Self { state })
    }

    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Message(ev) => self.handle_message(ev).await,
            InboundEvent::ReactionAdded(ev) => self.handle_reaction(ev).await,
            InboundEvent::BlockAction { action_id, user } => {
                if !self.state.approvals.handle_action(&action_id) {
                    tracing::debug!(action_id, user, "stale or unknown block action");
                }
            }
        }
    }

    // ── Reactions: cancel, regenerate, summon ──────────────────────

    async fn handle_reaction(&self, ev: ReactionEvent) {
        let s = &self.state;

        // Cancel: :x: on the current status message.
        if ev.reaction == CANCEL_REACTION {
            if let Some(exec) = s.active.find_by_status_ts(&ev.channel, &ev.message_ts) {
                tracing::info!(channel = %ev.channel, user = %ev.user, "execution cancelled by reaction");
                exec.cancel.cancel();
                return;
            }
        }

        // Regenerate: :arrows_counterclockwise: on a known bot response.
        if ev.reaction == REGENERATE_REACTION {
            if let Some(record) = s.recent.get(&ev.message_ts) {
                if s.active.get(&record.conversation).is_some() {
                    tracing::debug!(
                        conversation = %record.conversation,
                        "regenerate ignored: conversation is busy"
                    );
                    return;
                }
                let Some(conversation) = ConversationId::parse(&record.conversation) else {
                    return;
                };
                let Some(instance) = s.config.instance(&record.instance).cloned() else {
                    return;
                };
                tracing::info!(
                    instance = %record.instance,
                    conversation = %record.conversation,
                    "regenerating response"
                );
                self.run_execution(
                    instance,
                    conversation,
                    record.prompt.clone(),
                    record.channel.clone(),
                    record.thread_ts.clone(),
                    ev.user.clone(),
                    ev.message_ts.clone(),
                )
                .await;
                return;
            }
        }

        // Summon: reaction name matching an instance name.
        if let Some(instance) = s.config.instance(&ev.reaction).cloned() {
            let dedup_key = format!("summon:{}:{}", instance.name, ev.message_ts);
            if s.dedupe.check_and_insert(&dedup_key) {
                return;
            }
            let message = match s.slack.fetch_message(&ev.channel, &ev.message_ts).await {
                Ok(Some(m)) => m,
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "summoned-message fetch failed");
                    return;
                }
            };

            let channel_label = {
                let info = s.channels.get(&ev.channel).await;
                if info.name.is_empty() {
                    ev.channel.clone()
                } else {
                    info.name
                }
            };
            let prompt = summon_prompt(&ev.user, &instance.name, &channel_label, &message.text);

            let conversation = ConversationId::summon(&instance.name, &ev.message_ts);
            let thread = message
                .thread_ts
                .clone()
                .unwrap_or_else(|| ev.message_ts.clone());
            self.run_execution(
                instance,
                conversation,
                prompt,
                ev.channel.clone(),
                Some(thread),
                ev.user.clone(),
                ev.message_ts.clone(),
            )
            .await;
        }
    }

    // ── Messages ───────────────────────────────────────────────────

    async fn handle_message(&self, ev: MessageEvent) {
        let s = &self.state;

        if ev.user.is_empty() || ev.user == s.bot_user_id {
            return;
        }
        // app_mention and message both deliver for the same text; one
        // dedup key covers that and transport redelivery.
        if s.dedupe
            .check_and_insert(&format!("msg:{}:{}", ev.channel, ev.ts))
        {
            return;
        }

        // First-sight welcome runs alongside routing.
        {
            let onboarding = s.onboarding.clone();
            let user = ev.user.clone();
            tokio::spawn(async move { onboarding.welcome_if_new(&user).await });
        }

        // A channel mention is delivered twice (`message` + `app_mention`)
        // and dedup keeps whichever lands first, so mention detection
        // cannot rely on the app_mention delivery alone.
        let bot_tag = format!("<@{}>", s.bot_user_id);
        let is_mention = ev.is_mention || ev.text.contains(&bot_tag);
        let text = ev.text.replace(&bot_tag, " ").trim().to_string();
        let ev = MessageEvent {
            text,
            is_mention,
            ..ev
        };

        let known = s.config.instance_names();
        let (prefix_inst, remaining, was_explicit) = parse_instance_prefix(&ev.text, &known);
        let (explicit_inst, remaining) = if was_explicit {
            (prefix_inst, remaining.to_string())
        } else if let Some(mentioned) = find_instance_mention(&ev.text, &known) {
            (Some(mentioned), ev.text.trim().to_string())
        } else {
            (None, remaining.to_string())
        };

        let conversation = if ev.is_dm {
            ConversationId::dm(&ev.user)
        } else {
            ConversationId::channel(&ev.channel, ev.thread_root())
        };
        let conv_key = conversation.to_string();

        // A busy conversation absorbs the message instead of starting a
        // second execution.
        if let Some(exec) = s.active.get(&conv_key) {
            let mut prompt = remaining.clone();
            if !ev.files.is_empty() {
                if let Some(inst_name) = exec.instance.as_deref() {
                    if let Some(instance) = s.config.instance(inst_name) {
                        let dir = s.config.working_dir_for(instance);
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
                }
            }
            if prompt.trim().is_empty() {
                return;
            }
            match &exec.steering {
                Steering::Inject(queue) => queue.push(prompt),
                Steering::Replay(pending) => pending.lock().push(ev.clone()),
            }
            if let Err(e) = s.slack.add_reaction(&ev.channel, &ev.ts, BUSY_REACTION).await {
                tracing::debug!(error = %e, "busy reaction failed");
            }
            return;
        }

        let directives = if ev.is_dm {
            TopicDirectives::default()
        } else {
            parse_topic_directives(&s.channels.get(&ev.channel).await.topic)
        };

        let route = classify(
            &ev,
            &directives,
            explicit_inst.as_deref(),
            s.owners.get(&conv_key).as_deref(),
            s.config.default_instance(),
        );

        match route {
            Route::Roundtable => {
                roundtable::run_roundtable(self, ev, remaining).await;
            }
            Route::Instance { name, explicit } => {
                // Misrouted: this process may not host the addressed
                // instance — another one might. Silent drop.
                let Some(instance) = s.config.instance(&name).cloned() else {
                    tracing::debug!(instance = %name, "message for unhosted instance, dropping");
                    return;
                };

                if explicit {
                    s.owners.set(&conv_key, &instance.name);
                }

                let mut prompt = remaining;
                if !ev.files.is_empty() {
                    let dir = s.config.working_dir_for(&instance);
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
                if prompt.trim().is_empty() {
                    return;
                }

                let thread_ts = if ev.is_dm {
                    None
                } else {
                    Some(ev.thread_root().to_string())
                };
                self.run_execution(
                    instance,
                    conversation,
                    prompt,
                    ev.channel.clone(),
                    thread_ts,
                    ev.user.clone(),
                    ev.ts.clone(),
                )
                .await;
            }
            Route::Ignore => {}
        }
    }

    // ── Execution lifecycle ────────────────────────────────────────

    /// Drive one execution end to end: reactions, status message,
    /// registration, the agent loop, the persona response, and cleanup.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_execution(
        &self,
        instance: InstanceConfig,
        conversation: ConversationId,
        prompt: String,
        channel: String,
        thread_ts: Option<String>,
        user: String,
        anchor_ts: String,
    ) {
        let s = &self.state;
        let conv_key = conversation.to_string();

        if let Err(e) = s
            .slack
            .add_reaction(&channel, &anchor_ts, WORKING_REACTION)
            .await
        {
            tracing::debug!(error = %e, "working reaction failed");
        }

        // Status message under the bot's own identity: persona posts are
        // not editable, bot posts are — that is the whole reason for the
        // two-post pattern.
        let status_ts = match s
            .slack
            .post_text(&channel, thread_ts.as_deref(), "⚙️ Working…")
            .await
        {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(error = %e, "status post failed");
                String::new()
            }
        };

        let inject = Arc::new(InjectQueue::new());
        let cancel = CancelToken::new();
        let renderer = StatusRenderer::new(
            s.slack.clone(),
            channel.clone(),
            status_ts.clone(),
            instance.display_name().to_string(),
            inject.clone(),
            Duration::from_secs(s.config.runtime.status_throttle_secs),
        );

        s.active.register(
            &conv_key,
            Arc::new(ActiveExecution {
                steering: Steering::Inject(inject.clone()),
                cancel: cancel.clone(),
                status_channel: channel.clone(),
                status_ts: status_ts.clone(),
                instance: Some(instance.name.clone()),
            }),
        );

        let back = SessionBackChannels {
            display: Some(Arc::new(SlackDisplay::new(
                s.slack.clone(),
                channel.clone(),
                thread_ts.clone(),
            ))),
            approval: Some(Arc::new(SlackApproval::new(
                s.approvals.clone(),
                channel.clone(),
                thread_ts.clone(),
                Duration::from_secs(s.config.runtime.approval_default_timeout_sec),
            ))),
        };

        // Gateway tools close over this conversation; mount them after
        // session creation (visible to this and every later execute).
        if let Ok(session) = s.registry.get_or_create(&instance.name, &conversation, &back) {
            if session.hooks.tools().get("dispatch_worker").is_none() {
                session.hooks.mount_tool(Arc::new(DispatchWorkerTool::new(
                    s.registry.clone(),
                    s.active.clone(),
                    instance.name.clone(),
                    conversation.clone(),
                )));
                session
                    .hooks
                    .mount_tool(Arc::new(DelegateTool::new(s.registry.provider())));
            }
        }

        let started = Instant::now();
        let result = s
            .registry
            .execute(
                &instance.name,
                &conversation,
                &prompt,
                renderer.sink(),
                inject,
                cancel,
                back,
            )
            .await;

        if !status_ts.is_empty() {
            if let Err(e) = s.slack.delete_message(&channel, &status_ts).await {
                tracing::debug!(error = %e, "status delete failed");
            }
        }

        match result {
            Ok(text) if !text.trim().is_empty() => {
                let suffix = s
                    .onboarding
                    .decorate(&user, &conv_key, &prompt, started.elapsed())
                    .await;
                let final_text = match suffix {
                    Some(sfx) => format!("{text}\n\n{sfx}"),
                    None => text,
                };
                match s
                    .slack
                    .post_as_persona(
                        &channel,
                        thread_ts.as_deref(),
                        &final_text,
                        instance.display_name(),
                        &instance.persona.emoji,
                    )
                    .await
                {
                    Ok(response_ts) => {
                        s.recent.remember(
                            &response_ts,
                            RegenRecord {
                                instance: instance.name.clone(),
                                conversation: conv_key.clone(),
                                prompt: prompt.clone(),
                                channel: channel.clone(),
                                thread_ts: thread_ts.clone(),
                            },
                        );
                        // First response in a thread claims ownership
                        // (explicit addressing already claimed it above).
                        if matches!(conversation, ConversationId::Channel { .. })
                            && s.owners.get(&conv_key).is_none()
                        {
                            s.owners.set(&conv_key, &instance.name);
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "final response post failed");
                    }
                }
            }
            Ok(_) => {
                // Cancelled with nothing worth posting.
            }
            Err(e) => {
                let friendly = match e {
                    Error::NoProviderConfigured => {
                        "I'm not fully set up yet — no AI provider is configured. \
                         Ask whoever runs me to add an API key."
                    }
                    _ => "Something went wrong on my end — mind trying that again?",
                };
                tracing::error!(error = %e, conversation = %conv_key, "execution failed");
                if let Err(post_err) = s
                    .slack
                    .post_text(&channel, thread_ts.as_deref(), friendly)
                    .await
                {
                    tracing::warn!(error = %post_err, "failure notice post failed");
                }
            }
        }

        if let Err(e) = s
            .slack
            .remove_reaction(&channel, &anchor_ts, WORKING_REACTION)
            .await
        {
            tracing::debug!(error = %e, "working reaction removal failed");
        }
        s.active.remove(&conv_key);

        // Anything a tool left in the outbox goes to the thread.
        let outbox = s.config.working_dir_for(&instance).join(".outbox");
        files::sweep_outbox(&s.slack, &outbox, &channel, thread_ts.as_deref()).await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str, is_dm: bool, is_mention: bool) -> MessageEvent {
        MessageEvent {
            channel: "C1".into(),
            user: "U1".into(),
            text: text.into(),
            ts: "1.0".into(),
            thread_ts: None,
            is_dm,
            is_mention,
            files: Vec::new(),
        }
    }

    #[test]
    fn roundtable_topic_beats_forced_for_unaddressed() {
        let ev = msg("thanks!", false, false);
        let directives = TopicDirectives {
            forced: Some("alpha".into()),
            default: None,
            roundtable: true,
        };
        assert_eq!(
            classify(&ev, &directives, None, None, Some("alpha")),
            Route::Roundtable
        );
    }

    #[test]
    fn explicit_prefix_beats_roundtable() {
        let ev = msg("beta: take this", false, false);
        let directives = TopicDirectives {
            forced: None,
            default: None,
            roundtable: true,
        };
        assert_eq!(
            classify(&ev, &directives, Some("beta"), None, Some("alpha")),
            Route::Instance {
                name: "beta".into(),
                explicit: true
            }
        );
    }

    #[test]
    fn forced_topic_overrides_prefix() {
        let ev = msg("beta: hello", false, false);
        let directives = TopicDirectives {
            forced: Some("alpha".into()),
            default: None,
            roundtable: false,
        };
        assert_eq!(
            classify(&ev, &directives, Some("beta"), None, None),
            Route::Instance {
                name: "alpha".into(),
                explicit: false
            }
        );
    }

    #[test]
    fn thread_owner_routes_followups() {
        let ev = msg("and then?", false, false);
        assert_eq!(
            classify(&ev, &TopicDirectives::default(), None, Some("beta"), Some("alpha")),
            Route::Instance {
                name: "beta".into(),
                explicit: false
            }
        );
    }

    #[test]
    fn roundtable_owner_does_not_claim_followups() {
        // Sticky roundtable: _ROUNDTABLE ownership never routes to a
        // single instance; without the topic directive the message
        // falls through to defaults.
        let ev = msg("more thoughts?", false, false);
        let route = classify(
            &ev,
            &TopicDirectives {
                default: Some("alpha".into()),
                ..TopicDirectives::default()
            },
            None,
            Some(ROUNDTABLE_OWNER),
            None,
        );
        assert_eq!(
            route,
            Route::Instance {
                name: "alpha".into(),
                explicit: false
            }
        );
    }

    #[test]
    fn default_topic_catches_unaddressed() {
        let ev = msg("hello", false, false);
        let directives = TopicDirectives {
            default: Some("beta".into()),
            ..TopicDirectives::default()
        };
        assert_eq!(
            classify(&ev, &directives, None, None, Some("alpha")),
            Route::Instance {
                name: "beta".into(),
                explicit: false
            }
        );
    }

    #[test]
    fn plain_channel_chatter_is_ignored() {
        let ev = msg("just chatting", false, false);
        assert_eq!(
            classify(&ev, &TopicDirectives::default(), None, None, Some("alpha")),
            Route::Ignore
        );
    }

    #[test]
    fn mention_and_dm_use_global_default() {
        let mention = msg("help me", false, true);
        assert_eq!(
            classify(&mention, &TopicDirectives::default(), None, None, Some("alpha")),
            Route::Instance {
                name: "alpha".into(),
                explicit: false
            }
        );

        let dm = msg("help me", true, false);
        assert_eq!(
            classify(&dm, &TopicDirectives::default(), None, None, Some("alpha")),
            Route::Instance {
                name: "alpha".into(),
                explicit: false
            }
        );
    }

    #[test]
    fn summon_prompt_literal_shape() {
        let prompt = summon_prompt("U7", "beta", "chan", "Use Redis here");
        assert_eq!(
            prompt,
            "[<@U7> summoned you by reacting with :beta: to this message in #chan]\nUse Redis here"
        );
    }

    #[test]
    fn dedupe_store_rejects_duplicates() {
        let store = DedupeStore::new(Duration::from_secs(60));
        assert!(!store.check_and_insert("evt1"));
        assert!(store.check_and_insert("evt1"));
        assert!(!store.check_and_insert("evt2"));
    }

    #[test]
    fn recent_responses_round_trip() {
        let recent = RecentResponses::new(10);
        recent.remember(
            "9.0",
            RegenRecord {
                instance: "alpha".into(),
                conversation: "C1:1.0".into(),
                prompt: "hi".into(),
                channel: "C1".into(),
                thread_ts: Some("1.0".into()),
            },
        );
        let rec = recent.get("9.0").unwrap();
        assert_eq!(rec.instance, "alpha");
        assert!(recent.get("8.0").is_none());
    }
}
