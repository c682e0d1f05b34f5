//! Sessions and the session registry.
//!
//! A session is the per-`(instance, conversation)` unit of context,
//! lock, and orchestrator state. The registry serializes work per
//! conversation (one tokio mutex per session, held across the whole
//! `execute`) while unrelated conversations run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use hive_domain::config::{Config, InstanceConfig};
use hive_domain::error::Result;
use hive_domain::tool::Message;
use hive_providers::LlmProvider;
use hive_sessions::{transcript, ConversationId, TranscriptWriter};
use hive_tools::{ExecTool, TodoListTool};
use parking_lot::Mutex;

use super::cancel::CancelToken;
use super::guard::ExecApprovalHook;
use super::hooks::{ApprovalChannel, DisplayChannel, HookCoordinator, HookEvent};
use super::inject::InjectQueue;
use super::orchestrator::Orchestrator;
use super::progress::ProgressSink;
use super::TranscriptSink;

/// Back-channels the caller supplies per execute: they close over the
/// live Slack channel/thread, so each execution re-installs fresh ones.
#[derive(Default, Clone)]
pub struct SessionBackChannels {
    pub display: Option<Arc<dyn DisplayChannel>>,
    pub approval: Option<Arc<dyn ApprovalChannel>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Session {
    pub instance: InstanceConfig,
    pub conversation: ConversationId,
    pub hooks: Arc<HookCoordinator>,
    /// Message context; mutated only while the mutex is held.
    context: tokio::sync::Mutex<Vec<Message>>,
    transcript: TranscriptSink,
    /// Notices queued by `notify` for the next execute (never the
    /// current one — that is what inject is for).
    pending_notices: Mutex<Vec<String>>,
}

impl Session {
    fn take_notices(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending_notices.lock())
    }

    pub fn push_notice(&self, text: impl Into<String>) {
        self.pending_notices.lock().push(text.into());
    }
}

fn build_system_prompt(instance: &InstanceConfig) -> String {
    format!(
        "You are {display}, an AI assistant instance named \"{name}\" working \
         inside a shared Slack workspace. Keep replies conversational and \
         Slack-sized; use the todo tool to plan multi-step work, and the \
         dispatch_worker tool for long-running jobs you should not block on. \
         Your working directory is shared with the user for file exchange.",
        display = instance.display_name(),
        name = instance.name,
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    transcripts: Arc<TranscriptWriter>,
    provider: Arc<dyn LlmProvider>,
    config: Arc<Config>,
}

impl SessionRegistry {
    pub fn new(config: Arc<Config>, provider: Arc<dyn LlmProvider>) -> Self {
        let transcripts = Arc::new(TranscriptWriter::new(&config.state.sessions_dir()));
        Self {
            sessions: Mutex::new(HashMap::new()),
            transcripts,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The process-wide provider (workers and delegates run one-shot
    /// calls against it).
    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        self.provider.clone()
    }

    fn key(instance: &str, conversation: &ConversationId) -> String {
        format!("{instance}|{conversation}")
    }

    /// Idempotent session lookup/creation.
    ///
    /// Creation replays the persisted transcript into the context,
    /// mounts the bundle tools, and installs the caller's display and
    /// approval back-channels. On an existing session only the
    /// back-channels are refreshed (they close over the caller's
    /// channel/thread).
    pub fn get_or_create(
        &self,
        instance_name: &str,
        conversation: &ConversationId,
        back: &SessionBackChannels,
    ) -> Result<Arc<Session>> {
        let instance = self
            .config
            .instance(instance_name)
            .cloned()
            .ok_or_else(|| {
                hive_domain::Error::Config(format!("unknown instance \"{instance_name}\""))
            })?;

        let key = Self::key(&instance.name, conversation);
        let session = {
            let mut sessions = self.sessions.lock();
            if let Some(existing) = sessions.get(&key) {
                existing.clone()
            } else {
                let session = self.create_session(instance, conversation)?;
                sessions.insert(key, session.clone());
                session
            }
        };

        if let Some(display) = &back.display {
            session.hooks.set_display(display.clone());
        }
        if let Some(approval) = &back.approval {
            session.hooks.set_approval(approval.clone());
        }

        Ok(session)
    }

    fn create_session(
        &self,
        instance: InstanceConfig,
        conversation: &ConversationId,
    ) -> Result<Arc<Session>> {
        let stem = conversation.file_stem(&instance.name);

        // Replay the durable record; a fresh session starts from its
        // system prompt.
        let lines = self.transcripts.read(&stem)?;
        let mut context = transcript::lines_to_messages(&lines);
        if context.is_empty() {
            context.push(Message::system(build_system_prompt(&instance)));
        } else {
            context.insert(0, Message::system(build_system_prompt(&instance)));
        }

        let working_dir = self.config.working_dir_for(&instance);

        let hooks = Arc::new(HookCoordinator::new());
        hooks.mount_tool(Arc::new(TodoListTool::new()));
        hooks.mount_tool(Arc::new(ExecTool::new(working_dir)));

        // Dangerous exec commands pause for a human click. Patterns were
        // validated at startup; a failure here means config validation
        // was bypassed, so surface it.
        let guard = ExecApprovalHook::new(
            Arc::downgrade(&hooks),
            &self.config.runtime.exec_approval_patterns,
            std::time::Duration::from_secs(self.config.runtime.approval_default_timeout_sec),
        )
        .map_err(|e| hive_domain::Error::Config(format!("exec approval patterns: {e}")))?;
        hooks.mount_hook(HookEvent::ToolPre, Arc::new(guard));

        tracing::info!(
            instance = %instance.name,
            conversation = %conversation,
            replayed = lines.len(),
            "session created"
        );

        Ok(Arc::new(Session {
            instance,
            conversation: conversation.clone(),
            hooks,
            context: tokio::sync::Mutex::new(context),
            transcript: TranscriptSink::new(self.transcripts.clone(), stem),
            pending_notices: Mutex::new(Vec::new()),
        }))
    }

    /// Run one execution on the session, holding its mutex for the whole
    /// call. All context mutations and provider calls happen under the
    /// lock; unrelated conversations proceed in parallel.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        instance_name: &str,
        conversation: &ConversationId,
        prompt: &str,
        progress: ProgressSink,
        inject: Arc<InjectQueue>,
        cancel: CancelToken,
        back: SessionBackChannels,
    ) -> Result<String> {
        let session = self.get_or_create(instance_name, conversation, &back)?;

        let mut context = session.context.lock().await;

        // Worker-completion reports queued by `notify` land ahead of the
        // new user prompt.
        let notices = session.take_notices();
        let effective_prompt = if notices.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{prompt}", notices.join("\n"))
        };

        let orchestrator = Orchestrator::new(
            self.provider.clone(),
            session.hooks.clone(),
            self.config.runtime.force_respond_tools.clone(),
            self.config.runtime.max_iterations,
        );

        orchestrator
            .run(
                &mut context,
                &session.transcript,
                &effective_prompt,
                &progress,
                &inject,
                &cancel,
            )
            .await
    }

    /// Queue a system-visible message for the *next* execute on the
    /// session. Distinct from inject: it must not hijack an ongoing run
    /// (in particular, it must not re-trigger injection point 2 after a
    /// force-respond response, which would keep the loop alive).
    pub fn notify(&self, instance_name: &str, conversation: &ConversationId, text: &str) {
        match self.get_or_create(instance_name, conversation, &SessionBackChannels::default()) {
            Ok(session) => {
                session.push_notice(text);
                tracing::debug!(
                    instance = %instance_name,
                    conversation = %conversation,
                    "notice queued for next execution"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "notify dropped: session unavailable");
            }
        }
    }

    /// Whether any session exists for this key (diagnostics).
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}
