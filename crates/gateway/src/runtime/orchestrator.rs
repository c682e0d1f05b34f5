//! The agent loop.
//!
//! Drives an LLM-tool conversation to a terminal text response while
//! permitting mid-flight user steering. Three injection drain points
//! keep late-arriving user messages from racing the loop:
//!
//! 1. top of each iteration (between-turn arrivals),
//! 2. after a tool-free response (prevents a premature terminal answer
//!    when the user has just spoken),
//! 3. after tool results (arrivals during tool execution).
//!
//! Force-respond: when a configured tool ran in the completed batch, the
//! next provider request carries no tools at all, so the model must
//! address the user; the flag is one-shot.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use hive_domain::error::{Error, Result};
use hive_domain::stream::StreamEvent;
use hive_domain::tool::{Message, ToolCall};
use hive_providers::{retry_with_backoff, ChatRequest, LlmProvider};

use super::cancel::CancelToken;
use super::hooks::{HookAction, HookCoordinator, HookEvent};
use super::inject::InjectQueue;
use super::progress::{
    extract_agent, extract_todos, CompletionStatus, ProgressEvent, ProgressSink,
};
use super::{args_digest, TranscriptSink};

const PROVIDER_ATTEMPTS: u32 = 3;
const PROVIDER_BACKOFF: Duration = Duration::from_millis(500);

pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    hooks: Arc<HookCoordinator>,
    force_respond_tools: HashSet<String>,
    max_iterations: u32,
}

struct ToolOutcome {
    content: String,
    is_error: bool,
    duration_ms: u64,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        hooks: Arc<HookCoordinator>,
        force_respond_tools: impl IntoIterator<Item = String>,
        max_iterations: u32,
    ) -> Self {
        Self {
            provider,
            hooks,
            force_respond_tools: force_respond_tools.into_iter().collect(),
            max_iterations,
        }
    }

    /// Run the loop to a terminal response.
    ///
    /// `context` is mutated under the session mutex held by the caller.
    /// Returns the final text; on cancellation or iteration-cap
    /// exhaustion, the best-effort accumulated text.
    ///
    /// The injection queue is owned by this execution: it is published as
    /// the `orchestrator.inject` capability for its duration so tools and
    /// the dispatcher can reach it by name.
    pub async fn run(
        &self,
        context: &mut Vec<Message>,
        transcript: &TranscriptSink,
        prompt: &str,
        progress: &ProgressSink,
        inject: &Arc<InjectQueue>,
        cancel: &CancelToken,
    ) -> Result<String> {
        self.hooks.bind_inject(Some(inject.clone()));
        let result = self
            .run_inner(context, transcript, prompt, progress, inject, cancel)
            .await;
        self.hooks.bind_inject(None);
        result
    }

    async fn run_inner(
        &self,
        context: &mut Vec<Message>,
        transcript: &TranscriptSink,
        prompt: &str,
        progress: &ProgressSink,
        inject: &Arc<InjectQueue>,
        cancel: &CancelToken,
    ) -> Result<String> {
        self.hooks
            .fire(HookEvent::PromptSubmit, &serde_json::json!({"prompt": prompt}))
            .await;

        context.push(Message::user(prompt));
        transcript.record("user", prompt, None);

        let mut last_text = String::new();
        let mut force_respond = false;

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                return Ok(self.finish_cancelled(transcript, progress, last_text));
            }

            // Injection point 1.
            self.drain_injections(inject, context, transcript, progress)
                .await;

            progress(ProgressEvent::Thinking { iteration });

            // One-shot: a set flag strips tools from exactly this request.
            let tools = if force_respond {
                Vec::new()
            } else {
                self.hooks.tools().definitions()
            };
            force_respond = false;

            self.hooks
                .fire(
                    HookEvent::ProviderRequest,
                    &serde_json::json!({"iteration": iteration, "tool_count": tools.len()}),
                )
                .await;

            if cancel.is_cancelled() {
                return Ok(self.finish_cancelled(transcript, progress, last_text));
            }

            let (text, tool_calls, was_cancelled) =
                match self.call_provider(context, tools, progress, cancel).await {
                    Ok(v) => v,
                    Err(e) => {
                        transcript.record(
                            "system",
                            &format!("[provider error: {e}]"),
                            Some(serde_json::json!({"provider_error": true})),
                        );
                        progress(ProgressEvent::Error {
                            message: e.to_string(),
                        });
                        return Err(e);
                    }
                };

            if was_cancelled {
                let kept = if text.is_empty() { last_text } else { text };
                return Ok(self.finish_cancelled(transcript, progress, kept));
            }

            if !text.is_empty() {
                last_text = text.clone();
            }

            context.push(Message::assistant_with_tool_calls(&text, &tool_calls));
            let meta = if tool_calls.is_empty() {
                None
            } else {
                serde_json::to_string(&tool_calls)
                    .ok()
                    .map(|tc| serde_json::json!({"tool_calls": tc}))
            };
            transcript.record("assistant", &text, meta);

            if tool_calls.is_empty() {
                // Injection point 2: the user spoke while the model was
                // answering; do NOT exit on this response.
                if self
                    .drain_injections(inject, context, transcript, progress)
                    .await
                    > 0
                {
                    continue;
                }
                progress(ProgressEvent::Complete {
                    status: CompletionStatus::Done,
                });
                return Ok(text);
            }

            // ── Tool dispatch (parallel, results in call order) ──────
            for tc in &tool_calls {
                let todos = (tc.tool_name == "todo")
                    .then(|| extract_todos(&tc.arguments))
                    .flatten();
                let agent = (tc.tool_name == "delegate")
                    .then(|| extract_agent(&tc.arguments))
                    .flatten();
                progress(ProgressEvent::ToolStart {
                    name: tc.tool_name.clone(),
                    args_digest: args_digest(&tc.arguments),
                    agent,
                    todos,
                });
            }

            let futures: Vec<_> = tool_calls.iter().map(|tc| self.run_one_tool(tc)).collect();
            let outcomes = futures_util::future::join_all(futures).await;

            let mut batch_forces_respond = false;
            for (tc, outcome) in tool_calls.iter().zip(outcomes) {
                let todos_after = (tc.tool_name == "todo")
                    .then(|| extract_todos(&serde_json::Value::String(outcome.content.clone())))
                    .flatten();
                progress(ProgressEvent::ToolEnd {
                    name: tc.tool_name.clone(),
                    duration_ms: outcome.duration_ms,
                    todos: todos_after,
                });

                if self.force_respond_tools.contains(&tc.tool_name) {
                    batch_forces_respond = true;
                }

                let msg = if outcome.is_error {
                    Message::tool_error(&tc.call_id, &outcome.content)
                } else {
                    Message::tool_result(&tc.call_id, &outcome.content)
                };
                context.push(msg);
                transcript.record(
                    "tool",
                    &outcome.content,
                    Some(serde_json::json!({
                        "call_id": tc.call_id,
                        "tool_name": tc.tool_name,
                        "is_error": outcome.is_error,
                    })),
                );
            }
            if batch_forces_respond {
                force_respond = true;
            }

            // Injection point 3.
            self.drain_injections(inject, context, transcript, progress)
                .await;
        }

        transcript.record(
            "system",
            "[iteration cap reached]",
            Some(serde_json::json!({"iteration_cap": true})),
        );
        progress(ProgressEvent::Error {
            message: format!("iteration cap reached ({})", self.max_iterations),
        });
        Ok(last_text)
    }

    // ── Injection drain (shared by all three points) ───────────────

    async fn drain_injections(
        &self,
        inject: &Arc<InjectQueue>,
        context: &mut Vec<Message>,
        transcript: &TranscriptSink,
        progress: &ProgressSink,
    ) -> usize {
        let Some((message, count)) = inject.drain_to_message() else {
            return 0;
        };

        context.push(Message::user(&message));
        transcript.record("user", &message, Some(serde_json::json!({"injected": true})));
        self.hooks
            .fire(
                HookEvent::InjectionApplied,
                &serde_json::json!({"count": count}),
            )
            .await;
        progress(ProgressEvent::InjectionApplied { count });
        count
    }

    fn finish_cancelled(
        &self,
        transcript: &TranscriptSink,
        progress: &ProgressSink,
        text: String,
    ) -> String {
        transcript.record(
            "system",
            "[execution cancelled]",
            Some(serde_json::json!({"cancelled": true})),
        );
        progress(ProgressEvent::Complete {
            status: CompletionStatus::Cancelled,
        });
        text
    }

    // ── Provider call (streaming, retried on transport errors) ─────

    async fn call_provider(
        &self,
        context: &[Message],
        tools: Vec<hive_domain::tool::ToolDefinition>,
        progress: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(String, Vec<ToolCall>, bool)> {
        let req = ChatRequest {
            messages: context.to_vec(),
            tools,
            temperature: Some(0.2),
            max_tokens: None,
            model: None,
        };

        let mut stream = retry_with_backoff(PROVIDER_ATTEMPTS, PROVIDER_BACKOFF, || {
            let req = req.clone();
            async move { self.provider.chat_stream(req).await }
        })
        .await?;

        let mut text_buf = String::new();
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut was_cancelled = false;
        // call_id -> (name, args buffer); for providers that never send
        // a ToolCallFinished.
        let mut tc_bufs: std::collections::HashMap<String, (String, String)> =
            std::collections::HashMap::new();

        while let Some(event) = stream.next().await {
            if cancel.is_cancelled() {
                was_cancelled = true;
                break;
            }
            match event? {
                StreamEvent::Token { text } => {
                    progress(ProgressEvent::ContentDelta { text: text.clone() });
                    text_buf.push_str(&text);
                }
                StreamEvent::Thinking { .. } => {
                    // Model reasoning is not part of the answer.
                }
                StreamEvent::ToolCallStarted { call_id, tool_name } => {
                    tc_bufs.insert(call_id, (tool_name, String::new()));
                }
                StreamEvent::ToolCallDelta { call_id, delta } => {
                    if let Some((_, args)) = tc_bufs.get_mut(&call_id) {
                        args.push_str(&delta);
                    }
                }
                StreamEvent::ToolCallFinished {
                    call_id,
                    tool_name,
                    arguments,
                } => {
                    tc_bufs.remove(&call_id);
                    pending.push(ToolCall {
                        call_id,
                        tool_name,
                        arguments,
                    });
                }
                StreamEvent::Done { .. } => {}
                StreamEvent::Error { message } => {
                    return Err(Error::Provider {
                        provider: self.provider.provider_id().to_string(),
                        message,
                    });
                }
            }
        }

        // Assemble calls that came through start/delta only.
        for (call_id, (name, args_str)) in tc_bufs.drain() {
            let arguments = if args_str.trim().is_empty() {
                serde_json::Value::Object(Default::default())
            } else {
                serde_json::from_str(&args_str).unwrap_or_else(|e| {
                    tracing::warn!(
                        call_id = %call_id,
                        tool = %name,
                        error = %e,
                        "tool call arguments are not valid JSON; defaulting to empty object"
                    );
                    serde_json::Value::Object(Default::default())
                })
            };
            pending.push(ToolCall {
                call_id,
                tool_name: name,
                arguments,
            });
        }

        Ok((text_buf, pending, was_cancelled))
    }

    // ── Single tool execution with pre/post hooks ──────────────────

    async fn run_one_tool(&self, tc: &ToolCall) -> ToolOutcome {
        let start = Instant::now();
        let payload = serde_json::json!({
            "tool_name": tc.tool_name,
            "arguments": tc.arguments,
        });

        let pre = self.hooks.fire(HookEvent::ToolPre, &payload).await;
        let (content, is_error) = if pre.action == HookAction::Deny {
            let reason = pre.deny_reason().unwrap_or("denied by hook").to_string();
            (format!("tool call denied: {reason}"), true)
        } else {
            match self.hooks.tools().get(&tc.tool_name) {
                None => (format!("unknown tool: {}", tc.tool_name), true),
                Some(tool) => match tool.execute(&tc.arguments).await {
                    Ok(out) => (out, false),
                    Err(e) => (e.to_string(), true),
                },
            }
        };

        self.hooks
            .fire(
                HookEvent::ToolPost,
                &serde_json::json!({
                    "tool_name": tc.tool_name,
                    "is_error": is_error,
                }),
            )
            .await;

        ToolOutcome {
            content,
            is_error,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use hive_domain::capability::LlmCapabilities;
    use hive_domain::stream::BoxStream;
    use hive_providers::ChatResponse;
    use hive_tools::Tool;
    use parking_lot::Mutex;

    /// A scripted provider: one entry per expected request. Records the
    /// tool count of every request and runs an optional per-request
    /// callback before answering (used to race injections against the
    /// loop deterministically).
    struct MockProvider {
        script: Mutex<Vec<(String, Vec<ToolCall>)>>,
        calls: Arc<Mutex<Vec<usize>>>,
        on_request: Option<Box<dyn Fn(usize) + Send + Sync>>,
    }

    impl MockProvider {
        fn scripted(responses: Vec<(&str, Vec<ToolCall>)>) -> Self {
            Self {
                script: Mutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|(t, c)| (t.to_string(), c))
                        .collect(),
                ),
                calls: Arc::new(Mutex::new(Vec::new())),
                on_request: None,
            }
        }

        fn tool_counts(&self) -> Arc<Mutex<Vec<usize>>> {
            self.calls.clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockProvider {
        async fn chat(&self, _req: ChatRequest) -> hive_domain::Result<ChatResponse> {
            unimplemented!("tests use chat_stream")
        }

        async fn chat_stream(
            &self,
            req: ChatRequest,
        ) -> hive_domain::Result<BoxStream<'static, hive_domain::Result<StreamEvent>>> {
            let call_idx = {
                let mut calls = self.calls.lock();
                calls.push(req.tools.len());
                calls.len() - 1
            };
            if let Some(ref hook) = self.on_request {
                hook(call_idx);
            }
            let (text, tool_calls) = self
                .script
                .lock()
                .pop()
                .expect("mock script exhausted: unexpected provider call");

            let mut events: Vec<hive_domain::Result<StreamEvent>> = Vec::new();
            if !text.is_empty() {
                events.push(Ok(StreamEvent::Token { text }));
            }
            for tc in tool_calls {
                events.push(Ok(StreamEvent::ToolCallFinished {
                    call_id: tc.call_id,
                    tool_name: tc.tool_name,
                    arguments: tc.arguments,
                }));
            }
            events.push(Ok(StreamEvent::Done {
                usage: None,
                finish_reason: None,
            }));
            Ok(Box::pin(futures_util::stream::iter(events)))
        }

        fn capabilities(&self) -> &LlmCapabilities {
            static CAPS: LlmCapabilities = LlmCapabilities {
                supports_tools: true,
                supports_streaming: true,
                context_window_tokens: None,
                max_output_tokens: None,
            };
            &CAPS
        }

        fn provider_id(&self) -> &str {
            "mock"
        }
    }

    struct StubTool {
        name: &'static str,
        output: &'static str,
    }

    #[async_trait::async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _args: &serde_json::Value) -> hive_domain::Result<String> {
            Ok(self.output.to_string())
        }
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            call_id: id.into(),
            tool_name: name.into(),
            arguments: serde_json::json!({}),
        }
    }

    struct Harness {
        hooks: Arc<HookCoordinator>,
        transcript: TranscriptSink,
        _dir: tempfile::TempDir,
        events: Arc<Mutex<Vec<ProgressEvent>>>,
        inject: Arc<InjectQueue>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::TempDir::new().unwrap();
            let writer = Arc::new(hive_sessions::TranscriptWriter::new(dir.path()));
            let hooks = Arc::new(HookCoordinator::new());
            let inject = Arc::new(InjectQueue::new());
            hooks.bind_inject(Some(inject.clone()));
            Self {
                hooks,
                transcript: TranscriptSink::new(writer, "test".into()),
                _dir: dir,
                events: Arc::new(Mutex::new(Vec::new())),
                inject,
            }
        }

        fn sink(&self) -> ProgressSink {
            let events = self.events.clone();
            Arc::new(move |ev| events.lock().push(ev))
        }

        fn orchestrator(&self, provider: Arc<dyn LlmProvider>) -> Orchestrator {
            Orchestrator::new(
                provider,
                self.hooks.clone(),
                ["dispatch_worker".to_string()],
                10,
            )
        }
    }

    #[tokio::test]
    async fn plain_text_response_terminates_loop() {
        let h = Harness::new();
        let provider = Arc::new(MockProvider::scripted(vec![("Hello", vec![])]));
        let orch = h.orchestrator(provider);

        let mut context = Vec::new();
        let text = orch
            .run(
                &mut context,
                &h.transcript,
                "hi",
                &h.sink(),
                &h.inject,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(text, "Hello");
        assert_eq!(context.len(), 2); // user + assistant
        assert!(h.events.lock().iter().any(|e| matches!(
            e,
            ProgressEvent::Complete {
                status: CompletionStatus::Done
            }
        )));
    }

    #[tokio::test]
    async fn tool_call_results_feed_the_next_request() {
        let h = Harness::new();
        h.hooks.mount_tool(Arc::new(StubTool {
            name: "lookup",
            output: "42",
        }));
        let provider = Arc::new(MockProvider::scripted(vec![
            ("", vec![call("tc1", "lookup")]),
            ("the answer is 42", vec![]),
        ]));
        let orch = h.orchestrator(provider);

        let mut context = Vec::new();
        let text = orch
            .run(
                &mut context,
                &h.transcript,
                "what is it?",
                &h.sink(),
                &h.inject,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(text, "the answer is 42");
        // user, assistant(tool call), tool result, assistant(final)
        assert_eq!(context.len(), 4);
        let events = h.events.lock();
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::ToolStart { name, .. } if name == "lookup")));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::ToolEnd { name, .. } if name == "lookup")));
    }

    #[tokio::test]
    async fn force_respond_strips_tools_from_next_request() {
        let h = Harness::new();
        h.hooks.mount_tool(Arc::new(StubTool {
            name: "dispatch_worker",
            output: "worker dispatched",
        }));
        let provider = Arc::new(MockProvider::scripted(vec![
            ("", vec![call("tc1", "dispatch_worker")]),
            ("I've started a worker on that.", vec![]),
        ]));
        let counts = provider.tool_counts();
        let orch = h.orchestrator(provider);

        let mut context = Vec::new();
        let text = orch
            .run(
                &mut context,
                &h.transcript,
                "go",
                &h.sink(),
                &h.inject,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(text, "I've started a worker on that.");
        let counts = counts.lock();
        assert_eq!(counts.len(), 2);
        assert!(counts[0] > 0, "first request carries the tool registry");
        assert_eq!(counts[1], 0, "force-respond request must carry no tools");
    }

    #[tokio::test]
    async fn injection_point_two_prevents_premature_exit() {
        let h = Harness::new();
        let inject = h.inject.clone();
        let mut provider = MockProvider::scripted(vec![
            ("first answer", vec![]),
            ("final answer covering the extra ask", vec![]),
        ]);
        // The steering message lands while the first response streams.
        provider.on_request = Some(Box::new(move |idx| {
            if idx == 0 {
                inject.push("also check tests");
            }
        }));
        let provider = Arc::new(provider);
        let counts = provider.tool_counts();
        let orch = h.orchestrator(provider);

        let mut context = Vec::new();
        let text = orch
            .run(
                &mut context,
                &h.transcript,
                "analyze repo",
                &h.sink(),
                &h.inject,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(text, "final answer covering the extra ask");
        assert_eq!(counts.lock().len(), 2, "loop must continue after injection");
        assert!(h
            .events
            .lock()
            .iter()
            .any(|e| matches!(e, ProgressEvent::InjectionApplied { count: 1 })));
        // The synthesized message is a single user message with the preamble.
        let injected = context.iter().any(|m| {
            m.content
                .text()
                .is_some_and(|t| t.contains("also check tests") && t.starts_with("[The user sent"))
        });
        assert!(injected);
    }

    #[tokio::test]
    async fn pre_cancelled_execution_returns_immediately() {
        let h = Harness::new();
        let provider = Arc::new(MockProvider::scripted(vec![]));
        let counts = provider.tool_counts();
        let orch = h.orchestrator(provider);
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut context = Vec::new();
        let text = orch
            .run(&mut context, &h.transcript, "hi", &h.sink(), &h.inject, &cancel)
            .await
            .unwrap();

        assert_eq!(text, "");
        assert!(counts.lock().is_empty(), "provider must not be called");
        assert!(h.events.lock().iter().any(|e| matches!(
            e,
            ProgressEvent::Complete {
                status: CompletionStatus::Cancelled
            }
        )));
    }

    #[tokio::test]
    async fn iteration_cap_emits_error_and_returns_partial() {
        let h = Harness::new();
        h.hooks.mount_tool(Arc::new(StubTool {
            name: "spin",
            output: "again",
        }));
        let provider = Arc::new(MockProvider::scripted(vec![
            ("working on it", vec![call("tc1", "spin")]),
            ("still going", vec![call("tc2", "spin")]),
        ]));
        let orch = Orchestrator::new(provider, h.hooks.clone(), Vec::<String>::new(), 2);

        let mut context = Vec::new();
        let text = orch
            .run(
                &mut context,
                &h.transcript,
                "loop forever",
                &h.sink(),
                &h.inject,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(text, "still going");
        assert!(h
            .events
            .lock()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Error { message } if message.contains("iteration cap"))));
    }

    #[tokio::test]
    async fn hook_denial_becomes_synthetic_error_result() {
        struct DenyAll;
        #[async_trait::async_trait]
        impl super::super::hooks::HookHandler for DenyAll {
            async fn handle(
                &self,
                _event: HookEvent,
                _payload: &serde_json::Value,
            ) -> super::super::hooks::HookOutcome {
                super::super::hooks::HookOutcome::deny("not in this channel")
            }
        }

        let h = Harness::new();
        h.hooks.mount_tool(Arc::new(StubTool {
            name: "exec",
            output: "should never run",
        }));
        h.hooks.mount_hook(HookEvent::ToolPre, Arc::new(DenyAll));
        let provider = Arc::new(MockProvider::scripted(vec![
            ("", vec![call("tc1", "exec")]),
            ("understood, skipping that", vec![]),
        ]));
        let orch = h.orchestrator(provider);

        let mut context = Vec::new();
        let text = orch
            .run(
                &mut context,
                &h.transcript,
                "run it",
                &h.sink(),
                &h.inject,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(text, "understood, skipping that");
        let denied = context.iter().any(|m| {
            matches!(&m.content, hive_domain::tool::MessageContent::Parts(parts)
                if parts.iter().any(|p| matches!(p,
                    hive_domain::tool::ContentPart::ToolResult { content, is_error, .. }
                        if *is_error && content.contains("not in this channel"))))
        });
        assert!(denied, "denied call must leave an error tool result");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result_not_a_crash() {
        let h = Harness::new();
        let provider = Arc::new(MockProvider::scripted(vec![
            ("", vec![call("tc1", "ghost")]),
            ("no such tool, moving on", vec![]),
        ]));
        let orch = h.orchestrator(provider);

        let mut context = Vec::new();
        let text = orch
            .run(
                &mut context,
                &h.transcript,
                "use ghost",
                &h.sink(),
                &h.inject,
                &CancelToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(text, "no such tool, moving on");
    }
}
