//! Google Gemini adapter.
//!
//! Implements the `generateContent` / `streamGenerateContent` API.
//! Gemini keys go in the `x-goog-api-key` header, system messages in a
//! separate `systemInstruction` field, and tool calls arrive as
//! `functionCall` parts (no call ids — we synthesize them).

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::{from_reqwest, resolve_api_key};
use hive_domain::capability::LlmCapabilities;
use hive_domain::config::ProviderConfig;
use hive_domain::error::{Error, Result};
use hive_domain::stream::{BoxStream, StreamEvent, Usage};
use hive_domain::tool::{ContentPart, Message, MessageContent, Role, ToolCall};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GoogleProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    capabilities: LlmCapabilities,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".into());

        let capabilities = LlmCapabilities {
            supports_tools: true,
            supports_streaming: true,
            context_window_tokens: Some(1_000_000),
            max_output_tokens: Some(8_192),
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            capabilities,
            client,
        })
    }

    fn model_url(&self, req: &ChatRequest, verb: &str) -> String {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        format!("{}/v1beta/models/{}:{}", self.base_url, model, verb)
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let mut system_parts: Vec<String> = Vec::new();
        let mut contents: Vec<Value> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.extract_all_text()),
                Role::User => contents.push(serde_json::json!({
                    "role": "user",
                    "parts": [{"text": msg.content.extract_all_text()}],
                })),
                Role::Assistant => contents.push(assistant_to_gemini(msg)),
                Role::Tool => contents.push(tool_result_to_gemini(msg)),
            }
        }

        let mut body = serde_json::json!({ "contents": contents });

        if !system_parts.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": system_parts.join("\n\n")}],
            });
        }

        if !req.tools.is_empty() {
            let decls: Vec<Value> = req
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            body["tools"] = serde_json::json!([{"functionDeclarations": decls}]);
        }

        let mut gen_config = serde_json::Map::new();
        if let Some(temp) = req.temperature {
            gen_config.insert("temperature".into(), serde_json::json!(temp));
        }
        if let Some(max) = req.max_tokens {
            gen_config.insert("maxOutputTokens".into(), serde_json::json!(max));
        }
        if !gen_config.is_empty() {
            body["generationConfig"] = Value::Object(gen_config);
        }

        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn assistant_to_gemini(msg: &Message) -> Value {
    let mut parts: Vec<Value> = Vec::new();
    match &msg.content {
        MessageContent::Text(t) => parts.push(serde_json::json!({"text": t})),
        MessageContent::Parts(content_parts) => {
            for p in content_parts {
                match p {
                    ContentPart::Text { text } => {
                        parts.push(serde_json::json!({"text": text}));
                    }
                    ContentPart::ToolUse { name, input, .. } => {
                        parts.push(serde_json::json!({
                            "functionCall": {"name": name, "args": input},
                        }));
                    }
                    _ => {}
                }
            }
        }
    }
    serde_json::json!({"role": "model", "parts": parts})
}

fn tool_result_to_gemini(msg: &Message) -> Value {
    let mut parts: Vec<Value> = Vec::new();
    if let MessageContent::Parts(content_parts) = &msg.content {
        for p in content_parts {
            if let ContentPart::ToolResult {
                tool_use_id,
                content,
                ..
            } = p
            {
                // Gemini matches function responses by name; the call id
                // carries the synthesized "<name>:<seq>" form.
                let name = tool_use_id.split(':').next().unwrap_or(tool_use_id);
                parts.push(serde_json::json!({
                    "functionResponse": {
                        "name": name,
                        "response": {"content": content},
                    }
                }));
            }
        }
    }
    serde_json::json!({"role": "user", "parts": parts})
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_gemini_response(provider_id: &str, body: &Value) -> Result<ChatResponse> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: provider_id.into(),
            message: "no candidates in response".into(),
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for (seq, part) in parts.iter().enumerate() {
        if let Some(t) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(t);
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            tool_calls.push(ToolCall {
                call_id: format!("{name}:{seq}"),
                tool_name: name,
                arguments: fc
                    .get("args")
                    .cloned()
                    .unwrap_or(Value::Object(Default::default())),
            });
        }
    }

    let finish_reason = candidate
        .get("finishReason")
        .and_then(|v| v.as_str())
        .map(|s| match s {
            "STOP" => "stop".to_string(),
            other => other.to_lowercase(),
        });

    let usage = body.get("usageMetadata").and_then(parse_gemini_usage);

    Ok(ChatResponse {
        content: text,
        tool_calls,
        usage,
        model: body
            .get("modelVersion")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        finish_reason,
    })
}

fn parse_gemini_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("promptTokenCount")?.as_u64()? as u32;
    let completion = v
        .get("candidatesTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    Some(Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt + completion,
    })
}

/// Each streamed chunk is a full `generateContent`-shaped object; text
/// parts become tokens and function calls arrive complete in one chunk.
fn parse_gemini_sse(data: &str, seq: &mut usize) -> Vec<Result<StreamEvent>> {
    let mut events = Vec::new();

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            events.push(Err(Error::Json(e)));
            return events;
        }
    };

    let candidate = match v
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
    {
        Some(c) => c,
        None => return events,
    };

    if let Some(parts) = candidate.pointer("/content/parts").and_then(|v| v.as_array()) {
        for part in parts {
            if let Some(t) = part.get("text").and_then(|v| v.as_str()) {
                if !t.is_empty() {
                    events.push(Ok(StreamEvent::Token {
                        text: t.to_string(),
                    }));
                }
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let call_id = format!("{name}:{seq}");
                *seq += 1;
                events.push(Ok(StreamEvent::ToolCallStarted {
                    call_id: call_id.clone(),
                    tool_name: name.clone(),
                }));
                events.push(Ok(StreamEvent::ToolCallFinished {
                    call_id,
                    tool_name: name,
                    arguments: fc
                        .get("args")
                        .cloned()
                        .unwrap_or(Value::Object(Default::default())),
                }));
            }
        }
    }

    if candidate.get("finishReason").is_some() {
        let usage = v.get("usageMetadata").and_then(parse_gemini_usage);
        events.push(Ok(StreamEvent::Done {
            usage,
            finish_reason: Some("stop".into()),
        }));
    }

    events
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let url = self.model_url(&req, "generateContent");
        let body = self.build_body(&req);

        tracing::debug!(provider = %self.id, url = %url, "gemini chat request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_gemini_response(&self.id, &resp_json)
    }

    async fn chat_stream(
        &self,
        req: ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = format!("{}?alt=sse", self.model_url(&req, "streamGenerateContent"));
        let body = self.build_body(&req);

        tracing::debug!(provider = %self.id, url = %url, "gemini stream request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        let mut seq = 0usize;
        Ok(crate::sse::sse_response_stream(resp, move |data| {
            parse_gemini_sse(data, &mut seq)
        }))
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_function_call_response() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Checking."},
                    {"functionCall": {"name": "exec", "args": {"command": "ls"}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 6}
        });
        let resp = parse_gemini_response("gemini", &body).unwrap();
        assert_eq!(resp.content, "Checking.");
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].call_id, "exec:1");
        assert_eq!(resp.usage.unwrap().total_tokens, 10);
    }

    #[test]
    fn function_response_uses_name_from_call_id() {
        let msg = Message::tool_result("exec:0", "file1\nfile2");
        let wire = tool_result_to_gemini(&msg);
        assert_eq!(wire["parts"][0]["functionResponse"]["name"], "exec");
    }

    #[test]
    fn sse_chunk_emits_tokens_and_done() {
        let mut seq = 0;
        let events = parse_gemini_sse(
            r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]},"finishReason":"STOP"}]}"#,
            &mut seq,
        );
        assert!(matches!(
            events[0].as_ref().unwrap(),
            StreamEvent::Token { .. }
        ));
        assert!(matches!(
            events[1].as_ref().unwrap(),
            StreamEvent::Done { .. }
        ));
    }
}
