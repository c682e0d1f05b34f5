//! Normalized inbound events and channel-topic directives.
//!
//! Socket Mode delivers raw envelopes; `normalize` turns the payloads
//! the gateway cares about into typed events and drops the rest.

use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct SlackFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub url_private: String,
}

#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub channel: String,
    pub user: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub is_dm: bool,
    /// Set for `app_mention` deliveries.
    pub is_mention: bool,
    pub files: Vec<SlackFile>,
}

impl MessageEvent {
    /// The thread this message belongs to (its own ts when it is a root).
    pub fn thread_root(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub reaction: String,
    pub user: String,
    pub channel: String,
    pub message_ts: String,
}

#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(MessageEvent),
    ReactionAdded(ReactionEvent),
    BlockAction { action_id: String, user: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Normalization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Normalize a Socket Mode payload into an [`InboundEvent`].
///
/// `events_api` envelopes carry `payload.event`; `interactive`
/// envelopes carry `payload.actions`. Bot-authored messages and edits
/// are dropped here so the dispatcher never sees them.
pub fn normalize(envelope_type: &str, payload: &Value) -> Option<InboundEvent> {
    match envelope_type {
        "events_api" => normalize_event(payload.get("event")?),
        "interactive" => {
            if payload.get("type").and_then(|v| v.as_str()) != Some("block_actions") {
                return None;
            }
            let action_id = payload
                .pointer("/actions/0/action_id")
                .and_then(|v| v.as_str())?
                .to_string();
            let user = payload
                .pointer("/user/id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            Some(InboundEvent::BlockAction { action_id, user })
        }
        _ => None,
    }
}

fn normalize_event(event: &Value) -> Option<InboundEvent> {
    let event_type = event.get("type").and_then(|v| v.as_str())?;
    match event_type {
        "message" | "app_mention" => {
            // Ignore our own output and message edits/deletions; the
            // `file_share` subtype is a regular message with files.
            if event.get("bot_id").is_some() {
                return None;
            }
            let subtype = event.get("subtype").and_then(|v| v.as_str());
            if !matches!(subtype, None | Some("file_share") | Some("thread_broadcast")) {
                return None;
            }

            let files = event
                .get("files")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|f| {
                            Some(SlackFile {
                                id: f.get("id")?.as_str()?.to_string(),
                                name: f
                                    .get("name")
                                    .and_then(|v| v.as_str())
                                    .unwrap_or("file")
                                    .to_string(),
                                size: f.get("size").and_then(|v| v.as_u64()).unwrap_or(0),
                                url_private: f
                                    .get("url_private")
                                    .and_then(|v| v.as_str())
                                    .unwrap_or("")
                                    .to_string(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            Some(InboundEvent::Message(MessageEvent {
                channel: event.get("channel")?.as_str()?.to_string(),
                user: event
                    .get("user")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                text: event
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                ts: event.get("ts")?.as_str()?.to_string(),
                thread_ts: event
                    .get("thread_ts")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                is_dm: event.get("channel_type").and_then(|v| v.as_str()) == Some("im"),
                is_mention: event_type == "app_mention",
                files,
            }))
        }
        "reaction_added" => Some(InboundEvent::ReactionAdded(ReactionEvent {
            reaction: event.get("reaction")?.as_str()?.to_string(),
            user: event
                .get("user")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            channel: event.pointer("/item/channel")?.as_str()?.to_string(),
            message_ts: event.pointer("/item/ts")?.as_str()?.to_string(),
        })),
        _ => None,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Topic directives
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Directives parsed out of a channel topic. Several may coexist with
/// free-form prose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDirectives {
    /// `[instance:<name>]` — force every message to `<name>`.
    pub forced: Option<String>,
    /// `[default:<name>]` — target when no explicit prefix applies.
    pub default: Option<String>,
    /// `[mode:roundtable]` — fan unaddressed messages out to all instances.
    pub roundtable: bool,
}

pub fn parse_topic_directives(topic: &str) -> TopicDirectives {
    let mut directives = TopicDirectives::default();
    let re = regex::Regex::new(r"\[(instance|default|mode):([a-z0-9_-]+)\]")
        .expect("directive regex is valid");
    for cap in re.captures_iter(&topic.to_lowercase()) {
        match (&cap[1], &cap[2]) {
            ("instance", name) => directives.forced = Some(name.to_string()),
            ("default", name) => directives.default = Some(name.to_string()),
            ("mode", "roundtable") => directives.roundtable = true,
            _ => {}
        }
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_directives_coexist_with_prose() {
        let d = parse_topic_directives(
            "Team chatter — [default:alpha] ask away! [mode:roundtable]",
        );
        assert_eq!(d.default.as_deref(), Some("alpha"));
        assert!(d.roundtable);
        assert!(d.forced.is_none());
    }

    #[test]
    fn topic_directive_instance_forces() {
        let d = parse_topic_directives("[instance:beta]");
        assert_eq!(d.forced.as_deref(), Some("beta"));
        assert!(!d.roundtable);
    }

    #[test]
    fn empty_topic_has_no_directives() {
        assert_eq!(parse_topic_directives(""), TopicDirectives::default());
    }

    #[test]
    fn normalize_plain_message() {
        let payload = serde_json::json!({
            "event": {
                "type": "message",
                "channel": "C1",
                "channel_type": "channel",
                "user": "U1",
                "text": "hi",
                "ts": "1.0",
            }
        });
        match normalize("events_api", &payload) {
            Some(InboundEvent::Message(m)) => {
                assert_eq!(m.channel, "C1");
                assert_eq!(m.text, "hi");
                assert!(!m.is_dm);
                assert!(!m.is_mention);
                assert_eq!(m.thread_root(), "1.0");
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn normalize_drops_bot_and_edited_messages() {
        let bot = serde_json::json!({
            "event": {"type": "message", "channel": "C1", "ts": "1.0", "bot_id": "B1"}
        });
        assert!(normalize("events_api", &bot).is_none());

        let edit = serde_json::json!({
            "event": {"type": "message", "subtype": "message_changed", "channel": "C1", "ts": "1.0"}
        });
        assert!(normalize("events_api", &edit).is_none());
    }

    #[test]
    fn normalize_file_share_collects_files() {
        let payload = serde_json::json!({
            "event": {
                "type": "message",
                "subtype": "file_share",
                "channel": "C1",
                "user": "U1",
                "text": "here you go",
                "ts": "2.0",
                "files": [
                    {"id": "F1", "name": "data.csv", "size": 1234, "url_private": "https://files/x"}
                ],
            }
        });
        match normalize("events_api", &payload) {
            Some(InboundEvent::Message(m)) => {
                assert_eq!(m.files.len(), 1);
                assert_eq!(m.files[0].name, "data.csv");
                assert_eq!(m.files[0].size, 1234);
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn normalize_reaction_added() {
        let payload = serde_json::json!({
            "event": {
                "type": "reaction_added",
                "reaction": "beta",
                "user": "U1",
                "item": {"type": "message", "channel": "C1", "ts": "3.0"},
            }
        });
        match normalize("events_api", &payload) {
            Some(InboundEvent::ReactionAdded(r)) => {
                assert_eq!(r.reaction, "beta");
                assert_eq!(r.message_ts, "3.0");
            }
            other => panic!("expected reaction, got {other:?}"),
        }
    }

    #[test]
    fn normalize_block_action() {
        let payload = serde_json::json!({
            "type": "block_actions",
            "user": {"id": "U9"},
            "actions": [{"action_id": "approval:abc:0"}],
        });
        match normalize("interactive", &payload) {
            Some(InboundEvent::BlockAction { action_id, user }) => {
                assert_eq!(action_id, "approval:abc:0");
                assert_eq!(user, "U9");
            }
            other => panic!("expected block action, got {other:?}"),
        }
    }
}
