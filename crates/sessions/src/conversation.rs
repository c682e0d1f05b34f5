//! Conversation identity.
//!
//! A conversation is a Slack thread, a DM, or a one-shot summon. The
//! string forms are stable and used as session keys and transcript file
//! stems:
//!
//! - `"<channel>:<thread_ts>"` — channel thread
//! - `"dm:<user>"`             — direct message
//! - `"summon:<instance>:<msg_ts>"` — emoji summon (also the dedup key)

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Channel { channel: String, thread_ts: String },
    Dm { user: String },
    Summon { instance: String, message_ts: String },
}

impl ConversationId {
    pub fn channel(channel: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
            thread_ts: thread_ts.into(),
        }
    }

    pub fn dm(user: impl Into<String>) -> Self {
        Self::Dm { user: user.into() }
    }

    pub fn summon(instance: impl Into<String>, message_ts: impl Into<String>) -> Self {
        Self::Summon {
            instance: instance.into(),
            message_ts: message_ts.into(),
        }
    }

    /// Parse the stable string form back into a `ConversationId`.
    ///
    /// Slack channel ids never collide with the `dm`/`summon` prefixes
    /// (they are uppercase `C…`/`G…`/`D…` ids).
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(user) = s.strip_prefix("dm:") {
            if user.is_empty() {
                return None;
            }
            return Some(Self::dm(user));
        }
        if let Some(rest) = s.strip_prefix("summon:") {
            let (instance, ts) = rest.split_once(':')?;
            if instance.is_empty() || ts.is_empty() {
                return None;
            }
            return Some(Self::summon(instance, ts));
        }
        let (channel, thread_ts) = s.split_once(':')?;
        if channel.is_empty() || thread_ts.is_empty() {
            return None;
        }
        Some(Self::channel(channel, thread_ts))
    }

    /// The transcript file stem for this conversation under an instance:
    /// `<instance>-<conv_id>` with path separators made safe.
    pub fn file_stem(&self, instance: &str) -> String {
        format!("{instance}-{}", self).replace(['/', '\\'], "_")
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel { channel, thread_ts } => write!(f, "{channel}:{thread_ts}"),
            Self::Dm { user } => write!(f, "dm:{user}"),
            Self::Summon {
                instance,
                message_ts,
            } => write!(f, "summon:{instance}:{message_ts}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trip() {
        let id = ConversationId::channel("C123", "1700000000.000100");
        assert_eq!(id.to_string(), "C123:1700000000.000100");
        assert_eq!(ConversationId::parse("C123:1700000000.000100"), Some(id));
    }

    #[test]
    fn dm_round_trip() {
        let id = ConversationId::dm("U42");
        assert_eq!(id.to_string(), "dm:U42");
        assert_eq!(ConversationId::parse("dm:U42"), Some(id));
    }

    #[test]
    fn summon_round_trip() {
        let id = ConversationId::summon("beta", "1700000000.000200");
        assert_eq!(id.to_string(), "summon:beta:1700000000.000200");
        assert_eq!(
            ConversationId::parse("summon:beta:1700000000.000200"),
            Some(id)
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(ConversationId::parse(""), None);
        assert_eq!(ConversationId::parse("no-colon"), None);
        assert_eq!(ConversationId::parse("dm:"), None);
        assert_eq!(ConversationId::parse("summon:beta"), None);
        assert_eq!(ConversationId::parse(":ts"), None);
    }

    #[test]
    fn file_stem_is_path_safe() {
        let id = ConversationId::channel("C1/evil", "1.2");
        let stem = id.file_stem("alpha");
        assert!(!stem.contains('/'));
        assert_eq!(stem, "alpha-C1_evil:1.2");
    }
}
