//! Session-adjacent persistence: conversation identity, append-only JSONL
//! transcripts with replay, and per-user onboarding records.

pub mod conversation;
pub mod onboarding;
pub mod transcript;

pub use conversation::ConversationId;
pub use onboarding::{OnboardingState, OnboardingStore};
pub use transcript::{TranscriptLine, TranscriptWriter};
