//! LLM provider adapters and the startup-time provider registry.
//!
//! Three HTTP adapters (Anthropic Messages, OpenAI-compatible chat
//! completions, Google Gemini generateContent) speak the shared
//! provider-agnostic types from `hive-domain`. The registry picks one
//! provider per process: explicit config wins, otherwise credentials are
//! detected in priority order Anthropic > OpenAI > Gemini.

pub mod anthropic;
pub mod google;
pub mod openai_compat;
pub mod registry;
pub mod sse;
pub mod traits;
pub mod util;

pub use registry::ProviderRegistry;
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
pub use util::retry_with_backoff;
