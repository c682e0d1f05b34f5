//! Dispatcher-side onboarding driver.
//!
//! Wraps the persisted per-user state machine from `hive-sessions`:
//! welcomes never-seen users over DM and decides the optional suffix
//! appended to a response. Persistence is best-effort and off the hot
//! path.

use std::sync::Arc;
use std::time::Duration;

use hive_sessions::{OnboardingState, OnboardingStore};

use crate::slack::client::SlackClient;

const WELCOME: &str = "Hi! I'm your team's AI assistant. Mention me in a channel or \
just message me here and I'll help out. Each thread is its own conversation, \
and you can keep typing while I work — I'll fold it in.";

pub struct OnboardingNudger {
    store: Arc<OnboardingStore>,
    slack: Arc<SlackClient>,
}

impl OnboardingNudger {
    pub fn new(store: Arc<OnboardingStore>, slack: Arc<SlackClient>) -> Self {
        Self { store, slack }
    }

    /// First-sight welcome: open a DM and say hello, once ever.
    pub async fn welcome_if_new(&self, user: &str) {
        if user.is_empty() {
            return;
        }
        let mut state = match self.store.load(user) {
            Ok(Some(state)) if state.welcomed => return,
            Ok(Some(state)) => state,
            Ok(None) => OnboardingState::new(),
            Err(e) => {
                tracing::warn!(user, error = %e, "onboarding load failed");
                return;
            }
        };

        match self.slack.open_dm(user).await {
            Ok(dm) => {
                if let Err(e) = self.slack.post_text(&dm, None, WELCOME).await {
                    tracing::warn!(user, error = %e, "welcome post failed");
                }
            }
            Err(e) => {
                tracing::warn!(user, error = %e, "could not open welcome DM");
            }
        }

        state.welcomed = true;
        self.persist(user, state);
    }

    /// Record the interaction and return the suffix (if any) to append
    /// to the bot's response.
    pub async fn decorate(
        &self,
        user: &str,
        thread_id: &str,
        message_text: &str,
        response_duration: Duration,
    ) -> Option<String> {
        if user.is_empty() {
            return None;
        }
        let mut state = match self.store.load(user) {
            Ok(Some(state)) => state,
            Ok(None) => OnboardingState::new(),
            Err(e) => {
                tracing::warn!(user, error = %e, "onboarding load failed");
                return None;
            }
        };

        let is_new_thread = state.observe_thread(thread_id);
        let suffix = state.choose_suffix(is_new_thread, message_text, response_duration);
        self.persist(user, state);
        suffix
    }

    fn persist(&self, user: &str, state: OnboardingState) {
        let store = self.store.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.save(&user, &state) {
                tracing::warn!(user = %user, error = %e, "onboarding save failed");
            }
        });
    }
}
