//! Per-user progressive-disclosure onboarding.
//!
//! Each user gets a small persisted record at
//! `<state>/users/<user_id>/onboarding.json`. The state machine decides
//! a single optional suffix per response, goes quiet after roughly six
//! distinct interactions, and never repeats a tip (the fresh-start
//! footer is the one exception: it shows during the first three
//! threads).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use hive_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};

const RECENT_THREADS_CAP: usize = 10;
const FOOTER_THREADS: u32 = 3;
const CROSS_THREAD_NOTE_CAP: u32 = 3;
const LONG_RUN_SECS: u64 = 20;

const TIP_STEERING: &str = "steering";
const TIP_REGENERATE: &str = "regenerate";
const TIP_FILES: &str = "files";

/// Phrases that suggest the user expects cross-thread memory.
const CROSS_THREAD_PHRASES: &[&str] = &[
    "as i mentioned",
    "as i said",
    "like i said",
    "remember when",
    "you said",
    "we talked about",
    "we discussed",
    "last time",
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingState {
    pub first_seen: String,
    #[serde(default)]
    pub welcomed: bool,
    #[serde(default)]
    pub threads_started: u32,
    #[serde(default)]
    pub recent_threads: Vec<String>,
    /// tip name → RFC 3339 timestamp it was shown (null = reserved).
    #[serde(default)]
    pub tips_shown: HashMap<String, Option<String>>,
    #[serde(default)]
    pub cross_thread_notes_shown: u32,
}

impl OnboardingState {
    pub fn new() -> Self {
        Self {
            first_seen: Utc::now().to_rfc3339(),
            welcomed: false,
            threads_started: 0,
            recent_threads: Vec::new(),
            tips_shown: HashMap::new(),
            cross_thread_notes_shown: 0,
        }
    }

    fn tip_shown(&self, name: &str) -> bool {
        self.tips_shown.contains_key(name)
    }

    fn mark_tip(&mut self, name: &str) {
        self.tips_shown
            .insert(name.to_owned(), Some(Utc::now().to_rfc3339()));
    }

    /// Record that a message arrived in `thread_id`. Returns `true` when
    /// this begins a new thread for the user.
    pub fn observe_thread(&mut self, thread_id: &str) -> bool {
        if self.recent_threads.iter().any(|t| t == thread_id) {
            return false;
        }
        self.threads_started += 1;
        self.recent_threads.push(thread_id.to_owned());
        if self.recent_threads.len() > RECENT_THREADS_CAP {
            self.recent_threads.remove(0);
        }
        true
    }

    /// Decide the suffix to append to the bot's response, if any.
    ///
    /// First match wins; everything except the fresh-start footer shows
    /// at most once per user, ever.
    pub fn choose_suffix(
        &mut self,
        is_new_thread: bool,
        message_text: &str,
        response_duration: Duration,
    ) -> Option<String> {
        // (a) Cross-thread-reference note, capped at 3 lifetime showings.
        if is_new_thread
            && self.cross_thread_notes_shown < CROSS_THREAD_NOTE_CAP
            && mentions_prior_thread(message_text)
        {
            self.cross_thread_notes_shown += 1;
            return Some(
                "By the way: each thread starts fresh for me, so I can't see our other \
                 conversations. A one-line recap goes a long way."
                    .into(),
            );
        }

        // (b) Fresh-start footer during the first 3 threads.
        if is_new_thread && self.threads_started <= FOOTER_THREADS {
            return Some("New thread, fresh start — I don't carry context between threads.".into());
        }

        let past_footer_phase = self.threads_started > FOOTER_THREADS;

        // (c) Mid-execution steering tip after a long run.
        if past_footer_phase
            && response_duration.as_secs() > LONG_RUN_SECS
            && !self.tip_shown(TIP_STEERING)
        {
            self.mark_tip(TIP_STEERING);
            return Some(
                "Tip: if I'm taking a while, you can keep typing — I'll fold new messages \
                 into what I'm already doing."
                    .into(),
            );
        }

        // (d) Regenerate tip on the first new thread after the footer phase.
        if past_footer_phase && is_new_thread && !self.tip_shown(TIP_REGENERATE) {
            self.mark_tip(TIP_REGENERATE);
            return Some(
                "Tip: react with :arrows_counterclockwise: on any of my replies and I'll \
                 take another pass at it."
                    .into(),
            );
        }

        // (e) File tip on the next new thread after the regenerate tip.
        if past_footer_phase
            && is_new_thread
            && self.tip_shown(TIP_REGENERATE)
            && !self.tip_shown(TIP_FILES)
        {
            self.mark_tip(TIP_FILES);
            return Some("Tip: drop files into the thread and I'll work with them.".into());
        }

        None
    }
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self::new()
    }
}

fn mentions_prior_thread(text: &str) -> bool {
    let lower = text.to_lowercase();
    CROSS_THREAD_PHRASES.iter().any(|p| lower.contains(p))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Loads and saves onboarding records under `<users_dir>/<user>/onboarding.json`.
pub struct OnboardingStore {
    users_dir: PathBuf,
}

impl OnboardingStore {
    pub fn new(users_dir: &Path) -> Self {
        Self {
            users_dir: users_dir.to_path_buf(),
        }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let safe = user_id.replace(['/', '\\'], "_");
        self.users_dir.join(safe).join("onboarding.json")
    }

    /// Load a user's record, or `None` for a never-seen user.
    pub fn load(&self, user_id: &str) -> Result<Option<OnboardingState>> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save(&self, user_id: &str, state: &OnboardingState) -> Result<()> {
        let path = self.path_for(user_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let raw = serde_json::to_string_pretty(state)?;
        std::fs::write(&path, raw).map_err(Error::Io)?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
