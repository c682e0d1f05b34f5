use std::sync::Arc;

use hive_domain::config::Config;

use crate::dispatch::active::ActiveExecutions;
use crate::dispatch::owners::ThreadOwnerMap;
use crate::dispatch::{ChannelInfoCache, DedupeStore, RecentResponses};
use crate::onboarding::OnboardingNudger;
use crate::runtime::approval::ApprovalBroker;
use crate::runtime::session::SessionRegistry;
use crate::slack::client::SlackClient;

/// Shared application state, one per process.
///
/// Fields are grouped by concern:
/// - **Core** — config, Slack client, session registry
/// - **Dispatch** — thread owners, active executions, dedupe, caches
/// - **Back-channels** — approvals, onboarding
#[derive(Clone)]
pub struct AppState {
    // ── Core ──────────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub slack: Arc<SlackClient>,
    pub registry: Arc<SessionRegistry>,

    // ── Dispatch ──────────────────────────────────────────────────
    pub owners: Arc<ThreadOwnerMap>,
    pub active: Arc<ActiveExecutions>,
    pub dedupe: Arc<DedupeStore>,
    pub channels: Arc<ChannelInfoCache>,
    pub recent: Arc<RecentResponses>,
    /// Our own Slack user id (drop self-authored events).
    pub bot_user_id: String,

    // ── Back-channels ─────────────────────────────────────────────
    pub approvals: Arc<ApprovalBroker>,
    pub onboarding: Arc<OnboardingNudger>,
}
