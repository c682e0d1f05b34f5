//! Active-execution tracking.
//!
//! One entry per conversation with a running execution. Existence is
//! what the dispatcher checks to decide inject-vs-new-execution, and
//! the entry carries everything needed to steer or cancel the run.
//! Worker task handles are registered process-wide so shutdown can
//! await them instead of abandoning detached tasks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::runtime::cancel::CancelToken;
use crate::runtime::inject::InjectQueue;
use crate::slack::events::MessageEvent;

/// How a mid-flight message reaches the running execution.
pub enum Steering {
    /// Single-instance execution: push into the orchestrator's queue.
    Inject(Arc<InjectQueue>),
    /// Roundtable: hold the whole event for replay after completion.
    Replay(Arc<Mutex<Vec<MessageEvent>>>),
}

pub struct ActiveExecution {
    pub steering: Steering,
    pub cancel: CancelToken,
    pub status_channel: String,
    pub status_ts: String,
    /// Executing instance; `None` for roundtable (many instances).
    pub instance: Option<String>,
}

#[derive(Default)]
pub struct ActiveExecutions {
    map: Mutex<HashMap<String, Arc<ActiveExecution>>>,
    /// Owned handles of background worker tasks, awaited at shutdown.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ActiveExecutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conversation: &str, exec: Arc<ActiveExecution>) {
        self.map.lock().insert(conversation.to_owned(), exec);
    }

    pub fn remove(&self, conversation: &str) {
        self.map.lock().remove(conversation);
    }

    pub fn get(&self, conversation: &str) -> Option<Arc<ActiveExecution>> {
        self.map.lock().get(conversation).cloned()
    }

    /// Find the execution whose status message is `ts` (the cancel
    /// reaction targets the status message, not the user's message).
    pub fn find_by_status_ts(&self, channel: &str, ts: &str) -> Option<Arc<ActiveExecution>> {
        self.map
            .lock()
            .values()
            .find(|e| e.status_channel == channel && e.status_ts == ts)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    /// Keep a worker task handle so it can be awaited at shutdown.
    pub fn register_task(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }

    /// Await all registered background tasks (process shutdown).
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "worker task ended with a panic");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(status_ts: &str) -> Arc<ActiveExecution> {
        Arc::new(ActiveExecution {
            steering: Steering::Inject(Arc::new(InjectQueue::new())),
            cancel: CancelToken::new(),
            status_channel: "C1".into(),
            status_ts: status_ts.into(),
            instance: Some("alpha".into()),
        })
    }

    #[test]
    fn register_get_remove() {
        let active = ActiveExecutions::new();
        assert!(active.get("C1:1.0").is_none());

        active.register("C1:1.0", exec("9.0"));
        assert!(active.get("C1:1.0").is_some());
        assert_eq!(active.len(), 1);

        active.remove("C1:1.0");
        assert!(active.is_empty());
    }

    #[test]
    fn lookup_by_status_ts() {
        let active = ActiveExecutions::new();
        active.register("C1:1.0", exec("9.0"));
        assert!(active.find_by_status_ts("C1", "9.0").is_some());
        assert!(active.find_by_status_ts("C1", "8.0").is_none());
        assert!(active.find_by_status_ts("C2", "9.0").is_none());
    }

    #[tokio::test]
    async fn shutdown_awaits_registered_tasks() {
        let active = ActiveExecutions::new();
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag2 = flag.clone();
        active.register_task(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            flag2.store(true, std::sync::atomic::Ordering::SeqCst);
        }));
        active.shutdown().await;
        assert!(flag.load(std::sync::atomic::Ordering::SeqCst));
    }
}
