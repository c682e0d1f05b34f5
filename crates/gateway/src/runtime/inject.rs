//! Mid-execution message injection.
//!
//! Messages that arrive while an execution is running are pushed here by
//! the dispatcher instead of starting a second execution. The
//! orchestrator drains the queue at its three injection points and
//! synthesizes a single user message carrying all pending strings.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Literal preamble on the synthesized mid-execution user message. This
/// is the only text the LLM sees about the injection; there is no
/// separate system message.
pub const INJECTION_PREAMBLE: &str =
    "[The user sent additional messages while you were working. \
     Incorporate this into your current task:]";

/// Unbounded FIFO of user-supplied strings, created per `execute` call.
///
/// Any task may `push` while the orchestrator is running; the queue is
/// drained and discarded when the execution ends.
#[derive(Default)]
pub struct InjectQueue {
    queue: Mutex<VecDeque<String>>,
}

impl InjectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, text: impl Into<String>) {
        self.queue.lock().push_back(text.into());
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drain all pending strings into one synthesized user message.
    ///
    /// Returns `None` when the queue is empty, otherwise the message and
    /// the number of strings it absorbed.
    pub fn drain_to_message(&self) -> Option<(String, usize)> {
        let drained: Vec<String> = {
            let mut queue = self.queue.lock();
            if queue.is_empty() {
                return None;
            }
            queue.drain(..).collect()
        };

        let count = drained.len();
        let mut message = String::from(INJECTION_PREAMBLE);
        for item in &drained {
            message.push_str("\n- ");
            message.push_str(item);
        }
        Some((message, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queue_drains_to_none() {
        let q = InjectQueue::new();
        assert!(q.drain_to_message().is_none());
    }

    #[test]
    fn drain_joins_all_pending_in_fifo_order() {
        let q = InjectQueue::new();
        q.push("also check tests");
        q.push("and the docs");

        let (msg, count) = q.drain_to_message().unwrap();
        assert_eq!(count, 2);
        assert!(msg.starts_with(INJECTION_PREAMBLE));
        let tests_pos = msg.find("also check tests").unwrap();
        let docs_pos = msg.find("and the docs").unwrap();
        assert!(tests_pos < docs_pos);
    }

    #[test]
    fn drain_empties_the_queue() {
        let q = InjectQueue::new();
        q.push("one");
        assert!(q.drain_to_message().is_some());
        assert!(q.is_empty());
        assert!(q.drain_to_message().is_none());
    }
}
