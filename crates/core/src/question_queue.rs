use std::collections::VecDeque;

/// FIFO buffer of audience questions, drained one at a time.
///
/// The queue owns its own `draining` flag so that re-entry into the drain
/// loop is decided by the queue rather than by whoever happens to call it.
#[derive(Debug, Default)]
pub struct QuestionQueue {
    pending: VecDeque<String>,
    draining: bool,
}

impl QuestionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, question: String) {
        self.pending.push_back(question);
    }

    /// Marks the queue as draining. Returns `false` when a drain is already
    /// active or there is nothing to drain, so callers collapse into one loop.
    pub fn begin_drain(&mut self) -> bool {
        if self.draining || self.pending.is_empty() {
            return false;
        }
        self.draining = true;
        true
    }

    /// Clears the draining flag once the queue has run dry.
    pub fn finish_drain(&mut self) {
        debug_assert!(self.pending.is_empty());
        self.draining = false;
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// The question currently in flight.
    pub fn peek(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.draining = false;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_drain_collapses_reentry() {
        let mut queue = QuestionQueue::new();
        assert!(!queue.begin_drain(), "nothing to drain yet");

        queue.enqueue("first".to_string());
        assert!(queue.begin_drain());
        assert!(!queue.begin_drain(), "second drain must not start");
        assert!(queue.is_draining());
    }

    #[test]
    fn test_enqueue_during_drain_is_seen_in_order() {
        let mut queue = QuestionQueue::new();
        queue.enqueue("a".to_string());
        queue.begin_drain();

        // A question arrives while "a" is in flight.
        queue.enqueue("b".to_string());

        assert_eq!(queue.peek(), Some("a"));
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.peek(), Some("b"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert!(queue.is_empty());

        queue.finish_drain();
        assert!(!queue.is_draining());
    }

    #[test]
    fn test_reset_clears_contents_and_flag() {
        let mut queue = QuestionQueue::new();
        queue.enqueue("a".to_string());
        queue.enqueue("b".to_string());
        queue.begin_drain();

        queue.reset();

        assert!(queue.is_empty());
        assert!(!queue.is_draining());
        assert_eq!(queue.peek(), None);
    }
}
