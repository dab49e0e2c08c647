//! Single-shot deferred tasks
//!
//! A min-heap of tasks ordered by deadline. The owner's event loop asks for
//! [`DeferredQueue::next_deadline`] to know how long it may sleep and calls
//! [`DeferredQueue::pop_due`] when it wakes. Tasks cannot be cancelled; a task
//! whose target no longer exists is simply ignored by whoever pops it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Identifies one scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskToken(u64);

#[derive(Debug)]
struct Entry<T> {
    due: Instant,
    token: TaskToken,
    payload: T,
}

// Ordered by deadline, ties broken by scheduling order.
impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.token == other.token
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.token).cmp(&(other.due, other.token))
    }
}

/// Queue of single-shot tasks carrying a payload.
#[derive(Debug)]
pub struct DeferredQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    next_token: u64,
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_token: 0,
        }
    }

    /// Schedule `payload` to become due at `due`.
    pub fn schedule(&mut self, due: Instant, payload: T) -> TaskToken {
        let token = TaskToken(self.next_token);
        self.next_token += 1;
        self.heap.push(Reverse(Entry {
            due,
            token,
            payload,
        }));
        token
    }

    /// Schedule `payload` to become due `delay` after `now`.
    pub fn schedule_after(&mut self, now: Instant, delay: Duration, payload: T) -> TaskToken {
        self.schedule(now + delay, payload)
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<(TaskToken, T)> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|Reverse(entry)| entry.due <= now) {
            if let Some(Reverse(entry)) = self.heap.pop() {
                due.push((entry.token, entry.payload));
            }
        }
        due
    }

    /// Deadline of the earliest task.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_in_deadline_order() {
        let start = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.schedule(start + Duration::from_millis(30), "c");
        queue.schedule(start + Duration::from_millis(10), "a");
        queue.schedule(start + Duration::from_millis(20), "b");

        assert_eq!(queue.next_deadline(), Some(start + Duration::from_millis(10)));
        assert!(queue.pop_due(start).is_empty());

        let due: Vec<_> = queue
            .pop_due(start + Duration::from_millis(20))
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(due, vec!["a", "b"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_same_deadline_keeps_scheduling_order() {
        let due = Instant::now();
        let mut queue = DeferredQueue::new();
        let first = queue.schedule(due, 1);
        let second = queue.schedule(due, 2);
        assert_eq!(queue.pop_due(due), vec![(first, 1), (second, 2)]);
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn test_schedule_after() {
        let now = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.schedule_after(now, Duration::from_secs(1), ());
        assert_eq!(queue.next_deadline(), Some(now + Duration::from_secs(1)));
        assert!(queue.pop_due(now + Duration::from_millis(999)).is_empty());
        assert_eq!(queue.pop_due(now + Duration::from_secs(1)).len(), 1);
    }
}
