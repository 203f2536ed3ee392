//! Blocking LIFO-biased queue of ready resources

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use crate::ledger::ResourceId;

/// Ready resources, most recently returned at the front.
pub(crate) struct AvailabilityQueue<T> {
    items: Mutex<VecDeque<(ResourceId, T)>>,
    signal: Condvar,
    notify: Notify,
}

impl<T> AvailabilityQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            signal: Condvar::new(),
            notify: Notify::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Push to the front and returns the new length.
    pub fn push_front(&self, id: ResourceId, value: T) -> usize {
        let len = {
            let mut items = self.items.lock();
            items.push_front((id, value));
            items.len()
        };
        self.signal.notify_one();
        self.notify.notify_one();
        len
    }

    pub fn try_pop_front(&self) -> Option<(ResourceId, T)> {
        self.items.lock().pop_front()
    }

    /// Drop from the back until at most `max` remain, returning what was removed.
    pub fn trim_to(&self, max: usize) -> Vec<(ResourceId, T)> {
        let mut items = self.items.lock();
        let mut removed = Vec::new();
        while items.len() > max {
            match items.pop_back() {
                Some(item) => removed.push(item),
                None => break,
            }
        }
        removed
    }

    /// Block for at most `timeout` waiting for a resource.
    pub fn pop_front_timeout(&self, timeout: Duration) -> Option<(ResourceId, T)> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if self.signal.wait_until(&mut items, deadline).timed_out() {
                return items.pop_front();
            }
        }
    }

    /// Async counterpart of [`pop_front_timeout`](Self::pop_front_timeout).
    ///
    /// Cancel safe: a resource is only removed in the same poll that returns it.
    pub async fn pop_front_async(&self, timeout: Duration) -> Option<(ResourceId, T)> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(item) = self.try_pop_front() {
            return Some(item);
        }
        let _ = tokio::time::timeout(timeout, notified).await;
        self.try_pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lifo_order() {
        let queue = AvailabilityQueue::new();
        queue.push_front(1, "a");
        queue.push_front(2, "b");
        assert_eq!(queue.try_pop_front(), Some((2, "b")));
        assert_eq!(queue.try_pop_front(), Some((1, "a")));
        assert_eq!(queue.try_pop_front(), None);
    }

    #[test]
    fn test_trim_to_keeps_newest() {
        let queue = AvailabilityQueue::new();
        for id in 1..=5 {
            queue.push_front(id, id);
        }
        let removed = queue.trim_to(2);
        assert_eq!(removed, vec![(1, 1), (2, 2), (3, 3)]);
        assert_eq!(queue.try_pop_front(), Some((5, 5)));
    }

    #[test]
    fn test_pop_timeout_expires() {
        let queue: AvailabilityQueue<u32> = AvailabilityQueue::new();
        let start = Instant::now();
        assert!(queue.pop_front_timeout(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_pop_timeout_wakes_on_push() {
        let queue = Arc::new(AvailabilityQueue::new());
        let producer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push_front(9, 99);
        });
        let start = Instant::now();
        assert_eq!(queue.pop_front_timeout(Duration::from_secs(5)), Some((9, 99)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_pop_async_wakes_on_push() {
        let queue = Arc::new(AvailabilityQueue::new());
        let producer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push_front(4, 44);
        });
        assert_eq!(queue.pop_front_async(Duration::from_secs(5)).await, Some((4, 44)));
    }

    #[tokio::test]
    async fn test_cancelled_async_pop_keeps_items() {
        let queue: AvailabilityQueue<u32> = AvailabilityQueue::new();
        let result =
            tokio::time::timeout(Duration::from_millis(10), queue.pop_front_async(Duration::from_secs(5))).await;
        assert!(result.is_err());
        queue.push_front(1, 1);
        assert_eq!(queue.len(), 1);
    }
}
