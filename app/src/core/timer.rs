use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt as _;
use tokio_util::time::{DelayQueue, delay_queue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer<K> {
    pub key: K,
    pub handle: TimerHandle,
}

/// Single-shot, re-armable timers. A cancelled handle never fires.
pub trait Timers<K> {
    fn arm(&mut self, key: K, after: Duration) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

pub struct DelayQueueTimers<K> {
    queue: DelayQueue<(K, TimerHandle)>,
    queue_keys: HashMap<TimerHandle, delay_queue::Key>,
    next_id: u64,
}

impl<K> DelayQueueTimers<K> {
    pub fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
            queue_keys: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.queue_keys.len()
    }

    /// Waits for the next timer to fire. Never resolves while no timer is armed.
    /// Cancel-safe, so it can be used as a `select!` branch.
    pub async fn next_fired(&mut self) -> FiredTimer<K> {
        match self.queue.next().await {
            Some(expired) => {
                let (key, handle) = expired.into_inner();
                self.queue_keys.remove(&handle);
                FiredTimer { key, handle }
            }
            None => std::future::pending().await,
        }
    }
}

impl<K> Default for DelayQueueTimers<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Timers<K> for DelayQueueTimers<K> {
    fn arm(&mut self, key: K, after: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);

        let queue_key = self.queue.insert((key, handle), after);
        self.queue_keys.insert(handle, queue_key);

        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(queue_key) = self.queue_keys.remove(&handle) {
            self.queue.try_remove(&queue_key);
        }
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;

    /// Records arm/cancel calls; timers only fire when a test fires them.
    #[derive(Debug)]
    pub struct FakeTimers<K> {
        pub armed: Vec<(K, Duration, TimerHandle)>,
        pub cancelled: Vec<TimerHandle>,
        next_id: u64,
    }

    impl<K: Clone + PartialEq> FakeTimers<K> {
        pub fn new() -> Self {
            Self {
                armed: vec![],
                cancelled: vec![],
                next_id: 0,
            }
        }

        pub fn active(&self) -> Vec<(K, TimerHandle)> {
            self.armed
                .iter()
                .filter(|(_, _, handle)| !self.cancelled.contains(handle))
                .map(|(key, _, handle)| (key.clone(), *handle))
                .collect()
        }

        pub fn last_armed(&self, key: &K) -> Option<TimerHandle> {
            self.armed
                .iter()
                .rev()
                .find(|(k, _, _)| k == key)
                .map(|(_, _, handle)| *handle)
        }

        pub fn fired(&self, key: &K) -> Option<FiredTimer<K>> {
            self.last_armed(key).map(|handle| FiredTimer {
                key: key.clone(),
                handle,
            })
        }
    }

    impl<K> Timers<K> for FakeTimers<K> {
        fn arm(&mut self, key: K, after: Duration) -> TimerHandle {
            self.next_id += 1;
            let handle = TimerHandle(self.next_id);
            self.armed.push((key, after, handle));
            handle
        }

        fn cancel(&mut self, handle: TimerHandle) {
            self.cancelled.push(handle);
        }
    }
}
