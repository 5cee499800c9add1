//! Buffered click counters.
//!
//! Counter increments are buffered in-process and flushed to storage in
//! batches, so the hot redirect path never waits on an aggregate UPDATE.
//! Flushes happen on a timer and when the buffer crosses a size threshold;
//! a failed flush restores the drained updates so the next cycle retries
//! them.

use dashmap::DashMap;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{debug, trace, warn};

/// Target of a buffered increment. Unique clicks bump the owning tracking
/// link and, when one is attached, its campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CounterKey {
    Link(String),
    Campaign(String),
}

/// Storage-side receiver for drained counter batches.
#[async_trait::async_trait]
pub trait ClickSink: Send + Sync {
    async fn flush_clicks(&self, updates: Vec<(CounterKey, usize)>) -> anyhow::Result<()>;
}

/// Counter buffer state: the pending increments, a total for threshold
/// checks, and the flush guards.
struct CounterBuffer {
    data: DashMap<CounterKey, usize>,
    total_clicks: AtomicUsize,
    flush_lock: Mutex<()>,
    /// Set while a threshold-triggered flush task is queued, so a burst of
    /// clicks spawns one task instead of hundreds.
    flush_pending: AtomicBool,
}

impl CounterBuffer {
    fn new() -> Self {
        Self {
            data: DashMap::new(),
            total_clicks: AtomicUsize::new(0),
            flush_lock: Mutex::new(()),
            flush_pending: AtomicBool::new(false),
        }
    }

    fn increment(&self, key: CounterKey) -> usize {
        *self.data.entry(key).or_insert(0) += 1;
        self.total_clicks.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Collect all updates and clear the buffer. Keys are removed one at a
    /// time so increments landing during the drain are kept for the next
    /// cycle instead of being lost.
    fn drain(&self) -> Vec<(CounterKey, usize)> {
        let keys: Vec<CounterKey> = self.data.iter().map(|r| r.key().clone()).collect();

        let mut updates = Vec::with_capacity(keys.len());
        let mut total_removed = 0;
        for key in keys {
            if let Some((k, v)) = self.data.remove(&key) {
                total_removed += v;
                updates.push((k, v));
            }
        }

        if total_removed > 0 {
            self.total_clicks
                .fetch_update(Ordering::Release, Ordering::Relaxed, |current| {
                    Some(current.saturating_sub(total_removed))
                })
                .ok();
        }

        updates
    }

    /// Put drained updates back after a failed flush.
    fn restore(&self, updates: Vec<(CounterKey, usize)>) {
        let mut restored_total = 0;
        for (k, v) in updates {
            *self.data.entry(k).or_insert(0) += v;
            restored_total += v;
        }
        self.total_clicks
            .fetch_add(restored_total, Ordering::Relaxed);
    }

    fn total(&self) -> usize {
        self.total_clicks.load(Ordering::Relaxed)
    }
}

/// Click counter manager.
///
/// State is fully encapsulated, so tests and multiple instances work without
/// process-global buffers.
#[derive(Clone)]
pub struct ClickCounterManager {
    buffer: Arc<CounterBuffer>,
    sink: Arc<dyn ClickSink>,
    flush_interval: Duration,
    flush_threshold: usize,
}

impl ClickCounterManager {
    pub fn new(sink: Arc<dyn ClickSink>, flush_interval: Duration, flush_threshold: usize) -> Self {
        Self {
            buffer: Arc::new(CounterBuffer::new()),
            sink,
            flush_interval,
            flush_threshold,
        }
    }

    /// Buffer one increment (thread safe, lock free). Crossing the size
    /// threshold schedules an early flush.
    pub fn increment(&self, key: CounterKey) {
        let current_size = self.buffer.increment(key);
        trace!("ClickCounterManager: buffer size {}", current_size);

        if current_size >= self.flush_threshold
            && self
                .buffer
                .flush_pending
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
        {
            let buffer = Arc::clone(&self.buffer);
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                if let Ok(_guard) = buffer.flush_lock.try_lock() {
                    Self::flush_buffer(&buffer, &sink).await;
                } else {
                    trace!("ClickCounterManager: flush already in progress, skipping");
                }
                buffer.flush_pending.store(false, Ordering::Release);
            });
        }
    }

    /// Periodic flush loop; run as a background task for the lifetime of the
    /// server.
    pub async fn start_background_task(&self) {
        loop {
            sleep(self.flush_interval).await;

            debug!("ClickCounterManager: scheduled flush");
            if let Ok(_guard) = self.buffer.flush_lock.try_lock() {
                Self::flush_buffer(&self.buffer, &self.sink).await;
            } else {
                trace!("ClickCounterManager: flush already in progress, skipping scheduled flush");
            }
        }
    }

    /// Flush now, blocking until the batch lands (or fails and is restored).
    pub async fn flush(&self) {
        debug!("ClickCounterManager: manual flush");
        let _guard = self.buffer.flush_lock.lock().await;
        Self::flush_buffer(&self.buffer, &self.sink).await;
    }

    async fn flush_buffer(buffer: &CounterBuffer, sink: &Arc<dyn ClickSink>) {
        let updates = buffer.drain();

        if updates.is_empty() {
            trace!("ClickCounterManager: nothing to flush");
            return;
        }

        let count = updates.len();
        match sink.flush_clicks(updates.clone()).await {
            Ok(_) => {
                debug!("ClickCounterManager: flushed {} entries", count);
            }
            Err(e) => {
                buffer.restore(updates);
                warn!(
                    "ClickCounterManager: flush_clicks failed: {}, {} entries restored to buffer",
                    e, count
                );
            }
        }
    }

    /// Total pending increments (for monitoring and tests).
    pub fn buffer_size(&self) -> usize {
        self.buffer.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MockSink {
        flushed: std::sync::Mutex<Vec<(CounterKey, usize)>>,
        fail: AtomicBool,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                flushed: std::sync::Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            }
        }

        fn get_flushed(&self) -> Vec<(CounterKey, usize)> {
            self.flushed.lock().unwrap().clone()
        }

        fn total_clicks(&self) -> usize {
            self.flushed.lock().unwrap().iter().map(|(_, v)| v).sum()
        }
    }

    #[async_trait]
    impl ClickSink for MockSink {
        async fn flush_clicks(&self, updates: Vec<(CounterKey, usize)>) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("sink unavailable");
            }
            self.flushed.lock().unwrap().extend(updates);
            Ok(())
        }
    }

    fn link_key(id: &str) -> CounterKey {
        CounterKey::Link(id.to_string())
    }

    #[tokio::test]
    async fn test_increment_and_flush() {
        let sink = Arc::new(MockSink::new());
        let manager = ClickCounterManager::new(
            Arc::clone(&sink) as Arc<dyn ClickSink>,
            Duration::from_secs(60),
            100,
        );

        manager.increment(link_key("l1"));
        manager.increment(link_key("l1"));
        manager.increment(CounterKey::Campaign("c1".to_string()));

        // buffer_size() counts total increments, not unique keys
        assert_eq!(manager.buffer_size(), 3);

        manager.flush().await;

        assert_eq!(manager.buffer_size(), 0);
        let flushed = sink.get_flushed();
        assert_eq!(flushed.len(), 2);
        assert!(flushed.contains(&(link_key("l1"), 2)));
        assert!(flushed.contains(&(CounterKey::Campaign("c1".to_string()), 1)));
    }

    #[tokio::test]
    async fn test_failed_flush_restores_buffer() {
        let sink = Arc::new(MockSink::new());
        let manager = ClickCounterManager::new(
            Arc::clone(&sink) as Arc<dyn ClickSink>,
            Duration::from_secs(60),
            100,
        );

        manager.increment(link_key("l1"));
        sink.fail.store(true, Ordering::SeqCst);
        manager.flush().await;

        // nothing landed, increment retained for the next cycle
        assert_eq!(sink.total_clicks(), 0);
        assert_eq!(manager.buffer_size(), 1);

        sink.fail.store(false, Ordering::SeqCst);
        manager.flush().await;
        assert_eq!(sink.total_clicks(), 1);
        assert_eq!(manager.buffer_size(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_increment() {
        let sink = Arc::new(MockSink::new());
        let manager = Arc::new(ClickCounterManager::new(
            Arc::clone(&sink) as Arc<dyn ClickSink>,
            Duration::from_secs(60),
            usize::MAX,
        ));

        const NUM_TASKS: usize = 10;
        const INCREMENTS_PER_TASK: usize = 1000;

        let mut handles = vec![];
        for _ in 0..NUM_TASKS {
            let mgr = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                for _ in 0..INCREMENTS_PER_TASK {
                    mgr.increment(link_key("shared"));
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.buffer_size(), NUM_TASKS * INCREMENTS_PER_TASK);

        manager.flush().await;

        assert_eq!(sink.total_clicks(), NUM_TASKS * INCREMENTS_PER_TASK);
    }

    #[tokio::test]
    async fn test_concurrent_increment_and_drain() {
        let sink = Arc::new(MockSink::new());
        let manager = Arc::new(ClickCounterManager::new(
            Arc::clone(&sink) as Arc<dyn ClickSink>,
            Duration::from_secs(60),
            usize::MAX,
        ));

        const NUM_TASKS: usize = 8;
        const INCREMENTS_PER_TASK: usize = 500;
        const NUM_FLUSHES: usize = 5;

        let mut handles = vec![];
        for _ in 0..NUM_TASKS {
            let mgr = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                for i in 0..INCREMENTS_PER_TASK {
                    mgr.increment(link_key("shared"));
                    if i % 64 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }

        let mgr_flush = Arc::clone(&manager);
        let flush_handle = tokio::spawn(async move {
            for _ in 0..NUM_FLUSHES {
                tokio::time::sleep(Duration::from_millis(10)).await;
                mgr_flush.flush().await;
            }
        });

        for handle in handles {
            handle.await.unwrap();
        }
        flush_handle.await.unwrap();

        manager.flush().await;

        let flushed = sink.total_clicks();
        let remaining = manager.buffer_size();
        assert_eq!(
            flushed + remaining,
            NUM_TASKS * INCREMENTS_PER_TASK,
            "flushed={}, remaining={}",
            flushed,
            remaining
        );
    }
}
