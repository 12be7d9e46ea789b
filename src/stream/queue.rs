//! # Unbounded multi-producer/multi-consumer message queue.
//!
//! [`Queue`] backs the three per-stream channels (inbound records, outbound
//! results, side-channel relay). Clones share the same underlying channel, so
//! any number of tasks may `put` and `get` concurrently without extra locking.
//!
//! ## Rules
//! - `put` never blocks; after [`Queue::close`] it hands the item back.
//! - `get` waits for the next item; after close it drains what is buffered and
//!   then returns `None`.
//! - Consumers are served one at a time (FIFO per queue); a parked `get`
//!   takes precedence over `try_get`.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Cloneable unbounded MPMC queue.
pub struct Queue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    closed: CancellationToken,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    /// Creates an empty, open queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            closed: CancellationToken::new(),
        }
    }

    /// Enqueues an item; returns it back if the queue is closed.
    pub fn put(&self, item: T) -> Result<(), T> {
        if self.closed.is_cancelled() {
            return Err(item);
        }
        self.tx.send(item).map_err(|e| e.0)
    }

    /// Waits for the next item, or `None` once the queue is closed and drained.
    pub async fn get(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        if let Ok(item) = rx.try_recv() {
            return Some(item);
        }
        tokio::select! {
            biased;
            item = rx.recv() => item,
            _ = self.closed.cancelled() => None,
        }
    }

    /// Returns the next buffered item without waiting.
    ///
    /// Returns `None` while another consumer is parked in [`Queue::get`]: that
    /// consumer owns the receive side and takes the next item itself. Use
    /// `get` when every buffered item must be observed.
    pub fn try_get(&self) -> Option<T> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Closes the queue: producers are rejected and idle consumers wake up.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Returns true once [`Queue::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_across_clones() {
        let q = Queue::new();
        let producer = q.clone();
        producer.put(1).unwrap();
        producer.put(2).unwrap();

        assert_eq!(q.get().await, Some(1));
        assert_eq!(q.get().await, Some(2));
        assert_eq!(q.try_get(), None);
    }

    #[tokio::test]
    async fn test_close_rejects_producers_and_drains_buffer() {
        let q = Queue::new();
        q.put("a").unwrap();
        q.close();

        assert!(q.is_closed());
        assert_eq!(q.put("b"), Err("b"));
        assert_eq!(q.get().await, Some("a"));
        assert_eq!(q.get().await, None);
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_consumer() {
        let q: Queue<u8> = Queue::new();
        let consumer = q.clone();
        let waiter = tokio::spawn(async move { consumer.get().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        q.close();

        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("consumer woke up")
            .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_concurrent_producers_deliver_everything() {
        let q = Queue::new();
        let mut handles = Vec::new();
        for p in 0..4u32 {
            let q = q.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25u32 {
                    q.put(p * 100 + i).unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let mut seen = Vec::new();
        while let Some(v) = q.try_get() {
            seen.push(v);
        }
        assert_eq!(seen.len(), 100);
    }

    #[tokio::test]
    async fn test_try_get_yields_to_parked_consumer() {
        let q: Queue<u32> = Queue::new();
        let waiter = {
            let q = q.clone();
            tokio::spawn(async move { q.get().await })
        };
        tokio::task::yield_now().await;

        assert_eq!(q.try_get(), None);
        q.put(5).unwrap();
        assert_eq!(waiter.await.unwrap(), Some(5));
        assert_eq!(q.try_get(), None);
    }
}
