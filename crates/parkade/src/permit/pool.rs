//! Admission pool: the counting resource bounding how many vehicles are inside.
//!
//! Tokens travel through a bounded channel sized to the facility capacity.
//! The pool starts empty and is filled with `add_token` when the facility opens.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};

/// One unit of admission. Not cloneable: the only way to get one is from the pool.
#[must_use = "admission tokens must be returned to the pool"]
#[derive(Debug)]
pub struct AdmissionToken {
    _private: (),
}

/// Pool of admission tokens.
pub struct AdmissionPool {
    available_rx: Mutex<mpsc::Receiver<()>>,
    available_tx: mpsc::Sender<()>,
    capacity: usize,
    available_count: AtomicUsize,
}

impl AdmissionPool {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        Self {
            available_rx: Mutex::new(rx),
            available_tx: tx,
            capacity,
            available_count: AtomicUsize::new(0),
        }
    }

    /// Add a fresh token. Returns `false` if the pool is already full.
    pub fn add_token(&self) -> bool {
        // Count first so a concurrent receiver never decrements below zero.
        self.available_count.fetch_add(1, Ordering::AcqRel);
        if let Err(e) = self.available_tx.try_send(()) {
            self.available_count.fetch_sub(1, Ordering::AcqRel);
            tracing::error!(error = %e, "Failed to add admission token to pool");
            false
        } else {
            true
        }
    }

    /// Return a token taken by `acquire`/`try_acquire`.
    pub fn release(&self, _token: AdmissionToken) {
        if self.add_token() {
            tracing::trace!(available = self.available(), "Admission token returned");
        }
    }

    #[cfg(test)]
    pub(crate) fn try_acquire(&self) -> Option<AdmissionToken> {
        let mut rx = self.available_rx.try_lock().ok()?;
        rx.try_recv().ok()?;
        self.available_count.fetch_sub(1, Ordering::Release);
        Some(AdmissionToken { _private: () })
    }

    /// Wait for a token. Returns `None` only if the channel closed, which
    /// cannot happen while the pool itself is alive.
    pub async fn acquire(&self) -> Option<AdmissionToken> {
        let mut rx = self.available_rx.lock().await;
        rx.recv().await?;
        self.available_count.fetch_sub(1, Ordering::Release);
        Some(AdmissionToken { _private: () })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.available_count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn pool_starts_empty() {
        let pool = AdmissionPool::new(3);
        assert_eq!(pool.available(), 0);
        assert!(pool.try_acquire().is_none());
    }

    #[tokio::test]
    async fn pool_add_and_acquire() {
        let pool = AdmissionPool::new(2);

        assert!(pool.add_token());
        assert!(pool.add_token());
        assert_eq!(pool.available(), 2);

        let t1 = pool.try_acquire();
        assert!(t1.is_some());

        let t2 = pool.try_acquire();
        assert!(t2.is_some());

        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.available(), 0);

        pool.release(t1.unwrap());
        pool.release(t2.unwrap());
    }

    #[tokio::test]
    async fn pool_rejects_overfill() {
        let pool = AdmissionPool::new(1);
        assert!(pool.add_token());
        assert!(!pool.add_token());
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn released_token_can_be_reacquired() {
        let pool = AdmissionPool::new(1);
        pool.add_token();

        let token = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());

        pool.release(token);
        assert_eq!(pool.available(), 1);
        assert!(pool.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_release() {
        let pool = Arc::new(AdmissionPool::new(1));
        pool.add_token();
        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.acquire().await.is_some() })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!waiter.is_finished());

        pool.release(held);
        assert!(waiter.await.unwrap());
    }
}
