use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::error;

/// Fixed number of workers pulling from a shared queue.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` over every item with at most `workers` in flight.
    ///
    /// Results arrive in completion order. The receiver closes once every
    /// worker has drained the queue, which is the join barrier for callers.
    /// An item whose future panics yields no result.
    pub fn spawn_map<T, R, F, Fut>(&self, items: Vec<T>, f: F) -> mpsc::Receiver<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let workers = self.workers.min(items.len()).max(1);
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let f = Arc::new(f);

        // Each worker sends from its own clone; rx closes when the last one exits.
        let (tx, rx) = mpsc::channel::<R>(workers * 2);

        for id in 0..workers {
            let queue = Arc::clone(&queue);
            let f = Arc::clone(&f);
            let tx = tx.clone();

            tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(item) = next else { break };
                    // A panicking item is dropped; the worker moves on to the next one.
                    match tokio::spawn(f(item)).await {
                        Ok(result) => {
                            if tx.send(result).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => error!("Worker {} lost an item: {}", id, e),
                    }
                }
            });
        }

        rx
    }

    /// Run `f` over every item and wait for all of them.
    pub async fn map<T, R, F, Fut>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let capacity = items.len();
        let mut rx = self.spawn_map(items, f);
        let mut results = Vec::with_capacity(capacity);
        while let Some(r) = rx.recv().await {
            results.push(r);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn maps_every_item() {
        let pool = WorkerPool::new(4);
        let mut out = pool.map((0..50).collect(), |n: u32| async move { n * 2 }).await;
        out.sort_unstable();
        assert_eq!(out, (0..50).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn respects_worker_limit() {
        let pool = WorkerPool::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let done = pool
            .map((0..20).collect::<Vec<u32>>(), move |_| {
                let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(done.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn empty_input_closes_immediately() {
        let pool = WorkerPool::new(2);
        let out: Vec<u8> = pool.map(Vec::<u8>::new(), |n| async move { n }).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn panicking_item_does_not_hang_barrier() {
        let pool = WorkerPool::new(2);
        let out = pool
            .map((0..6).collect::<Vec<u32>>(), |n| async move {
                if n == 3 {
                    panic!("boom");
                }
                n
            })
            .await;
        assert_eq!(out.len(), 5);
    }

    #[tokio::test]
    async fn single_worker_survives_panic() {
        let pool = WorkerPool::new(1);
        let mut out = pool
            .map((0..4).collect::<Vec<u32>>(), |n| async move {
                if n == 1 {
                    panic!("boom");
                }
                n
            })
            .await;
        out.sort_unstable();
        assert_eq!(out, vec![0, 2, 3]);
    }

    #[test]
    fn zero_workers_clamped() {
        assert_eq!(WorkerPool::new(0).workers(), 1);
    }
}
