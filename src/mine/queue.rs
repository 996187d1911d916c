//! Bounded FIFO work queue with outstanding-work tracking.
//!
//! The queue is shared between producers (the engine, fan-out handlers) and
//! the workers of one pool. Drain detection uses an explicit outstanding-work
//! counter: every [`WorkQueue::push`] increments it, every
//! [`WorkQueue::task_done`] decrements it, and [`WorkQueue::join`] suspends
//! until it reaches zero. Because a fan-out handler pushes its follow-up work
//! *before* the worker marks the triggering item done, the counter can never
//! drop to zero while follow-up work is still being injected — there is no
//! join-then-poll race.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ia_miner::mine::{MineRequest, ResponseHandler, WorkQueue};
//!
//! # async fn example() {
//! let queue = Arc::new(WorkQueue::new(1000));
//! let request = MineRequest::get(
//!     "http://archive.org/metadata/nasa",
//!     Vec::new(),
//!     10,
//!     false,
//!     ResponseHandler::PrintBody,
//! );
//! queue.push(request).await;
//!
//! // A worker drains the queue:
//! if let Some(item) = queue.pop().await {
//!     // ... execute the request ...
//!     queue.task_done();
//! }
//!
//! // The producer awaits full drain:
//! queue.join().await;
//! queue.close();
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::debug;

use super::request::MineRequest;

/// State shared between producers and workers. Guarded by a synchronous
/// mutex; it is never held across an await point.
#[derive(Debug)]
struct QueueState {
    items: VecDeque<MineRequest>,
    /// Items pushed but not yet marked done (queued + in flight).
    outstanding: usize,
    closed: bool,
}

/// A bounded FIFO queue of pending [`MineRequest`]s.
///
/// - [`push`](Self::push) suspends while the queue is at capacity
///   (backpressure on the producer).
/// - [`pop`](Self::pop) suspends while the queue is empty, and returns
///   `None` once the queue is closed and drained of items — the worker
///   shutdown signal.
/// - [`join`](Self::join) suspends until every pushed item has been marked
///   done via [`task_done`](Self::task_done).
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    /// Signalled when an item is pushed or the queue is closed.
    ready: Notify,
    /// Signalled when an item is popped, freeing capacity.
    space: Notify,
    /// Signalled when the outstanding count reaches zero.
    drained: Notify,
}

impl WorkQueue {
    /// Creates a queue holding at most `capacity` pending items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                outstanding: 0,
                closed: false,
            }),
            capacity,
            ready: Notify::new(),
            space: Notify::new(),
            drained: Notify::new(),
        }
    }

    /// Appends a request, suspending while the queue is at capacity.
    ///
    /// Increments the outstanding-work count; the matching decrement is the
    /// worker's [`task_done`](Self::task_done) call after the request reaches
    /// its terminal outcome.
    pub async fn push(&self, request: MineRequest) {
        loop {
            // Register for a wakeup before checking, so a pop between the
            // check and the await cannot be missed.
            let space = self.space.notified();
            {
                let mut state = self.lock();
                if state.items.len() < self.capacity {
                    state.items.push_back(request);
                    state.outstanding += 1;
                    drop(state);
                    self.ready.notify_one();
                    return;
                }
            }
            space.await;
        }
    }

    /// Removes the oldest pending request, suspending while the queue is
    /// empty. Returns `None` once the queue is closed and empty.
    pub async fn pop(&self) -> Option<MineRequest> {
        loop {
            let ready = self.ready.notified();
            {
                let mut state = self.lock();
                if let Some(request) = state.items.pop_front() {
                    drop(state);
                    self.space.notify_one();
                    return Some(request);
                }
                if state.closed {
                    return None;
                }
            }
            ready.await;
        }
    }

    /// Marks one previously popped request complete. Must be called exactly
    /// once per popped item, after its handler has run (so follow-up work
    /// injected by the handler is already counted).
    pub fn task_done(&self) {
        let mut state = self.lock();
        debug_assert!(state.outstanding > 0, "task_done without matching push");
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 {
            drop(state);
            self.drained.notify_waiters();
        }
    }

    /// Suspends until every pushed item has been marked done. Items pushed
    /// while waiting (e.g. by fan-out handlers) extend the wait.
    pub async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            if self.lock().outstanding == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Closes the queue. Idle workers observe the closure at the dequeue
    /// suspension point and shut down; in-flight requests are unaffected.
    pub fn close(&self) {
        self.lock().closed = true;
        debug!("work queue closed");
        self.ready.notify_waiters();
    }

    /// Number of queued (not yet popped) requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether no requests are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Number of pushed items not yet marked done (queued + in flight).
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    #[allow(clippy::unwrap_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // The mutex is only poisoned if a holder panicked; propagate that.
        self.state.lock().unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::mine::ResponseHandler;

    fn request(url: &str) -> MineRequest {
        MineRequest::get(url, Vec::new(), 0, false, ResponseHandler::PrintBody)
    }

    #[tokio::test]
    async fn test_pop_is_fifo() {
        let queue = WorkQueue::new(10);
        queue.push(request("http://a")).await;
        queue.push(request("http://b")).await;
        queue.push(request("http://c")).await;

        assert_eq!(queue.pop().await.unwrap().url(), "http://a");
        assert_eq!(queue.pop().await.unwrap().url(), "http://b");
        assert_eq!(queue.pop().await.unwrap().url(), "http://c");
    }

    #[tokio::test]
    async fn test_pop_returns_none_after_close_and_drain() {
        let queue = WorkQueue::new(10);
        queue.push(request("http://a")).await;
        queue.close();

        // The queued item is still delivered before shutdown.
        assert!(queue.pop().await.is_some());
        assert!(queue.pop().await.is_none());
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_pop_suspends_until_push() {
        let queue = Arc::new(WorkQueue::new(10));

        let popper = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::task::yield_now().await;
        queue.push(request("http://late")).await;

        let popped = popper.await.unwrap();
        assert_eq!(popped.unwrap().url(), "http://late");
    }

    #[tokio::test]
    async fn test_push_backpressure_at_capacity() {
        tokio::time::pause();
        let queue = Arc::new(WorkQueue::new(1));
        queue.push(request("http://a")).await;

        let blocked = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue.push(request("http://b")).await;
            })
        };

        // The second push cannot complete while the queue is full.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());
        assert_eq!(queue.len(), 1);

        // Popping frees capacity and unblocks the producer.
        let first = queue.pop().await.unwrap();
        assert_eq!(first.url(), "http://a");
        blocked.await.unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_join_returns_immediately_when_nothing_outstanding() {
        tokio_test::block_on(async {
            let queue = WorkQueue::new(10);
            queue.join().await;
        });
    }

    #[tokio::test]
    async fn test_join_waits_for_task_done() {
        let queue = Arc::new(WorkQueue::new(10));
        queue.push(request("http://a")).await;
        let item = queue.pop().await.unwrap();
        assert_eq!(item.url(), "http://a");

        let joiner = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.join().await })
        };
        tokio::task::yield_now().await;
        assert!(!joiner.is_finished());

        queue.task_done();
        joiner.await.unwrap();
    }

    #[tokio::test]
    async fn test_join_counts_work_injected_during_wait() {
        // A handler that injects follow-up work pushes before task_done,
        // so the outstanding count never dips to zero early.
        let queue = Arc::new(WorkQueue::new(10));
        queue.push(request("http://page")).await;

        let worker = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                let page = queue.pop().await.unwrap();
                assert_eq!(page.url(), "http://page");
                // Fan-out: inject before marking the page done.
                queue.push(request("http://item")).await;
                queue.task_done();

                let item = queue.pop().await.unwrap();
                assert_eq!(item.url(), "http://item");
                queue.task_done();
            })
        };

        queue.join().await;
        assert_eq!(queue.outstanding(), 0);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_outstanding_tracks_queued_and_in_flight() {
        let queue = WorkQueue::new(10);
        queue.push(request("http://a")).await;
        queue.push(request("http://b")).await;
        assert_eq!(queue.outstanding(), 2);
        assert_eq!(queue.len(), 2);

        let _ = queue.pop().await.unwrap();
        // Popped but not done: still outstanding.
        assert_eq!(queue.outstanding(), 2);
        assert_eq!(queue.len(), 1);

        queue.task_done();
        assert_eq!(queue.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_close_wakes_all_idle_workers() {
        let queue = Arc::new(WorkQueue::new(10));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.pop().await })
            })
            .collect();

        tokio::task::yield_now().await;
        queue.close();

        for worker in workers {
            assert!(worker.await.unwrap().is_none());
        }
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn test_zero_capacity_rejected() {
        let _ = WorkQueue::new(0);
    }
}
