//! Concurrency limiter: at most N task bodies execute at once.
//!
//! Submissions go into an unbounded FIFO channel. A single dispatcher task
//! pops them in order, waits for a semaphore permit, and spawns the body
//! together with a [`SlotGuard`] owning that permit. Queued work therefore
//! starts in submission order, and a slot is returned on every exit path of
//! the body, panics included.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};

use super::guard::SlotGuard;

type Body = Pin<Box<dyn Future<Output = ()> + Send>>;
type Job = Box<dyn FnOnce(SlotGuard) -> Body + Send>;

/// A submitted task did not deliver a result: its body panicked, or the
/// runtime shut down before it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterError;

impl fmt::Display for LimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked or was dropped before completing")
    }
}

impl std::error::Error for LimiterError {}

/// Resolves when the submitted task's body has finished.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Wait for the task. The limiter never inspects `T`; task-level errors are the caller's.
    pub async fn wait(self) -> Result<T, LimiterError> {
        self.rx.await.map_err(|_| LimiterError)
    }
}

/// Reusable gate admitting at most `capacity` concurrent task bodies.
pub struct ConcurrencyLimiter {
    capacity: usize,
    running: Arc<AtomicUsize>,
    queue: mpsc::UnboundedSender<Job>,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots (clamped to at least 1).
    ///
    /// Spawns the dispatcher, so this must be called from within a tokio runtime.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let semaphore = Arc::new(Semaphore::new(capacity));
        let running = Arc::new(AtomicUsize::new(0));
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(rx, semaphore, Arc::clone(&running)));
        Self {
            capacity,
            running,
            queue,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of task bodies executing right now.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Queue `task` behind every earlier submission. Never blocks.
    pub fn submit<F>(&self, task: F) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |guard: SlotGuard| -> Body {
            Box::pin(async move {
                let out = task.await;
                // Free the slot before the handle resolves.
                drop(guard);
                let _ = tx.send(out);
            })
        });
        if self.queue.send(job).is_err() {
            // Dispatcher is gone (runtime shutting down); the dropped sender
            // makes the handle resolve to LimiterError.
            tracing::warn!("limiter dispatcher stopped; task dropped");
        }
        TaskHandle { rx }
    }
}

impl fmt::Debug for ConcurrencyLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyLimiter")
            .field("capacity", &self.capacity)
            .field("running", &self.running())
            .finish()
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<Job>,
    semaphore: Arc<Semaphore>,
    running: Arc<AtomicUsize>,
) {
    while let Some(job) = rx.recv().await {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let guard = SlotGuard::new(permit, Arc::clone(&running));
        tokio::spawn(job(guard));
    }
    tracing::trace!("limiter dispatcher finished");
}
