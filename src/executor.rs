//! Executors that run resource construction on behalf of the pool
//!
//! A pool without an executor builds resources inline on the thread that
//! runs the maintenance pass. Configuring an executor moves construction
//! to the background so `take()` callers only wait on the queue.

use crate::errors::{PoolError, PoolResult};

use crossbeam::channel::{self, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

/// A unit of work submitted to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Capability to run construction tasks.
///
/// # Examples
///
/// ```
/// use warmpool::{Executor, InlineExecutor};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let ran = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&ran);
/// InlineExecutor.execute(Box::new(move || flag.store(true, Ordering::SeqCst))).unwrap();
/// assert!(ran.load(Ordering::SeqCst));
/// ```
pub trait Executor: Send + Sync {
    /// Submit a task. An error means the task was rejected and will never run.
    fn execute(&self, task: Task) -> PoolResult<()>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, task: Task) -> PoolResult<()> {
        (**self).execute(task)
    }
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) -> PoolResult<()> {
        task();
        Ok(())
    }
}

/// Fixed-size pool of worker threads fed through a channel.
///
/// A panicking task is logged and the worker moves on to the next one.
/// Workers exit once every handle to the pool has been dropped and the
/// queued tasks have drained.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    sender: Sender<Task>,
    workers: usize,
}

impl WorkerPool {
    /// Spawn `workers` threads (at least one).
    pub fn new(workers: usize) -> PoolResult<Self> {
        let workers = workers.max(1);
        let (sender, receiver) = channel::unbounded::<Task>();

        for index in 0..workers {
            let receiver = receiver.clone();
            thread::Builder::new()
                .name(format!("warmpool-worker-{index}"))
                .spawn(move || {
                    for task in receiver.iter() {
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                            error!(worker = index, panic = panic_message(&*payload), "Pool task panicked");
                        }
                    }
                    debug!(worker = index, "Worker exiting");
                })
                .map_err(|e| {
                    error!(error = %e, "Failed to spawn pool worker");
                    PoolError::ExecutorUnavailable(e.to_string())
                })?;
        }

        Ok(Self { sender, workers })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Executor for WorkerPool {
    fn execute(&self, task: Task) -> PoolResult<()> {
        self.sender.send(task).map_err(|_| PoolError::Cancelled)
    }
}

/// Runs tasks on tokio's blocking thread pool.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Bind to an explicit runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is running on.
    pub fn current() -> PoolResult<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| PoolError::ExecutorUnavailable(e.to_string()))
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) -> PoolResult<()> {
        drop(self.handle.spawn_blocking(task));
        Ok(())
    }
}
