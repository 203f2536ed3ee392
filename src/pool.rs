//! Core object pool implementation

use crate::config::{Factory, PoolConfiguration, Validator};
use crate::errors::{PoolError, PoolResult};
use crate::executor::Executor;
use crate::handle::Checkout;
use crate::health::HealthStatus;
use crate::ledger::{Ledger, ResourceId};
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::queue::AvailabilityQueue;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, trace};

/// State shared between the pool handles, checkouts and construction tasks.
pub(crate) struct Shared<T> {
    pub(crate) queue: AvailabilityQueue<T>,
    pub(crate) ledger: Ledger,
    pub(crate) metrics: MetricsTracker,
    pub(crate) factory: Factory<T>,
    pub(crate) validator: Validator<T>,
    pub(crate) executor: Option<Arc<dyn Executor>>,
    /// Serializes maintenance passes.
    pub(crate) maintenance: Mutex<()>,
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
    pub(crate) time_to_live: Duration,
    pub(crate) poll_interval: Duration,
    /// When the factory last failed or panicked.
    pub(crate) last_failure: Mutex<Option<Instant>>,
}

impl<T: Send + 'static> Shared<T> {
    /// Hand a popped resource to the caller if it validates.
    fn admit(self: &Arc<Self>, id: ResourceId, value: T) -> Option<Checkout<T>> {
        if !(self.validator)(&value) {
            MetricsTracker::record(&self.metrics.validation_failures, 1);
            trace!(id, "Resource didn't validate");
            return None;
        }

        self.ledger.check_out(id, Instant::now() + self.time_to_live);
        MetricsTracker::record(&self.metrics.total_taken, 1);
        trace!(id, total = self.ledger.total(), "Resource checked out");
        Some(Checkout::new(id, value, Arc::clone(self)))
    }

    /// One `take()` iteration: maintain if running low, then wait up to `wait`.
    fn attempt(self: &Arc<Self>, wait: Duration) -> Option<Checkout<T>> {
        if self.queue.len() <= self.min {
            self.maintain();
        }
        let (id, value) = self.queue.pop_front_timeout(wait)?;
        self.admit(id, value)
    }

    pub(crate) fn return_element(&self, id: ResourceId, value: T) {
        if self.ledger.check_in(id) {
            let available = self.queue.push_front(id, value);
            MetricsTracker::record(&self.metrics.total_returned, 1);
            trace!(id, available, "Resource returned");

            if let Some(max) = self.max
                && available > max
            {
                for (evicted, _) in self.queue.trim_to(max) {
                    self.ledger.release_slot();
                    MetricsTracker::record(&self.metrics.evicted, 1);
                    trace!(id = evicted, "Removed extra resource");
                }
            }
        } else if self.ledger.try_reserve(self.max) {
            self.queue.push_front(id, value);
            MetricsTracker::record(&self.metrics.readmitted, 1);
            trace!(id, "Kept resource returned after expiry");
        } else {
            trace!(id, "Resource returned after expiry, dropped");
        }
    }
}

/// Thread-safe pool of lazily built resources
///
/// Cloning is cheap; every clone refers to the same pool.
///
/// # Examples
///
/// ```
/// use warmpool::ObjectPool;
/// use std::time::Duration;
///
/// let pool = ObjectPool::builder()
///     .with_max(2)
///     .with_ttl(Duration::from_secs(5))
///     .build(|| Ok::<_, std::io::Error>(Vec::<u8>::with_capacity(1024)))
///     .unwrap();
///
/// {
///     let mut buffer = pool.take();
///     buffer.extend_from_slice(b"hello");
/// }
///
/// assert_eq!(pool.size(), 1);
/// assert_eq!(pool.available_count(), 1);
/// ```
pub struct ObjectPool<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("min", &self.shared.min)
            .field("max", &self.shared.max)
            .field("time_to_live", &self.shared.time_to_live)
            .field("size", &self.size())
            .field("available", &self.available_count())
            .finish()
    }
}

impl ObjectPool<()> {
    /// Start configuring a pool; the resource type comes from the factory
    /// given to [`PoolConfiguration::build`].
    pub fn builder() -> PoolConfiguration {
        PoolConfiguration::new()
    }
}

impl<T: Send + 'static> ObjectPool<T> {
    pub(crate) fn from_parts(config: PoolConfiguration, factory: Factory<T>, validator: Validator<T>) -> Self {
        info!(
            min = config.min,
            max = ?config.max,
            ttl_ms = config.time_to_live.as_millis() as u64,
            background = config.executor.is_some(),
            "Creating pool"
        );

        let shared = Arc::new(Shared {
            queue: AvailabilityQueue::new(),
            ledger: Ledger::new(),
            metrics: MetricsTracker::new(),
            factory,
            validator,
            poll_interval: config.poll_interval(),
            executor: config.executor,
            maintenance: Mutex::new(()),
            min: config.min,
            max: config.max,
            time_to_live: config.time_to_live,
            last_failure: Mutex::new(None),
        });
        shared.warm_up();

        Self { shared }
    }

    /// Check out a resource, blocking until one is available and validates.
    ///
    /// Never returns while every resource fails validation; use
    /// [`take_timeout`](Self::take_timeout) to bound the wait.
    pub fn take(&self) -> Checkout<T> {
        trace!(total = self.size(), available = self.available_count(), "take");
        loop {
            if let Some(checkout) = self.shared.attempt(self.shared.poll_interval) {
                return checkout;
            }
        }
    }

    /// Like [`take`](Self::take), giving up with [`PoolError::Timeout`] after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> PoolResult<Checkout<T>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PoolError::Timeout(timeout));
            }
            if let Some(checkout) = self.shared.attempt(remaining.min(self.shared.poll_interval)) {
                return Ok(checkout);
            }
        }
    }

    /// Async counterpart of [`take`](Self::take).
    ///
    /// Dropping the future cancels the wait. A resource is never popped
    /// without being returned from the same poll, so cancellation loses nothing.
    ///
    /// Without a configured executor the maintenance pass runs the factory
    /// on the polling thread while holding the maintenance lock, blocking
    /// that runtime worker. Async callers should configure a
    /// [`TokioExecutor`](crate::TokioExecutor) so construction happens on the
    /// blocking pool:
    ///
    /// ```
    /// # #[tokio::main(flavor = "multi_thread")]
    /// # async fn main() {
    /// use warmpool::{ObjectPool, TokioExecutor};
    ///
    /// let pool = ObjectPool::builder()
    ///     .with_max(4)
    ///     .with_executor(TokioExecutor::current().unwrap())
    ///     .build(|| Ok::<_, std::io::Error>(String::from("session")))
    ///     .unwrap();
    ///
    /// assert_eq!(*pool.take_async().await, "session");
    /// # }
    /// ```
    pub async fn take_async(&self) -> Checkout<T> {
        loop {
            if self.shared.queue.len() <= self.shared.min {
                self.shared.maintain();
            }
            if let Some((id, value)) = self.shared.queue.pop_front_async(self.shared.poll_interval).await
                && let Some(checkout) = self.shared.admit(id, value)
            {
                return checkout;
            }
        }
    }

    /// Like [`take_async`](Self::take_async), giving up with [`PoolError::Timeout`] after `timeout`.
    pub async fn take_async_timeout(&self, timeout: Duration) -> PoolResult<Checkout<T>> {
        tokio::time::timeout(timeout, self.take_async())
            .await
            .map_err(|_| PoolError::Timeout(timeout))
    }

    /// Resources that exist or are being built
    pub fn size(&self) -> usize {
        self.shared.ledger.total()
    }

    /// Resources ready to be taken
    pub fn available_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// Resources currently checked out
    pub fn checked_out_count(&self) -> usize {
        self.shared.ledger.checked_out()
    }

    pub fn min(&self) -> usize {
        self.shared.min
    }

    pub fn max(&self) -> Option<usize> {
        self.shared.max
    }

    pub fn time_to_live(&self) -> Duration {
        self.shared.time_to_live
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.shared.metrics.get_metrics(
            self.size(),
            self.available_count(),
            self.checked_out_count(),
            self.shared.max,
        )
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        crate::metrics::MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    /// Get health status
    ///
    /// A construction failure marks the pool unhealthy for one
    /// `time_to_live` after it happened. Checking does not consume it, so
    /// any number of health checkers see the same answer.
    pub fn get_health_status(&self) -> HealthStatus {
        let metrics = self.get_metrics();
        let last_failure = *self.shared.last_failure.lock();
        let recent_failure = last_failure
            .map(|at| at.elapsed())
            .filter(|age| *age < self.shared.time_to_live);
        HealthStatus::new(&metrics, self.shared.min, recent_failure)
    }
}
