//! Maintenance pass: expire abandoned checkouts and build new resources

use crate::errors::PoolError;
use crate::executor::{Executor, InlineExecutor, panic_message};
use crate::metrics::MetricsTracker;
use crate::pool::Shared;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, trace};

impl<T: Send + 'static> Shared<T> {
    /// Build the warm minimum in the background right after creation.
    ///
    /// Only applies with an executor; inline pools build on first use.
    pub(crate) fn warm_up(self: &Arc<Self>) {
        let Some(executor) = self.executor.clone() else {
            return;
        };
        if self.min > 0 {
            debug!(min = self.min, "Warming up pool");
        }
        for _ in 0..self.min {
            if !self.ledger.try_reserve(self.max) {
                break;
            }
            self.submit(&executor, false);
        }
    }

    /// Sweep expired checkouts, then decide how many resources to build.
    ///
    /// Only one thread runs this at a time. Without an executor the build
    /// happens right here, so other callers wait for it.
    pub(crate) fn maintain(self: &Arc<Self>) {
        let _guard = self.maintenance.lock();

        let swept = self.ledger.sweep_expired(Instant::now());
        if swept > 0 {
            MetricsTracker::record(&self.metrics.expired, swept);
            debug!(swept, total = self.ledger.total(), "Released expired checkouts");
        }

        match &self.executor {
            None => {
                if self.ledger.try_reserve(self.max) {
                    self.submit(&InlineExecutor, true);
                }
            }
            Some(executor) if self.min == 0 => {
                if self.ledger.try_reserve(self.max) {
                    self.submit(executor, false);
                }
            }
            Some(executor) => {
                let target = self.max.map_or(self.min, |max| max.min(self.min));
                let construct = target.saturating_sub(self.queue.len());
                debug!(construct, total = self.ledger.total(), "Replenishing warm minimum");
                for _ in 0..construct {
                    if !self.ledger.try_reserve(self.max) {
                        break;
                    }
                    self.submit(executor, false);
                }
            }
        }
    }

    /// Run one construction on `executor`; the slot must already be reserved.
    ///
    /// With `inline` set a factory panic propagates to the caller once the
    /// slot is released; on a background executor it is only logged.
    fn submit<E: Executor + ?Sized>(self: &Arc<Self>, executor: &E, inline: bool) {
        let shared = Arc::clone(self);
        if let Err(err) = executor.execute(Box::new(move || shared.build_one(inline))) {
            self.ledger.release_slot();
            error!(error = %err, "Construction task rejected by executor");
        }
    }

    fn build_one(&self, resume_panic: bool) {
        trace!("Adding resource to pool");
        match panic::catch_unwind(AssertUnwindSafe(|| (self.factory)())) {
            Ok(Ok(value)) => {
                let id = self.ledger.next_id();
                MetricsTracker::record(&self.metrics.created, 1);
                let available = self.queue.push_front(id, value);
                trace!(id, available, "Resource added");
            }
            Ok(Err(err)) => {
                self.construction_failed();
                error!(
                    error = %PoolError::construction(&err),
                    total = self.ledger.total(),
                    "Error adding new resource to pool"
                );
            }
            Err(payload) => {
                self.construction_failed();
                error!(
                    panic = panic_message(&*payload),
                    total = self.ledger.total(),
                    "Resource factory panicked"
                );
                if resume_panic {
                    panic::resume_unwind(payload);
                }
            }
        }
    }

    fn construction_failed(&self) {
        self.ledger.release_slot();
        MetricsTracker::record(&self.metrics.construction_failures, 1);
        *self.last_failure.lock() = Some(Instant::now());
    }
}
