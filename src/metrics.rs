//! Metrics collection and export for object pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use warmpool::ObjectPool;
///
/// let pool = ObjectPool::builder().with_max(2).build(|| Ok::<_, String>(7)).unwrap();
///
/// {
///     let _obj = pool.take();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_taken, 1);
///     assert_eq!(metrics.checked_out, 1);
///     assert_eq!(metrics.created, 1);
/// }
/// assert_eq!(pool.get_metrics().total_returned, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Checkouts handed to callers
    pub total_taken: usize,

    /// Checkouts that came back while still on the ledger
    pub total_returned: usize,

    /// Resources successfully produced by the factory
    pub created: usize,

    /// Factory calls that failed
    pub construction_failures: usize,

    /// Resources dropped because the validator rejected them
    pub validation_failures: usize,

    /// Checkouts dropped from the ledger after their ttl ran out
    pub expired: usize,

    /// Available resources dropped to stay within max
    pub evicted: usize,

    /// Late returns of expired checkouts that were taken back in
    pub readmitted: usize,

    /// Resources that exist or are being built
    pub total: usize,

    /// Resources ready in the queue
    pub available: usize,

    /// Resources currently checked out
    pub checked_out: usize,

    /// Configured upper bound, if any
    pub max: Option<usize>,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_taken".to_string(), self.total_taken.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("created".to_string(), self.created.to_string());
        metrics.insert("construction_failures".to_string(), self.construction_failures.to_string());
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("expired".to_string(), self.expired.to_string());
        metrics.insert("evicted".to_string(), self.evicted.to_string());
        metrics.insert("readmitted".to_string(), self.readmitted.to_string());
        metrics.insert("total".to_string(), self.total.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("checked_out".to_string(), self.checked_out.to_string());
        metrics.insert(
            "max".to_string(),
            self.max.map_or_else(|| "unbounded".to_string(), |max| max.to_string()),
        );
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use warmpool::{MetricsExporter, ObjectPool};
    /// use std::collections::HashMap;
    ///
    /// let pool = ObjectPool::builder().build(|| Ok::<_, String>(1)).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "search".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&pool.get_metrics(), "formatters", Some(&tags)).unwrap();
    /// assert!(output.contains("warmpool_resources_total"));
    /// assert!(output.contains("service=\"search\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> crate::errors::PoolResult<String> {
        use prometheus::{Encoder, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = tags.cloned().unwrap_or_default();
        labels.insert("pool".to_string(), pool_name.to_string());

        let registry = Registry::new();
        let register = |name: &str, help: &str, value: usize| -> prometheus::Result<()> {
            let gauge = IntGauge::with_opts(Opts::new(name, help).const_labels(labels.clone()))?;
            gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
            registry.register(Box::new(gauge))
        };

        let export = || -> prometheus::Result<String> {
            register("warmpool_resources_total", "Resources that exist or are being built", metrics.total)?;
            register("warmpool_resources_available", "Resources ready in the queue", metrics.available)?;
            register("warmpool_resources_checked_out", "Resources currently checked out", metrics.checked_out)?;
            register("warmpool_taken_total", "Checkouts handed out", metrics.total_taken)?;
            register("warmpool_returned_total", "Checkouts returned", metrics.total_returned)?;
            register("warmpool_created_total", "Resources built", metrics.created)?;
            register("warmpool_construction_failures_total", "Factory failures", metrics.construction_failures)?;
            register("warmpool_validation_failures_total", "Validation failures", metrics.validation_failures)?;
            register("warmpool_expired_total", "Checkouts expired by ttl", metrics.expired)?;
            register("warmpool_evicted_total", "Available resources evicted over max", metrics.evicted)?;
            register("warmpool_readmitted_total", "Expired checkouts taken back in", metrics.readmitted)?;

            let mut buffer = Vec::new();
            TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
            String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
        };

        export().map_err(|e| crate::errors::PoolError::MetricsExport(e.to_string()))
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub total_taken: AtomicUsize,
    pub total_returned: AtomicUsize,
    pub created: AtomicUsize,
    pub construction_failures: AtomicUsize,
    pub validation_failures: AtomicUsize,
    pub expired: AtomicUsize,
    pub evicted: AtomicUsize,
    pub readmitted: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(counter: &AtomicUsize, amount: usize) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn get_metrics(
        &self,
        total: usize,
        available: usize,
        checked_out: usize,
        max: Option<usize>,
    ) -> PoolMetrics {
        PoolMetrics {
            total_taken: self.total_taken.load(Ordering::Relaxed),
            total_returned: self.total_returned.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            readmitted: self.readmitted.load(Ordering::Relaxed),
            total,
            available,
            checked_out,
            max,
        }
    }
}
