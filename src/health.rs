//! Health monitoring for object pools

use crate::metrics::PoolMetrics;
use std::time::Duration;

/// Health status of an object pool
///
/// # Examples
///
/// ```
/// use warmpool::ObjectPool;
///
/// let pool = ObjectPool::builder().with_max(3).build(|| Ok::<_, String>(1)).unwrap();
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.total, 0);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Share of the configured max that is checked out (0.0 when unbounded)
    pub utilization: f64,

    /// Resources ready in the queue
    pub available: usize,

    /// Resources currently checked out
    pub checked_out: usize,

    /// Resources that exist or are being built
    pub total: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Derive a status from a metrics snapshot and the configured warm minimum.
    ///
    /// `recent_failure` is the age of the latest factory failure, if it is
    /// recent enough to count against the pool.
    pub fn new(metrics: &PoolMetrics, min: usize, recent_failure: Option<Duration>) -> Self {
        let utilization = match metrics.max {
            Some(max) if max > 0 => metrics.checked_out as f64 / max as f64,
            _ => 0.0,
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if let Some(max) = metrics.max
            && metrics.total >= max
            && metrics.available == 0
        {
            warnings.push(format!("Pool saturated: all {max} resources in use"));
            is_healthy = false;
        }

        if let Some(age) = recent_failure {
            warnings.push(format!(
                "Resource construction failed {}ms ago ({} failure(s) in total)",
                age.as_millis(),
                metrics.construction_failures
            ));
            is_healthy = false;
        }

        if metrics.available < min {
            warnings.push(format!(
                "Below warm minimum: {} available, {} wanted",
                metrics.available, min
            ));
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            available: metrics.available,
            checked_out: metrics.checked_out,
            total: metrics.total,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
