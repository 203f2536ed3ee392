//! Pool configuration options

use crate::errors::{FactoryError, PoolError, PoolResult};
use crate::executor::Executor;
use crate::pool::ObjectPool;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default checkout time-to-live.
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_millis(10_000);

pub(crate) type Factory<T> = Arc<dyn Fn() -> Result<T, FactoryError> + Send + Sync>;
pub(crate) type Validator<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use warmpool::PoolConfiguration;
/// use std::time::Duration;
///
/// let pool = PoolConfiguration::new()
///     .with_min(1)
///     .with_max(4)
///     .with_ttl(Duration::from_secs(30))
///     .build(|| Ok::<_, std::io::Error>(String::from("conn")))
///     .unwrap();
///
/// assert_eq!(pool.max(), Some(4));
/// assert_eq!(pool.min(), 1);
/// ```
#[derive(Clone)]
pub struct PoolConfiguration {
    /// Number of ready resources the pool tries to keep warm
    pub min: usize,

    /// Upper bound on resources that exist or are being built
    pub max: Option<usize>,

    /// How long a checkout may stay outstanding before it is presumed abandoned
    pub time_to_live: Duration,

    /// Background construction; `None` builds inline during maintenance
    pub executor: Option<Arc<dyn Executor>>,
}

impl fmt::Debug for PoolConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfiguration")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("time_to_live", &self.time_to_live)
            .field("executor", &self.executor.is_some())
            .finish()
    }
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            min: 0,
            max: None,
            time_to_live: DEFAULT_TIME_TO_LIVE,
            executor: None,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of resources kept warm
    pub fn with_min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Set the maximum number of resources
    ///
    /// # Examples
    ///
    /// ```
    /// use warmpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_max(50);
    /// assert_eq!(config.max, Some(50));
    /// ```
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Set the checkout time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.time_to_live = ttl;
        self
    }

    /// Construct resources in the background on `executor`
    pub fn with_executor<E: Executor + 'static>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Wait between availability checks in `take()`: a tenth of the ttl, at least 1ms.
    pub fn poll_interval(&self) -> Duration {
        (self.time_to_live / 10).max(Duration::from_millis(1))
    }

    /// Check that the settings describe a usable pool.
    ///
    /// # Examples
    ///
    /// ```
    /// use warmpool::{PoolConfiguration, PoolError};
    ///
    /// let err = PoolConfiguration::new().with_min(3).with_max(2).validate().unwrap_err();
    /// assert!(matches!(err, PoolError::InvalidConfiguration(_)));
    /// ```
    pub fn validate(&self) -> PoolResult<()> {
        if self.time_to_live.is_zero() {
            return Err(PoolError::InvalidConfiguration(
                "time to live must be greater than zero".to_string(),
            ));
        }
        if let Some(max) = self.max {
            if max == 0 {
                return Err(PoolError::InvalidConfiguration(
                    "max must be greater than zero".to_string(),
                ));
            }
            if max < self.min {
                return Err(PoolError::InvalidConfiguration(format!(
                    "max ({max}) must not be less than min ({})",
                    self.min
                )));
            }
        }
        Ok(())
    }

    /// Build a pool whose resources always validate
    pub fn build<T, F, E>(self, factory: F) -> PoolResult<ObjectPool<T>>
    where
        T: Send + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<FactoryError>,
    {
        self.build_with_validator(factory, |_: &T| true)
    }

    /// Build a pool that checks each resource with `validator` before handing it out
    pub fn build_with_validator<T, F, E, V>(self, factory: F, validator: V) -> PoolResult<ObjectPool<T>>
    where
        T: Send + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<FactoryError>,
        V: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.validate()?;
        let factory: Factory<T> = Arc::new(move || -> Result<T, FactoryError> { factory().map_err(Into::into) });
        Ok(ObjectPool::from_parts(self, factory, Arc::new(validator)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InlineExecutor;
    use std::convert::Infallible;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::new();
        assert_eq!(config.min, 0);
        assert_eq!(config.max, None);
        assert_eq!(config.time_to_live, Duration::from_millis(10_000));
        assert!(config.executor.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval() {
        let config = PoolConfiguration::new().with_ttl(Duration::from_millis(250));
        assert_eq!(config.poll_interval(), Duration::from_millis(25));

        let config = PoolConfiguration::new().with_ttl(Duration::from_millis(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_rejects_max_below_min() {
        let result = PoolConfiguration::new()
            .with_min(5)
            .with_max(2)
            .build(|| Ok::<_, Infallible>(1));
        assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_zero_max_and_ttl() {
        assert!(PoolConfiguration::new().with_max(0).validate().is_err());
        assert!(PoolConfiguration::new().with_ttl(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_max_equal_to_min_is_fine() {
        assert!(PoolConfiguration::new().with_min(3).with_max(3).validate().is_ok());
    }

    #[test]
    fn test_debug_hides_executor() {
        let config = PoolConfiguration::new().with_executor(InlineExecutor);
        let rendered = format!("{config:?}");
        assert!(rendered.contains("executor: true"));
    }
}
