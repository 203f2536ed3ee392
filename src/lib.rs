//! # warmpool
//!
//! Thread-safe object pool for expensive resources such as connections
//! and clients.
//!
//! ## Features
//!
//! - Lazily built resources with an optional upper bound
//! - LIFO reuse, so recently used resources stay warm
//! - Checkout time-to-live: abandoned checkouts are reclaimed
//! - Warm minimum built in the background on a pluggable executor
//! - Automatic return of resources via RAII (Drop trait)
//! - Blocking and async checkout, both cancellable
//! - Metrics, Prometheus export and health status
//!
//! ## Quick Start
//!
//! ```rust
//! use warmpool::ObjectPool;
//!
//! let pool = ObjectPool::builder()
//!     .with_max(4)
//!     .build(|| Ok::<_, std::io::Error>(String::from("client")))
//!     .unwrap();
//! {
//!     let client = pool.take();
//!     println!("Got: {}", client.value());
//!     // Resource automatically returned when `client` goes out of scope
//! }
//! assert_eq!(pool.available_count(), 1);
//! ```

mod pool;
mod config;
mod metrics;
mod health;
mod ledger;
mod queue;
mod replenish;
mod executor;
mod handle;
mod errors;

pub use pool::ObjectPool;
pub use handle::Checkout;
pub use config::{PoolConfiguration, DEFAULT_TIME_TO_LIVE};
pub use executor::{Executor, InlineExecutor, Task, TokioExecutor, WorkerPool};
pub use ledger::ResourceId;
pub use metrics::PoolMetrics;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use health::HealthStatus;
pub use errors::{FactoryError, PoolError, PoolResult};
