//! Basic usage examples for ObjectPool

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use warmpool::{ObjectPool, PoolConfiguration, WorkerPool};

/// Stand-in for an expensive client, e.g. a connection to a formatting backend.
#[derive(Debug)]
struct FormatterClient {
    serial: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== warmpool - Basic Examples ===\n");

    // Example 1: Inline construction
    inline_pool();

    // Example 2: Background warm-up
    warm_pool();

    // Example 3: Timeouts
    timeouts();

    // Example 4: Metrics and health
    metrics_and_health();
}

fn client_factory() -> impl Fn() -> Result<FormatterClient, Infallible> + Send + Sync + 'static {
    let serial = Arc::new(AtomicUsize::new(0));
    move || {
        thread::sleep(Duration::from_millis(50));
        Ok(FormatterClient {
            serial: serial.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }
}

fn inline_pool() {
    println!("1. Inline Pool:");
    let pool = ObjectPool::builder()
        .with_max(2)
        .build(client_factory())
        .expect("valid configuration");

    {
        let client = pool.take();
        println!("   Got client #{}", client.serial);
        // Client automatically returned when dropped
    }

    println!("   Available after return: {}\n", pool.available_count());
}

fn warm_pool() {
    println!("2. Warm Pool:");
    let workers = WorkerPool::new(2).expect("worker threads");
    let pool = PoolConfiguration::new()
        .with_min(2)
        .with_max(4)
        .with_executor(workers)
        .build(client_factory())
        .expect("valid configuration");

    println!("   Reserved at creation: {}", pool.size());
    thread::sleep(Duration::from_millis(100));
    println!("   Ready after warm-up: {}", pool.available_count());

    let a = pool.take();
    let b = pool.take();
    println!("   Checked out: #{} and #{}", a.serial, b.serial);
    println!("   Total: {}\n", pool.size());
}

fn timeouts() {
    println!("3. Timeouts:");
    let pool = ObjectPool::builder()
        .with_max(1)
        .build(client_factory())
        .expect("valid configuration");

    let held = pool.take();
    match pool.take_timeout(Duration::from_millis(100)) {
        Ok(client) => println!("   Unexpectedly got #{}", client.serial),
        Err(e) => println!("   Second take: {e}"),
    }

    drop(held);
    let again = pool.take_timeout(Duration::from_millis(100));
    println!("   After return: {}\n", if again.is_ok() { "Success" } else { "Failed" });
}

fn metrics_and_health() {
    println!("4. Metrics and Health:");
    let pool = ObjectPool::builder()
        .with_max(2)
        .build(client_factory())
        .expect("valid configuration");

    {
        let _a = pool.take();
        let _b = pool.take();

        let health = pool.get_health_status();
        println!("   Health: {}", if health.is_healthy() { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        for warning in &health.warnings {
            println!("   Warning: {warning}");
        }
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}
