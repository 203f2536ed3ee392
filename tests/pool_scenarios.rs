//! Timing scenarios for nested checkouts against a slow factory

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use warmpool::{ObjectPool, PoolConfiguration, PoolError, WorkerPool};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn slow_counter() -> impl Fn() -> Result<usize, Infallible> + Send + Sync + 'static {
    let counter = Arc::new(AtomicUsize::new(0));
    move || {
        thread::sleep(Duration::from_millis(100));
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

fn config() -> PoolConfiguration {
    PoolConfiguration::new()
        .with_max(2)
        .with_ttl(Duration::from_millis(250))
}

fn assert_between(label: &str, elapsed: Duration, low_ms: u64, high_ms: u64) {
    assert!(
        elapsed >= Duration::from_millis(low_ms) && elapsed <= Duration::from_millis(high_ms),
        "{label}: {elapsed:?} not within {low_ms}..={high_ms}ms"
    );
}

#[test]
fn nested_takes_without_executor() {
    init_tracing();
    let pool = config().build(slow_counter()).unwrap();

    let start = Instant::now();
    {
        let one = pool.take();
        let one_at = Instant::now();
        {
            let two = pool.take();
            let two_at = Instant::now();
            {
                let three = pool.take();
                let three_at = Instant::now();
                {
                    let four = pool.take();
                    let four_at = Instant::now();
                    {
                        let five = pool.take();
                        let five_at = Instant::now();

                        assert_eq!(
                            [*one, *two, *three, *four, *five],
                            [1, 2, 3, 4, 5]
                        );

                        assert_between("one", one_at - start, 75, 250);
                        assert_between("two", two_at - one_at, 75, 250);
                        // has to wait for `one` to expire
                        assert_between("three", three_at - two_at, 250, 600);
                        assert_between("four", four_at - three_at, 75, 250);
                        assert_between("five", five_at - four_at, 250, 600);
                    }
                }
            }
        }
    }
    assert!(pool.size() <= 2);

    // Only the two newest checkouts were still on the ledger when returned.
    let start = Instant::now();
    let one = pool.take();
    let one_at = Instant::now();
    let two = pool.take();
    let two_at = Instant::now();

    assert_eq!(*one, 4);
    assert_eq!(*two, 5);
    assert!(one_at - start <= Duration::from_millis(50));
    assert!(two_at - one_at <= Duration::from_millis(50));
}

#[test]
fn nested_takes_with_executor() {
    init_tracing();
    let pool = config()
        .with_executor(WorkerPool::new(4).unwrap())
        .build(slow_counter())
        .unwrap();

    let start = Instant::now();
    {
        let one = pool.take();
        let one_at = Instant::now();
        {
            let two = pool.take();
            let two_at = Instant::now();
            {
                let three = pool.take();
                let three_at = Instant::now();
                {
                    let four = pool.take();
                    let four_at = Instant::now();
                    {
                        let five = pool.take();
                        let five_at = Instant::now();

                        assert_eq!(
                            [*one, *two, *three, *four, *five],
                            [1, 2, 3, 4, 5]
                        );

                        assert_between("one", one_at - start, 50, 250);
                        // built in parallel with `one`
                        assert_between("two", two_at - one_at, 0, 100);
                        assert_between("three", three_at - two_at, 250, 600);
                        assert_between("four", four_at - three_at, 0, 100);
                        assert_between("five", five_at - four_at, 250, 600);
                    }
                }
            }
        }
    }
    assert!(pool.size() <= 2);

    let start = Instant::now();
    let _one = pool.take();
    let one_at = Instant::now();
    let _two = pool.take();
    let two_at = Instant::now();

    // the second may still be in flight, replacing an expired checkout
    assert!(one_at - start <= Duration::from_millis(50));
    assert!(two_at - one_at <= Duration::from_millis(150));
}

#[test]
fn rejecting_validator_never_hands_out() {
    init_tracing();
    let pool = PoolConfiguration::new()
        .with_max(2)
        .with_ttl(Duration::from_millis(100))
        .build_with_validator(|| Ok::<_, Infallible>(0u8), |_: &u8| false)
        .unwrap();

    let result = pool.take_timeout(Duration::from_millis(200));
    assert_eq!(result.unwrap_err(), PoolError::Timeout(Duration::from_millis(200)));
    assert!(pool.get_metrics().validation_failures >= 1);
    assert!(pool.size() <= 2);
}

#[test]
fn blocked_take_waits_for_return_at_max() {
    init_tracing();
    let pool: ObjectPool<usize> = PoolConfiguration::new()
        .with_max(1)
        .with_ttl(Duration::from_secs(10))
        .build(slow_counter())
        .unwrap();
    let held = pool.take();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || {
            let start = Instant::now();
            let value = *pool.take();
            (value, start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(150));
    drop(held);

    let (value, waited) = waiter.join().unwrap();
    assert_eq!(value, 1);
    assert!(waited >= Duration::from_millis(100));
    assert_eq!(pool.size(), 1);
}

#[test]
fn total_matches_queue_plus_ledger_when_idle() {
    init_tracing();
    let pool = PoolConfiguration::new()
        .with_min(2)
        .with_max(4)
        .with_executor(WorkerPool::new(2).unwrap())
        .build(|| Ok::<_, Infallible>(String::from("formatter")))
        .unwrap();

    let held: Vec<_> = (0..3).map(|_| pool.take()).collect();
    assert!(pool.size() <= 4);
    drop(held);

    let deadline = Instant::now() + Duration::from_secs(2);
    while pool.size() != pool.available_count() + pool.checked_out_count() {
        assert!(Instant::now() < deadline, "construction never settled");
        thread::sleep(Duration::from_millis(5));
    }
    assert!(pool.size() <= 4);
}
