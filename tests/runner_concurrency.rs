// tests/runner_concurrency.rs

mod common;
use crate::common::{ids, init_tracing, logged, new_run_log, RunLog};

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration as StdDuration;

use tokio::time::{Duration, timeout};

use cmddag::engine::{Runner, RunnerOptions};
use cmddag::registry::Registry;

type TestResult = Result<(), Box<dyn Error>>;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn diamond_middle_commands_overlap_with_two_workers() -> TestResult {
    init_tracing();

    let log = new_run_log();
    let mut registry = Registry::new();

    // b and c rendezvous on a barrier: the run can only finish if both are
    // in flight at the same time, i.e. the runner really overlaps them.
    let barrier = Arc::new(Barrier::new(2));

    add_recording(&mut registry, "a", &[], &log);
    for name in ["b", "c"] {
        registry.add(name, &["a"]);
        let barrier = Arc::clone(&barrier);
        let log = Arc::clone(&log);
        let owned = name.to_string();
        registry.on(name, move || {
            barrier.wait();
            log.lock().unwrap().push(owned.clone());
            Ok(())
        });
    }
    add_recording(&mut registry, "d", &["b", "c"], &log);

    let options = RunnerOptions {
        max_workers: Some(2),
    };
    let runner = Runner::new(Arc::new(registry), options);
    timeout(TEST_TIMEOUT, runner.run(&ids(&["d"]))).await??;

    let order = logged(&log);
    assert_eq!(order.len(), 4);
    // The root always finishes first and the join always finishes last;
    // b/c finish in whichever order the workers got there.
    assert_eq!(order[0], "a");
    assert_eq!(order[3], "d");
    Ok(())
}

#[tokio::test]
async fn worker_limit_bounds_commands_in_flight() -> TestResult {
    init_tracing();

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut registry = Registry::new();
    for name in ["p", "q", "r", "s"] {
        registry.add(name, &[]);
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        registry.on(name, move || {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(StdDuration::from_millis(50));
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let options = RunnerOptions {
        max_workers: Some(2),
    };
    let runner = Runner::new(Arc::new(registry), options);
    timeout(TEST_TIMEOUT, runner.run(&ids(&["p", "q", "r", "s"]))).await??;

    assert!(peak.load(Ordering::SeqCst) <= 2);
    Ok(())
}

#[tokio::test]
async fn single_worker_never_overlaps_commands() -> TestResult {
    init_tracing();

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut registry = Registry::new();
    for name in ["p", "q", "r"] {
        registry.add(name, &[]);
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        registry.on(name, move || {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(StdDuration::from_millis(20));
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let options = RunnerOptions {
        max_workers: Some(1),
    };
    let runner = Runner::new(Arc::new(registry), options);
    timeout(TEST_TIMEOUT, runner.run(&ids(&["p", "q", "r"]))).await??;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn dependency_never_overlaps_its_dependent() -> TestResult {
    init_tracing();

    let log = new_run_log();
    let mut registry = Registry::new();

    // a sleeps long enough that an eager (wrong) scheduler would have
    // started b before a's completion was recorded.
    registry.add("a", &[]);
    {
        let log = Arc::clone(&log);
        registry.on("a", move || {
            std::thread::sleep(StdDuration::from_millis(100));
            log.lock().unwrap().push("a".to_string());
            Ok(())
        });
    }
    add_recording(&mut registry, "b", &["a"], &log);

    let options = RunnerOptions {
        max_workers: Some(4),
    };
    let runner = Runner::new(Arc::new(registry), options);
    timeout(TEST_TIMEOUT, runner.run(&ids(&["b"]))).await??;

    assert_eq!(logged(&log), ids(&["a", "b"]));
    Ok(())
}

fn add_recording(registry: &mut Registry, name: &str, needs: &[&str], log: &RunLog) {
    registry.add(name, needs);
    let log = Arc::clone(log);
    let owned = name.to_string();
    registry.on(name, move || {
        log.lock().unwrap().push(owned.clone());
        Ok(())
    });
}
