use ferrous_ioc::{Component, Container, DiError, PoolWait, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

struct Worker {
    id: usize,
}

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    returned: AtomicUsize,
    destroyed: AtomicUsize,
}

fn register_workers(container: &Container, min: usize, max: usize, wait: PoolWait) -> Arc<Counters> {
    let counters = Arc::new(Counters::default());
    let created = counters.clone();
    let returned = counters.clone();
    let destroyed = counters.clone();
    container
        .register(
            Component::<Worker>::named("worker")
                .implemented_by_self()
                .constructor(vec![], move |_| {
                    Ok(Worker {
                        id: created.created.fetch_add(1, Ordering::SeqCst),
                    })
                })
                .pooled(min, max)
                .pool_wait(wait)
                .on_pool_return(move |_: &Worker| {
                    returned.returned.fetch_add(1, Ordering::SeqCst);
                })
                .on_decommission(move |_: &Worker| {
                    destroyed.destroyed.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();
    counters
}

#[test]
fn test_pool_never_exceeds_max_outstanding() {
    let container = Container::new();
    register_workers(&container, 1, 2, PoolWait::Timeout(Duration::from_secs(10)));

    let in_use = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..10 {
            s.spawn(|_| {
                let worker = container.resolve::<Worker>().unwrap();
                let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                in_use.fetch_sub(1, Ordering::SeqCst);
                assert!(container.release(&worker));
            });
        }
    })
    .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_released_instance_is_reused() {
    let container = Container::new();
    let counters = register_workers(&container, 1, 2, PoolWait::FailFast);

    let first = container.resolve::<Worker>().unwrap();
    let first_id = first.id;
    assert!(container.release(&first));
    assert_eq!(counters.returned.load(Ordering::SeqCst), 1);

    let again = container.resolve::<Worker>().unwrap();
    assert_eq!(again.id, first_id);
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_instances_above_min_are_destroyed_on_release() {
    let container = Container::new();
    let counters = register_workers(&container, 0, 2, PoolWait::FailFast);

    let worker = container.resolve::<Worker>().unwrap();
    assert!(container.release(&worker));
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(counters.returned.load(Ordering::SeqCst), 0);
}

#[test]
fn test_fail_fast_when_exhausted() {
    let container = Container::new();
    register_workers(&container, 0, 2, PoolWait::FailFast);

    let _a = container.resolve::<Worker>().unwrap();
    let _b = container.resolve::<Worker>().unwrap();
    match container.resolve::<Worker>() {
        Err(DiError::PoolExhausted { component, max, .. }) => {
            assert_eq!(component, "worker");
            assert_eq!(max, 2);
        }
        other => panic!("expected PoolExhausted, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_timeout_when_exhausted() {
    let container = Container::new();
    register_workers(&container, 1, 1, PoolWait::Timeout(Duration::from_millis(50)));

    let _held = container.resolve::<Worker>().unwrap();
    let started = Instant::now();
    let result = container.resolve::<Worker>();
    assert!(matches!(result, Err(DiError::PoolExhausted { .. })));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_blocked_caller_gets_the_released_instance() {
    let container = Container::new();
    register_workers(&container, 1, 1, PoolWait::Block);

    let held = container.resolve::<Worker>().unwrap();
    let held_id = held.id;

    crossbeam_utils::thread::scope(|s| {
        let waiter = s.spawn(|_| container.resolve::<Worker>().unwrap());
        thread::sleep(Duration::from_millis(50));
        assert!(container.release(&held));
        let received = waiter.join().unwrap();
        assert_eq!(received.id, held_id);
    })
    .unwrap();
}

#[test]
fn test_double_release_returns_once() {
    let container = Container::new();
    let counters = register_workers(&container, 1, 2, PoolWait::FailFast);

    let worker = container.resolve::<Worker>().unwrap();
    assert!(container.release(&worker));
    assert!(!container.release(&worker));
    assert_eq!(counters.returned.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invalid_bounds() {
    let container = Container::new();
    register_workers(&container, 3, 1, PoolWait::FailFast);

    assert!(matches!(
        container.resolve::<Worker>(),
        Err(DiError::InvalidComponent { .. })
    ));
}

#[test]
fn test_dispose_destroys_pooled_instances() {
    let container = Container::new();
    let counters = register_workers(&container, 2, 2, PoolWait::FailFast);

    let a = container.resolve::<Worker>().unwrap();
    let b = container.resolve::<Worker>().unwrap();
    container.release(&a);
    let _b = b;

    container.dispose();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_pool_recycles_again_after_dispose() {
    let container = Container::new();
    let counters = register_workers(&container, 1, 2, PoolWait::FailFast);

    let before = container.resolve::<Worker>().unwrap();
    container.release(&before);
    container.dispose();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);

    let first = container.resolve::<Worker>().unwrap();
    let first_id = first.id;
    assert!(container.release(&first));
    let second = container.resolve::<Worker>().unwrap();

    assert_eq!(second.id, first_id);
    assert_eq!(counters.created.load(Ordering::SeqCst), 2);
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
}

/// Registers a single-slot pool whose first construction stops twice at the
/// returned barrier, so a dispose can run while it is in flight.
fn register_gated_worker(container: &Container, wait: PoolWait) -> (Arc<Barrier>, Arc<Counters>) {
    let gate = Arc::new(Barrier::new(2));
    let counters = Arc::new(Counters::default());
    let constructing = gate.clone();
    let created = counters.clone();
    let destroyed = counters.clone();
    container
        .register(
            Component::<Worker>::named("worker")
                .implemented_by_self()
                .constructor(vec![], move |_| {
                    let id = created.created.fetch_add(1, Ordering::SeqCst);
                    if id == 0 {
                        constructing.wait();
                        constructing.wait();
                    }
                    Ok(Worker { id })
                })
                .pooled(1, 1)
                .pool_wait(wait)
                .on_decommission(move |_: &Worker| {
                    destroyed.destroyed.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();
    (gate, counters)
}

#[test]
fn test_instance_built_across_dispose_is_destroyed_on_return() {
    let container = Container::new();
    let (gate, counters) = register_gated_worker(&container, PoolWait::FailFast);

    let worker = crossbeam_utils::thread::scope(|s| {
        let builder = s.spawn(|_| container.resolve::<Worker>().unwrap());
        gate.wait();
        container.dispose();
        gate.wait();
        builder.join().unwrap()
    })
    .unwrap();

    assert!(container.release(&worker));
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);

    let fresh = container.resolve::<Worker>().unwrap();
    assert_eq!(fresh.id, 1);
}

#[test]
fn test_blocked_caller_fails_when_the_pool_is_disposed() {
    let container = Container::new();
    let (gate, _counters) = register_gated_worker(&container, PoolWait::Block);

    let worker = crossbeam_utils::thread::scope(|s| {
        let builder = s.spawn(|_| container.resolve::<Worker>().unwrap());
        gate.wait();
        let waiter = s.spawn(|_| container.resolve::<Worker>().map(|worker| worker.id));
        thread::sleep(Duration::from_millis(50));

        container.dispose();
        assert!(matches!(waiter.join().unwrap(), Err(DiError::PoolExhausted { .. })));
        gate.wait();
        builder.join().unwrap()
    })
    .unwrap();

    // Returning the stale instance frees the slot for new resolves
    assert!(container.release(&worker));
    assert!(container.resolve::<Worker>().is_ok());
}
