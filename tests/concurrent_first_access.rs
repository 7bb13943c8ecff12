//! Races between concurrent first-time callers.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Barrier,
    },
    thread,
};

use oncemap::{Registry, TypeKeyed};

/// M concurrent first-time callers for one key: the factory runs exactly once
/// and all M callers receive the same instance.
#[test]
fn factory_runs_at_most_once_under_contention() {
    const CALLERS: usize = 16;

    let registry = Arc::new(Registry::new());
    let constructions = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let constructions = Arc::clone(&constructions);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .get_or_create("shared", move || {
                        constructions.fetch_add(1, Ordering::SeqCst);
                        Ok(vec![1u8, 2, 3])
                    })
                    .unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<Vec<u8>>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
}

/// Repeated rounds of heavy contention, each on a fresh key: every round
/// constructs exactly once.
#[test]
fn factory_runs_once_across_many_rounds() {
    const CALLERS: usize = 32;
    const ROUNDS: usize = 20;

    let registry = Arc::new(Registry::new());

    for round in 0..ROUNDS {
        let constructions = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let constructions = Arc::clone(&constructions);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry
                        .get_or_create(format!("round-{round}"), move || {
                            constructions.fetch_add(1, Ordering::SeqCst);
                            Ok(round)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.join().unwrap(), round);
        }
        assert_eq!(constructions.load(Ordering::SeqCst), 1, "round {round}");
    }
}

/// A factory that panics while another caller is parked on the same key
/// leaves the slot usable: the waiter recovers and constructs for itself.
#[test]
fn panicking_factory_does_not_wedge_waiters() {
    let registry = Arc::new(Registry::new());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (entered_tx, entered_rx) = mpsc::channel::<()>();

    let panicky_registry = Arc::clone(&registry);
    let panicky = thread::spawn(move || {
        let _: Result<Arc<u32>, _> = panicky_registry.get_or_create("wedge", move || {
            entered_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            panic!("factory exploded");
        });
    });

    // The panicking factory is in flight; this caller parks behind it.
    entered_rx.recv().unwrap();
    let waiter_registry = Arc::clone(&registry);
    let waiter = thread::spawn(move || {
        waiter_registry.get_or_create("wedge", || Ok(5u32)).unwrap()
    });

    release_tx.send(()).unwrap();
    panicky.join().unwrap_err();
    assert_eq!(*waiter.join().unwrap(), 5);

    // The slot stays usable for everyone afterwards.
    let again = registry.get_or_create("wedge", || Ok(9u32)).unwrap();
    assert_eq!(*again, 5);
}

/// An in-flight construction for one key never blocks a request for a
/// different key: "slow" finishes its factory only after "fast" has completed
/// on another thread, which would deadlock if keys serialized each other.
#[test]
fn distinct_keys_do_not_serialize() {
    let registry = Arc::new(Registry::new());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (entered_tx, entered_rx) = mpsc::channel::<()>();

    let slow_registry = Arc::clone(&registry);
    let slow = thread::spawn(move || {
        slow_registry
            .get_or_create("slow", move || {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok("slow".to_string())
            })
            .unwrap()
    });

    // Wait until the slow factory is provably in flight.
    entered_rx.recv().unwrap();
    let fast = registry
        .get_or_create("fast", || Ok("fast".to_string()))
        .unwrap();
    assert_eq!(*fast, "fast");

    release_tx.send(()).unwrap();
    assert_eq!(*slow.join().unwrap(), "slow");
}

/// A caller racing a failing construction observes either the failure slot
/// retried or its own successful construction, never a partial instance.
#[test]
fn waiters_retry_after_a_failed_construction() {
    let registry = Arc::new(Registry::new());
    let barrier = Arc::new(Barrier::new(2));
    let failures = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let failures = Arc::clone(&failures);
            thread::spawn(move || {
                barrier.wait();
                // First factory invocation fails, any retry succeeds.
                registry.get_or_create("flaky", move || {
                    if failures.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("first attempt fails".into())
                    } else {
                        Ok(7u32)
                    }
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert!(successes >= 1, "at least one caller must succeed or retry");
    for value in results.into_iter().flatten() {
        assert_eq!(*value, 7);
    }
}

struct CountingLogger;

static CONSOLE_VARIANT_CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

impl TypeKeyed for CountingLogger {
    fn construct() -> Result<Self, oncemap::BoxError> {
        CONSOLE_VARIANT_CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
        Ok(CountingLogger)
    }
}

/// Two concurrent first-time callers for one type-keyed variant: both receive
/// the same object, and the constructor side effect fires exactly once.
#[test]
fn type_keyed_race_constructs_once() {
    let registry = Arc::new(Registry::new());
    registry.bind::<CountingLogger>();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_for_type::<CountingLogger>().unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<CountingLogger>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(CONSOLE_VARIANT_CONSTRUCTIONS.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&instances[0], &instances[1]));
}
