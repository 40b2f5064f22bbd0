/// Concurrent access integration tests
///
/// One container shared by many threads: singletons stay unique, transients
/// stay distinct and registrations made while others resolve are picked up.
use ferrous_ioc::{Component, Container, DependencyModel, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

struct Registry {
    id: usize,
}

struct Session {
    registry: Arc<Registry>,
}

fn setup(created: Arc<AtomicUsize>) -> Container {
    let container = Container::new();
    container
        .register(
            Component::<Registry>::named("registry")
                .implemented_by_self()
                .constructor(vec![], move |_| {
                    // Widen the window for racing constructions
                    thread::sleep(Duration::from_millis(10));
                    Ok(Registry {
                        id: created.fetch_add(1, Ordering::SeqCst),
                    })
                }),
        )
        .unwrap();
    container
        .register(
            Component::<Session>::named("session")
                .implemented_by_self()
                .constructor(vec![DependencyModel::on::<Registry>("registry")], |args| {
                    Ok(Session {
                        registry: args.get::<Registry>(0)?,
                    })
                })
                .transient(),
        )
        .unwrap();
    container
}

#[test]
fn test_singleton_unique_under_concurrent_resolves() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = setup(created.clone());
    let barrier = Barrier::new(16);

    let registries: Vec<Arc<Registry>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    container.resolve::<Registry>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(registries.iter().all(|registry| Arc::ptr_eq(registry, &registries[0])));
    assert_eq!(registries[0].id, 0);
}

#[test]
fn test_transients_share_the_singleton_dependency() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = setup(created.clone());

    let sessions: Vec<Arc<Session>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|_| container.resolve::<Session>().unwrap()))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    for (index, session) in sessions.iter().enumerate() {
        assert!(Arc::ptr_eq(&session.registry, &sessions[0].registry));
        for other in &sessions[index + 1..] {
            assert!(!Arc::ptr_eq(session, other));
        }
    }
}

#[test]
fn test_registration_while_resolving() {
    struct Extra(usize);

    let created = Arc::new(AtomicUsize::new(0));
    let container = setup(created);

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                for _ in 0..20 {
                    container.resolve::<Session>().unwrap();
                }
            });
        }
        s.spawn(|_| {
            for index in 0..20 {
                container
                    .register(
                        Component::<Extra>::named(format!("extra{}", index))
                            .implemented_by_self()
                            .constructor(vec![], move |_| Ok(Extra(index))),
                    )
                    .unwrap();
            }
        });
    })
    .unwrap();

    assert_eq!(container.resolve_all::<Extra>().unwrap().len(), 20);
    assert_eq!(container.resolve::<Extra>().unwrap().0, 19);
}
