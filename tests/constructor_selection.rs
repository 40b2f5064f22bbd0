use ferrous_ioc::{Component, Container, DependencyModel, DiError, HandlerState, Resolver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

trait Sink: Send + Sync {}
trait Clock: Send + Sync {}

struct MemorySink;
impl Sink for MemorySink {}

struct SystemClock;
impl Clock for SystemClock {}

struct Reporter {
    built_with: &'static str,
}

fn register_sink(container: &Container) {
    container
        .register(
            Component::<dyn Sink>::named("sink")
                .implemented_by(|sink: Arc<MemorySink>| sink as Arc<dyn Sink>)
                .constructor(vec![], |_| Ok(MemorySink)),
        )
        .unwrap();
}

fn register_clock(container: &Container) {
    container
        .register(
            Component::<dyn Clock>::named("clock")
                .implemented_by(|clock: Arc<SystemClock>| clock as Arc<dyn Clock>)
                .constructor(vec![], |_| Ok(SystemClock)),
        )
        .unwrap();
}

fn register_reporter(container: &Container) {
    container
        .register(
            Component::<Reporter>::named("reporter")
                .implemented_by_self()
                .constructor(vec![DependencyModel::on::<dyn Sink>("sink")], |args| {
                    args.get::<dyn Sink>(0)?;
                    Ok(Reporter { built_with: "sink" })
                })
                .constructor(
                    vec![
                        DependencyModel::on::<dyn Sink>("sink"),
                        DependencyModel::on::<dyn Clock>("clock"),
                    ],
                    |_| Ok(Reporter { built_with: "sink+clock" }),
                )
                .constructor(vec![], |_| Ok(Reporter { built_with: "default" }))
                .transient(),
        )
        .unwrap();
}

#[test]
fn test_prefers_the_satisfiable_constructor() {
    let container = Container::new();
    register_reporter(&container);

    // sink: -2, sink+clock: -4, default: 0
    assert_eq!(container.resolve::<Reporter>().unwrap().built_with, "default");
}

#[test]
fn test_higher_score_beats_fewer_parameters() {
    let container = Container::new();
    register_sink(&container);
    register_clock(&container);
    register_reporter(&container);

    // sink: +2, sink+clock: +4, default: 0
    assert_eq!(container.resolve::<Reporter>().unwrap().built_with, "sink+clock");
}

#[test]
fn test_partially_satisfiable_candidate_ties_with_default() {
    let container = Container::new();
    register_sink(&container);
    register_reporter(&container);

    // sink: +2, sink+clock: 0, default: 0
    assert_eq!(container.resolve::<Reporter>().unwrap().built_with, "sink");
}

#[test]
fn test_ties_go_to_fewer_parameters() {
    let container = Container::new();
    register_sink(&container);
    container
        .register(
            Component::<Reporter>::named("reporter")
                .implemented_by_self()
                .constructor(
                    vec![
                        DependencyModel::on::<dyn Sink>("sink"),
                        DependencyModel::on::<dyn Clock>("clock"),
                    ],
                    |_| Ok(Reporter { built_with: "sink+clock" }),
                )
                .constructor(vec![], |_| Ok(Reporter { built_with: "default" })),
        )
        .unwrap();

    assert_eq!(container.resolve::<Reporter>().unwrap().built_with, "default");
}

#[test]
fn test_winner_is_kept_after_first_activation() {
    let container = Container::new();
    register_reporter(&container);
    assert_eq!(container.resolve::<Reporter>().unwrap().built_with, "default");

    register_sink(&container);
    register_clock(&container);
    assert_eq!(container.resolve::<Reporter>().unwrap().built_with, "default");
}

#[test]
fn test_rescored_when_registry_changes_before_first_activation() {
    let container = Container::new();
    let sink_fails = Arc::new(AtomicBool::new(true));
    let fails = sink_fails.clone();
    container
        .register(
            Component::<dyn Sink>::named("sink")
                .implemented_by(|sink: Arc<MemorySink>| sink as Arc<dyn Sink>)
                .constructor(vec![], move |_| {
                    if fails.load(Ordering::SeqCst) {
                        Err("sink offline".into())
                    } else {
                        Ok(MemorySink)
                    }
                })
                .transient(),
        )
        .unwrap();
    register_reporter(&container);

    assert!(matches!(
        container.resolve::<Reporter>(),
        Err(DiError::ActivationError { component, .. }) if component == "sink"
    ));

    assert!(container.unregister("sink"));
    assert_eq!(container.resolve::<Reporter>().unwrap().built_with, "default");
}

#[test]
fn test_no_eligible_constructor() {
    let container = Container::new();
    container
        .register(
            Component::<Reporter>::named("reporter")
                .implemented_by_self()
                .constructor(vec![DependencyModel::on::<dyn Sink>("sink")], |_| {
                    Ok(Reporter { built_with: "sink" })
                })
                .constructor(
                    vec![
                        DependencyModel::on::<dyn Sink>("sink"),
                        DependencyModel::on::<dyn Clock>("clock"),
                    ],
                    |_| Ok(Reporter { built_with: "sink+clock" }),
                ),
        )
        .unwrap();

    assert_eq!(
        container.handler_state("reporter"),
        Some(HandlerState::WaitingDependency)
    );
    match container.resolve::<Reporter>() {
        Err(DiError::NoEligibleConstructor { component, missing }) => {
            assert_eq!(component, "reporter");
            assert_eq!(missing.len(), 1);
            assert!(missing[0].starts_with("sink"));
        }
        other => panic!("expected NoEligibleConstructor, got {:?}", other.map(|_| ())),
    }
}
