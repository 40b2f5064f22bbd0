use ferrous_ioc::{
    AmbiguityPolicy, Component, Container, ContainerConfig, DependencyModel, DiError, Resolver,
};
use std::sync::Arc;

trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;
}

struct Email;
impl Notifier for Email {
    fn channel(&self) -> &'static str {
        "email"
    }
}

struct Sms;
impl Notifier for Sms {
    fn channel(&self) -> &'static str {
        "sms"
    }
}

struct Alerts {
    notifier: Arc<dyn Notifier>,
}

fn container_with(policy: AmbiguityPolicy) -> Container {
    let container = Container::with_config(ContainerConfig::default().with_ambiguity(policy));
    container
        .register(
            Component::<dyn Notifier>::named("email")
                .implemented_by(|n: Arc<Email>| n as Arc<dyn Notifier>)
                .constructor(vec![], |_| Ok(Email)),
        )
        .unwrap();
    container
        .register(
            Component::<dyn Notifier>::named("sms")
                .implemented_by(|n: Arc<Sms>| n as Arc<dyn Notifier>)
                .constructor(vec![], |_| Ok(Sms)),
        )
        .unwrap();
    container
}

fn register_alerts(container: &Container, dependency: DependencyModel) {
    container
        .register(
            Component::<Alerts>::named("alerts")
                .implemented_by_self()
                .constructor(vec![dependency], |args| {
                    Ok(Alerts {
                        notifier: args.get::<dyn Notifier>(0)?,
                    })
                })
                .transient(),
        )
        .unwrap();
}

#[test]
fn test_latest_registration_wins_by_default() {
    let container = container_with(AmbiguityPolicy::default());
    assert_eq!(container.resolve::<dyn Notifier>().unwrap().channel(), "sms");

    register_alerts(&container, DependencyModel::on::<dyn Notifier>("notifier"));
    assert_eq!(container.resolve::<Alerts>().unwrap().notifier.channel(), "sms");
}

#[test]
fn test_strict_policy_rejects_ambiguous_requests() {
    let container = container_with(AmbiguityPolicy::Strict);

    match container.resolve::<dyn Notifier>() {
        Err(DiError::AmbiguousDependency { candidates, .. }) => {
            assert_eq!(candidates, vec!["email", "sms"]);
        }
        other => panic!("expected AmbiguousDependency, got {:?}", other.map(|_| ())),
    }

    register_alerts(&container, DependencyModel::on::<dyn Notifier>("notifier"));
    assert!(matches!(
        container.resolve::<Alerts>(),
        Err(DiError::AmbiguousDependency { .. })
    ));
}

#[test]
fn test_dependency_name_matching_a_key_is_not_ambiguous() {
    let container = container_with(AmbiguityPolicy::Strict);
    register_alerts(&container, DependencyModel::on::<dyn Notifier>("email"));

    assert_eq!(container.resolve::<Alerts>().unwrap().notifier.channel(), "email");
}

#[test]
fn test_explicit_reference_is_not_ambiguous() {
    let container = container_with(AmbiguityPolicy::Strict);
    register_alerts(
        &container,
        DependencyModel::on::<dyn Notifier>("notifier").with_reference("email"),
    );

    assert_eq!(container.resolve::<Alerts>().unwrap().notifier.channel(), "email");
    assert_eq!(container.resolve_named::<dyn Notifier>("sms").unwrap().channel(), "sms");
}

#[test]
fn test_invalid_candidates_do_not_count() {
    let container = container_with(AmbiguityPolicy::Strict);
    container
        .register(
            Component::<dyn Notifier>::named("pager")
                .implemented_by(|n: Arc<Sms>| n as Arc<dyn Notifier>)
                .constructor(vec![DependencyModel::on::<u128>("frequency")], |_| Ok(Sms))
                .constructor(vec![DependencyModel::on::<u64>("code")], |_| Ok(Sms)),
        )
        .unwrap();
    assert!(container.unregister("sms"));

    // "pager" waits for its dependencies, leaving "email" as the only valid match
    assert_eq!(container.resolve::<dyn Notifier>().unwrap().channel(), "email");
}
