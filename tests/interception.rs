use ferrous_ioc::{
    catch_intercepted, intercept_proxy, interceptor_fn, Component, Container, DiError, DiResult,
    HandlerState, Interceptor, InterceptorReference, Invocation, Resolver,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub trait Calculator: Send + Sync {
    fn add(&self, a: i32, b: i32) -> i32;
    fn sub(&self, a: i32, b: i32) -> i32;
    fn reset(&self);
}

#[derive(Default)]
struct Plain {
    calls: Arc<AtomicUsize>,
}

impl Calculator for Plain {
    fn add(&self, a: i32, b: i32) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        a + b
    }

    fn sub(&self, a: i32, b: i32) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        a - b
    }

    fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

intercept_proxy! {
    pub struct CalculatorProxy for dyn Calculator {
        fn add(&self, a: i32, b: i32) -> i32;
        fn sub(&self, a: i32, b: i32) -> i32;
        fn reset(&self);
    }
}

type Log = Arc<Mutex<Vec<String>>>;

/// Adds one to the first argument before proceeding.
fn add_one(log: Log) -> Arc<dyn Interceptor> {
    interceptor_fn(move |invocation| {
        log.lock().push(format!("add_one:before:{}", invocation.method()));
        if let Some(first) = invocation.argument_mut::<i32>(0) {
            *first += 1;
        }
        let result = invocation.proceed();
        log.lock().push(format!("add_one:after:{}", invocation.method()));
        result
    })
}

/// Doubles the return value after proceeding.
fn double(log: Log) -> Arc<dyn Interceptor> {
    interceptor_fn(move |invocation| {
        log.lock().push(format!("double:before:{}", invocation.method()));
        invocation.proceed()?;
        if let Some(value) = invocation.return_value_mut::<i32>() {
            *value *= 2;
        }
        log.lock().push(format!("double:after:{}", invocation.method()));
        Ok(())
    })
}

fn calculator() -> ferrous_ioc::ComponentRegistration<dyn Calculator, Plain> {
    Component::<dyn Calculator>::named("calculator")
        .implemented_by(|plain: Arc<Plain>| plain as Arc<dyn Calculator>)
        .constructor(vec![], |_| Ok(Plain::default()))
        .proxy(CalculatorProxy::create)
}

#[test]
fn test_chain_order_and_proceed_contract() {
    let log: Log = Arc::default();
    let container = Container::new();
    container
        .register(
            calculator()
                .interceptor_instance("add_one", add_one(log.clone()))
                .interceptor_instance("double", double(log.clone())),
        )
        .unwrap();

    let calc = container.resolve::<dyn Calculator>().unwrap();
    // (1 + 1 + 2) * 2
    assert_eq!(calc.add(1, 2), 8);
    assert_eq!(
        *log.lock(),
        vec![
            "add_one:before:add",
            "double:before:add",
            "double:after:add",
            "add_one:after:add",
        ]
    );

    log.lock().clear();
    calc.reset();
    assert_eq!(
        *log.lock(),
        vec![
            "add_one:before:reset",
            "double:before:reset",
            "double:after:reset",
            "add_one:after:reset",
        ]
    );
}

#[test]
fn test_interceptor_can_short_circuit() {
    let target_calls = Arc::new(AtomicUsize::new(0));
    let calls = target_calls.clone();
    let container = Container::new();
    container
        .register(
            Component::<dyn Calculator>::named("calculator")
                .implemented_by(|plain: Arc<Plain>| plain as Arc<dyn Calculator>)
                .constructor(vec![], move |_| Ok(Plain { calls: calls.clone() }))
                .interceptor_instance(
                    "cached",
                    interceptor_fn(|invocation| {
                        invocation.set_return_value(42i32);
                        Ok(())
                    }),
                )
                .proxy(CalculatorProxy::create),
        )
        .unwrap();

    let calc = container.resolve::<dyn Calculator>().unwrap();
    assert_eq!(calc.add(1, 2), 42);
    assert_eq!(calc.sub(1, 2), 42);
    assert_eq!(target_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_interceptor_errors_reach_the_caller() {
    let container = Container::new();
    container
        .register(calculator().interceptor_instance(
            "deny",
            interceptor_fn(|invocation| {
                Err(DiError::intercepted(
                    invocation.component(),
                    invocation.method(),
                    "denied",
                ))
            }),
        ))
        .unwrap();

    let calc = container.resolve::<dyn Calculator>().unwrap();
    match catch_intercepted(|| calc.add(1, 2)) {
        Err(DiError::InterceptedCallFailure {
            component,
            method,
            reason,
        }) => {
            assert_eq!(component, "calculator");
            assert_eq!(method, "add");
            assert_eq!(reason, "denied");
        }
        other => panic!("expected InterceptedCallFailure, got {:?}", other),
    }
}

#[test]
fn test_skipping_proceed_without_a_value_fails_the_call() {
    let container = Container::new();
    container
        .register(calculator().interceptor_instance("swallow", interceptor_fn(|_| Ok(()))))
        .unwrap();

    let calc = container.resolve::<dyn Calculator>().unwrap();
    assert!(matches!(
        catch_intercepted(|| calc.add(1, 2)),
        Err(DiError::InterceptedCallFailure { .. })
    ));
    // A unit method needs no return value
    assert!(catch_intercepted(|| calc.reset()).is_ok());
}

#[test]
fn test_interceptor_may_retry() {
    struct Retry;
    impl Interceptor for Retry {
        fn intercept(&self, invocation: &mut Invocation<'_>) -> DiResult<()> {
            invocation.proceed()?;
            invocation.proceed()
        }
    }

    let container = Container::new();
    container
        .register(calculator().interceptor_instance("retry", Arc::new(Retry)))
        .unwrap();

    let calc = container.resolve::<dyn Calculator>().unwrap();
    assert_eq!(calc.add(2, 3), 5);
}

#[test]
fn test_method_filter() {
    let log: Log = Arc::default();
    let container = Container::new();
    container
        .register(calculator().interceptor_ref(
            InterceptorReference::instance("double", double(log.clone())).only_for(["add"]),
        ))
        .unwrap();

    let calc = container.resolve::<dyn Calculator>().unwrap();
    assert_eq!(calc.add(2, 3), 10);
    assert_eq!(calc.sub(2, 3), -1);
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn test_interceptor_component_is_a_dependency() {
    struct Audit {
        seen: Log,
    }
    impl Interceptor for Audit {
        fn intercept(&self, invocation: &mut Invocation<'_>) -> DiResult<()> {
            self.seen.lock().push(invocation.method().to_string());
            invocation.proceed()
        }
    }

    let seen: Log = Arc::default();
    let container = Container::new();
    container.register(calculator().interceptor("audit")).unwrap();
    assert_eq!(
        container.handler_state("calculator"),
        Some(HandlerState::WaitingDependency)
    );

    let audit_log = seen.clone();
    container
        .register(
            Component::<dyn Interceptor>::named("audit")
                .implemented_by(|audit: Arc<Audit>| audit as Arc<dyn Interceptor>)
                .constructor(vec![], move |_| Ok(Audit { seen: audit_log.clone() })),
        )
        .unwrap();
    assert_eq!(container.handler_state("calculator"), Some(HandlerState::Valid));

    let calc = container.resolve::<dyn Calculator>().unwrap();
    assert_eq!(calc.sub(5, 3), 2);
    assert_eq!(*seen.lock(), vec!["sub"]);
}

#[test]
fn test_proxy_shapes_are_shared() {
    let container = Container::new();
    for key in ["first", "second"] {
        container
            .register(
                Component::<dyn Calculator>::named(key)
                    .implemented_by(|plain: Arc<Plain>| plain as Arc<dyn Calculator>)
                    .constructor(vec![], |_| Ok(Plain::default()))
                    .interceptor_instance("noop", interceptor_fn(|invocation| invocation.proceed()))
                    .proxy(CalculatorProxy::create),
            )
            .unwrap();
    }
    container
        .register(
            Component::<dyn Calculator>::named("third")
                .implemented_by(|plain: Arc<Plain>| plain as Arc<dyn Calculator>)
                .constructor(vec![], |_| Ok(Plain::default()))
                .interceptor_instance("other", interceptor_fn(|invocation| invocation.proceed()))
                .proxy(CalculatorProxy::create),
        )
        .unwrap();

    let all = container.resolve_all::<dyn Calculator>().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(container.proxy_shape_count(), 2);
}

#[test]
fn test_interceptors_without_proxy_are_invalid() {
    let container = Container::new();
    container
        .register(
            Component::<dyn Calculator>::named("calculator")
                .implemented_by(|plain: Arc<Plain>| plain as Arc<dyn Calculator>)
                .constructor(vec![], |_| Ok(Plain::default()))
                .interceptor_instance("noop", interceptor_fn(|invocation| invocation.proceed())),
        )
        .unwrap();

    assert_eq!(container.handler_state("calculator"), Some(HandlerState::Invalid));
    assert!(matches!(
        container.resolve::<dyn Calculator>(),
        Err(DiError::InvalidComponent { .. })
    ));
}
