use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::descriptors::InterceptorReference;
use crate::error::{DiError, DiResult};
use crate::key::Contract;

use super::invocation::{CallArgument, Invocation};
use super::Interceptor;

/// Dispatch table shared by every proxy of one (contract, interceptor chain).
///
/// Records which positions of the chain apply to each method, computed on
/// the first call of that method.
pub(crate) struct ProxyShape {
    contract: Contract,
    filters: Vec<Option<Vec<String>>>,
    methods: RwLock<HashMap<&'static str, Arc<[usize]>>>,
}

impl ProxyShape {
    pub(crate) fn new(contract: Contract, references: &[InterceptorReference]) -> Self {
        Self {
            contract,
            filters: references.iter().map(|r| r.methods.clone()).collect(),
            methods: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn contract(&self) -> Contract {
        self.contract
    }

    /// Chain positions that apply to `method`, in declaration order.
    pub(crate) fn chain_for(&self, method: &'static str) -> Arc<[usize]> {
        if let Some(chain) = self.methods.read().get(method) {
            return chain.clone();
        }
        let chain: Arc<[usize]> = self
            .filters
            .iter()
            .enumerate()
            .filter(|(_, filter)| {
                filter
                    .as_ref()
                    .map_or(true, |methods| methods.iter().any(|m| m == method))
            })
            .map(|(position, _)| position)
            .collect();
        self.methods
            .write()
            .entry(method)
            .or_insert(chain)
            .clone()
    }
}

/// Routes calls of one proxy through its interceptor chain.
///
/// Generated proxies hold one of these next to their target and forward
/// every method through [`invoke`](Self::invoke).
#[derive(Clone)]
pub struct ProxyDispatcher {
    shape: Arc<ProxyShape>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    component: Arc<str>,
}

impl ProxyDispatcher {
    pub(crate) fn new(shape: Arc<ProxyShape>, interceptors: Vec<Arc<dyn Interceptor>>, component: &str) -> Self {
        Self {
            shape,
            interceptors: interceptors.into(),
            component: component.into(),
        }
    }

    /// Key of the proxied component.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Number of interceptors in the chain.
    pub fn chain_len(&self) -> usize {
        self.interceptors.len()
    }

    /// Runs `method` through the chain.
    ///
    /// `target` performs the real call from the (possibly modified)
    /// arguments. The return value is downcast to `R`; a unit return needs no
    /// value, any other type fails with `InterceptedCallFailure` when the
    /// chain finished without one.
    pub fn invoke<R: Any>(
        &self,
        method: &'static str,
        arguments: Vec<CallArgument>,
        target: &dyn Fn(&[CallArgument]) -> DiResult<CallArgument>,
    ) -> DiResult<R> {
        let chain = self.shape.chain_for(method);
        let mut invocation = Invocation::new(
            &self.component,
            method,
            arguments,
            &self.interceptors,
            &chain,
            target,
        );
        invocation.proceed()?;
        invocation.into_return::<R>()
    }
}

impl std::fmt::Debug for ProxyDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyDispatcher")
            .field("component", &self.component)
            .field("contract", &self.shape.contract().name())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Clones the next argument out of a call's argument list.
#[doc(hidden)]
pub fn argument_from<T: Any + Clone>(
    argument: Option<&CallArgument>,
    component: &str,
    method: &str,
) -> DiResult<T> {
    argument
        .and_then(|argument| {
            let argument: &(dyn Any + Send) = &**argument;
            argument.downcast_ref::<T>()
        })
        .cloned()
        .ok_or_else(|| {
            DiError::intercepted(
                component,
                method,
                format!("expected an argument of type {}", std::any::type_name::<T>()),
            )
        })
}

/// Runs `f`, turning the error of a failed intercepted call back into a
/// `DiError`.
///
/// Proxy methods have the contract's signature, so a chain failure cannot be
/// returned from them; the proxy panics with the `DiError` as payload
/// instead. Panics with any other payload are resumed.
///
/// ```rust
/// use ferrous_ioc::{catch_intercepted, DiError};
///
/// let result = catch_intercepted(|| -> u32 {
///     std::panic::panic_any(DiError::intercepted("calc", "add", "denied"))
/// });
/// assert!(matches!(result, Err(DiError::InterceptedCallFailure { .. })));
/// assert_eq!(catch_intercepted(|| 7).unwrap(), 7);
/// ```
pub fn catch_intercepted<R>(f: impl FnOnce() -> R) -> DiResult<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<DiError>() {
            Ok(error) => Err(*error),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Generates a proxy type for a trait contract.
///
/// The proxy implements the trait by forwarding every listed method through
/// a [`ProxyDispatcher`]. Arguments must be `Clone + Send + 'static` and
/// return types `Send + 'static`. When the chain fails, the proxy panics
/// with the `DiError`; wrap calls in [`catch_intercepted`] to recover it.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{intercept_proxy, interceptor_fn, Component, Container, Resolver};
/// use std::sync::Arc;
///
/// pub trait Calculator: Send + Sync {
///     fn add(&self, a: i32, b: i32) -> i32;
/// }
///
/// struct Plain;
/// impl Calculator for Plain {
///     fn add(&self, a: i32, b: i32) -> i32 { a + b }
/// }
///
/// intercept_proxy! {
///     struct CalculatorProxy for dyn Calculator {
///         fn add(&self, a: i32, b: i32) -> i32;
///     }
/// }
///
/// let container = Container::new();
/// container.register(
///     Component::<dyn Calculator>::named("calculator")
///         .implemented_by(|plain: Arc<Plain>| plain as Arc<dyn Calculator>)
///         .constructor(vec![], |_| Ok(Plain))
///         .interceptor_instance("tenfold", interceptor_fn(|inv| {
///             inv.proceed()?;
///             if let Some(sum) = inv.return_value_mut::<i32>() {
///                 *sum *= 10;
///             }
///             Ok(())
///         }))
///         .proxy(CalculatorProxy::create),
/// ).unwrap();
///
/// let calculator = container.resolve::<dyn Calculator>().unwrap();
/// assert_eq!(calculator.add(1, 2), 30);
/// ```
#[macro_export]
macro_rules! intercept_proxy {
    (
        $(#[$meta:meta])*
        $vis:vis struct $proxy:ident for dyn $contract:path {
            $(
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)*) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $proxy {
            target: ::std::sync::Arc<dyn $contract>,
            dispatcher: $crate::ProxyDispatcher,
        }

        impl $proxy {
            /// Wraps `target` so its calls go through `dispatcher`.
            #[allow(dead_code)]
            $vis fn create(
                target: ::std::sync::Arc<dyn $contract>,
                dispatcher: $crate::ProxyDispatcher,
            ) -> ::std::sync::Arc<dyn $contract> {
                ::std::sync::Arc::new(Self { target, dispatcher })
            }
        }

        impl $contract for $proxy {
            $(
                #[allow(unused_mut, unused_variables)]
                fn $method(&self $(, $arg: $arg_ty)*) $(-> $ret)? {
                    let arguments: ::std::vec::Vec<$crate::CallArgument> =
                        ::std::vec![$(::std::boxed::Box::new($arg) as $crate::CallArgument),*];
                    let target = &self.target;
                    let component = self.dispatcher.component();
                    let call = move |args: &[$crate::CallArgument]| -> $crate::DiResult<$crate::CallArgument> {
                        let mut remaining = args.iter();
                        $(
                            let $arg: $arg_ty = $crate::interception::argument_from::<$arg_ty>(
                                remaining.next(),
                                component,
                                stringify!($method),
                            )?;
                        )*
                        let value = target.$method($($arg),*);
                        ::std::result::Result::Ok(::std::boxed::Box::new(value) as $crate::CallArgument)
                    };
                    match self.dispatcher.invoke(stringify!($method), arguments, &call) {
                        ::std::result::Result::Ok(value) => value,
                        ::std::result::Result::Err(error) => ::std::panic::panic_any(error),
                    }
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_positions_follow_method_filters() {
        let references = vec![
            InterceptorReference::component("audit"),
            InterceptorReference::component("cache").only_for(["get"]),
            InterceptorReference::component("retry").only_for(["get", "put"]),
        ];
        let shape = ProxyShape::new(Contract::of::<str>(), &references);
        assert_eq!(&*shape.chain_for("get"), &[0, 1, 2]);
        assert_eq!(&*shape.chain_for("put"), &[0, 2]);
        assert_eq!(&*shape.chain_for("delete"), &[0]);
    }

    #[test]
    fn foreign_panics_are_resumed() {
        let result = panic::catch_unwind(|| catch_intercepted(|| panic!("boom")));
        assert!(result.is_err());
    }
}
