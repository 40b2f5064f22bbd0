//! Call interception.
//!
//! A component that declares interceptors is published behind a proxy that
//! implements its contract. Every call on the proxy becomes an
//! [`Invocation`] that walks the component's ordered interceptor chain and
//! ends in the real call on the target.
//!
//! Proxy types are generated per contract with [`intercept_proxy!`](crate::intercept_proxy);
//! the container caches one proxy shape per
//! (contract, interceptor chain) and hands each proxy a [`ProxyDispatcher`].

use std::sync::Arc;

use crate::error::DiResult;

pub(crate) mod engine;
mod invocation;
mod proxy;

pub use invocation::{CallArgument, Invocation};
pub use proxy::{argument_from, catch_intercepted, ProxyDispatcher};
pub(crate) use engine::InterceptionEngine;

/// Cross-cutting behavior around calls on a proxied component.
///
/// An interceptor calls [`Invocation::proceed`] to continue the chain. It may
/// change arguments before proceeding, replace the return value afterwards,
/// skip `proceed` to short-circuit the call, or inspect and translate the
/// error `proceed` returns.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{DiResult, Interceptor, Invocation};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CallCounter(AtomicUsize);
///
/// impl Interceptor for CallCounter {
///     fn intercept(&self, invocation: &mut Invocation<'_>) -> DiResult<()> {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         invocation.proceed()
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> DiResult<()>;
}

struct FnInterceptor<F>(F);

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> DiResult<()> + Send + Sync,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> DiResult<()> {
        (self.0)(invocation)
    }
}

/// Wraps a closure as an interceptor.
///
/// ```rust
/// use ferrous_ioc::interceptor_fn;
///
/// let tracing = interceptor_fn(|invocation| {
///     let method = invocation.method();
///     let result = invocation.proceed();
///     assert!(!method.is_empty());
///     result
/// });
/// # let _ = tracing;
/// ```
pub fn interceptor_fn<F>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(&mut Invocation<'_>) -> DiResult<()> + Send + Sync + 'static,
{
    Arc::new(FnInterceptor(f))
}
