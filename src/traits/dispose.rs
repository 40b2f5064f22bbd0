//! Disposal trait for resource cleanup.

/// Synchronous teardown of a component instance.
///
/// Register with [`ComponentRegistration::dispose_on_release`](crate::ComponentRegistration::dispose_on_release)
/// to run `dispose` as a decommission hook whenever the instance is released
/// or its lifestyle disposes it.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Component, Container, Dispose, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// static FLUSHED: AtomicBool = AtomicBool::new(false);
///
/// struct Cache;
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         FLUSHED.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = Container::new();
/// container.register(
///     Component::<Cache>::named("cache")
///         .implemented_by_self()
///         .constructor(vec![], |_| Ok(Cache))
///         .transient()
///         .dispose_on_release(),
/// ).unwrap();
///
/// let cache = container.resolve::<Cache>().unwrap();
/// assert!(container.release(&cache));
/// assert!(FLUSHED.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
