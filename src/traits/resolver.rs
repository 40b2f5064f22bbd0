//! Resolver traits for component resolution.

use std::sync::Arc;

use tracing::debug;

use crate::arguments::Overrides;
use crate::error::DiResult;
use crate::key::{downcast_service, instance_address, AnyArc, ComponentRef, Contract};

/// Object-safe resolution interface.
///
/// Works on type-erased values; implemented by [`Container`](crate::Container)
/// and [`Scope`](crate::Scope). Most code uses the typed [`Resolver`]
/// methods built on top of it.
pub trait ResolverCore: Send + Sync {
    /// Resolves a component by contract or key.
    ///
    /// `expected` is the contract the caller will downcast to; a key whose
    /// component provides another contract fails with `TypeMismatch` before
    /// anything is activated.
    fn resolve_request(
        &self,
        request: &ComponentRef,
        expected: Contract,
        overrides: Option<&Overrides>,
    ) -> DiResult<AnyArc>;

    /// Resolves every valid component of a contract, in registration order.
    fn resolve_every(&self, contract: Contract) -> DiResult<Vec<AnyArc>>;

    /// Releases the tracked instance at `address`; `false` if none is tracked.
    fn release_address(&self, address: usize) -> bool;

    fn contains_request(&self, request: &ComponentRef) -> bool;
}

/// Typed resolution interface.
///
/// Contracts may be concrete types or trait objects; both come back as
/// `Arc<S>`.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Component, Container, Overrides, Resolver, DependencyModel};
/// use std::sync::Arc;
///
/// struct Greeter { greeting: String }
///
/// let container = Container::new();
/// container.register(
///     Component::<Greeter>::named("greeter")
///         .implemented_by_self()
///         .constructor(vec![DependencyModel::on::<String>("greeting")], |args| {
///             Ok(Greeter { greeting: args.value::<String>(0)? })
///         })
///         .parameter("greeting", "hello")
///         .transient(),
/// ).unwrap();
///
/// assert_eq!(container.resolve::<Greeter>().unwrap().greeting, "hello");
///
/// let overrides = Overrides::new().with_value("greeting", "hi".to_string());
/// let greeter = container.resolve_with::<Greeter>(&overrides).unwrap();
/// assert_eq!(greeter.greeting, "hi");
///
/// assert!(container.try_resolve::<u64>().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the component for contract `S`.
    ///
    /// With several registrations the latest valid one wins, unless the
    /// container is configured with [`AmbiguityPolicy::Strict`](crate::AmbiguityPolicy::Strict).
    fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        let contract = Contract::of::<S>();
        let value = self.resolve_request(&ComponentRef::Contract(contract), contract, None)?;
        downcast_service::<S>(value)
    }

    /// Resolves the component registered under `key`.
    fn resolve_named<S: ?Sized + Send + Sync + 'static>(&self, key: &str) -> DiResult<Arc<S>> {
        let value = self.resolve_request(&ComponentRef::Key(key.to_string()), Contract::of::<S>(), None)?;
        downcast_service::<S>(value)
    }

    /// Resolves `S` with explicit values for the root component's dependencies.
    ///
    /// A singleton or per-scope root is built fresh when `overrides` is not
    /// empty and never replaces the shared instance. Release it like a
    /// transient.
    fn resolve_with<S: ?Sized + Send + Sync + 'static>(&self, overrides: &Overrides) -> DiResult<Arc<S>> {
        let contract = Contract::of::<S>();
        let value = self.resolve_request(&ComponentRef::Contract(contract), contract, Some(overrides))?;
        downcast_service::<S>(value)
    }

    /// Resolves every valid component of contract `S`, in registration order.
    fn resolve_all<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<S>>> {
        self.resolve_every(Contract::of::<S>())?
            .into_iter()
            .map(downcast_service::<S>)
            .collect()
    }

    /// Like [`resolve`](Self::resolve), with any failure mapped to `None`.
    fn try_resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        match self.resolve::<S>() {
            Ok(service) => Some(service),
            Err(error) => {
                debug!(contract = std::any::type_name::<S>(), %error, "try_resolve failed");
                None
            }
        }
    }

    /// Releases an instance obtained from this resolver.
    ///
    /// Decommissions it according to its lifestyle and releases the
    /// dependencies created for it. Returns `false` when the instance is not
    /// tracked, e.g. because it was already released.
    fn release<S: ?Sized>(&self, instance: &Arc<S>) -> bool {
        self.release_address(instance_address(instance))
    }

    /// Whether any component is registered for contract `S`.
    fn contains<S: ?Sized + 'static>(&self) -> bool {
        self.contains_request(&ComponentRef::Contract(Contract::of::<S>()))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
