//! The container and its scopes.

use std::sync::Arc;

use crate::arguments::Overrides;
use crate::config::ContainerConfig;
use crate::convert::Converter;
use crate::descriptors::ComponentDescriptor;
use crate::error::DiResult;
use crate::handler::HandlerState;
use crate::key::{AnyArc, ComponentRef, Contract};
use crate::traits::ResolverCore;

mod context;
pub(crate) mod kernel;
pub(crate) mod registry;
mod scope;

pub(crate) use context::ResolutionContext;
pub use context::ScopeId;
pub use scope::Scope;

use kernel::Kernel;

/// Inversion-of-control container.
///
/// Holds the component registry and every cached instance. Cloning a
/// container is cheap and yields a handle to the same registry. When the last
/// handle (including scopes) is dropped the container is disposed.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Component, Container, DependencyModel, Resolver};
/// use std::sync::Arc;
///
/// trait Repository: Send + Sync {
///     fn name(&self) -> &str;
/// }
///
/// struct MemoryRepository;
/// impl Repository for MemoryRepository {
///     fn name(&self) -> &str { "memory" }
/// }
///
/// struct UserService {
///     repository: Arc<dyn Repository>,
/// }
///
/// let container = Container::new();
/// container.register(
///     Component::<dyn Repository>::named("repository")
///         .implemented_by(|r: Arc<MemoryRepository>| r as Arc<dyn Repository>)
///         .constructor(vec![], |_| Ok(MemoryRepository)),
/// ).unwrap();
/// container.register(
///     Component::<UserService>::named("users")
///         .implemented_by_self()
///         .constructor(vec![DependencyModel::on::<dyn Repository>("repository")], |args| {
///             Ok(UserService { repository: args.get::<dyn Repository>(0)? })
///         })
///         .transient(),
/// ).unwrap();
///
/// let users = container.resolve::<UserService>().unwrap();
/// assert_eq!(users.repository.name(), "memory");
/// assert!(container.has_component("users"));
/// ```
#[derive(Clone)]
pub struct Container {
    kernel: Arc<Kernel>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            kernel: Arc::new(Kernel::new(config)),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        self.kernel.config()
    }

    /// Registers a component.
    ///
    /// Fails with `DuplicateComponent` when the key is taken. Registration
    /// never fails because of missing dependencies: the component is then
    /// left in [`HandlerState::WaitingDependency`] until they are registered.
    pub fn register(&self, component: impl Into<ComponentDescriptor>) -> DiResult<()> {
        self.kernel.register(component.into())
    }

    /// Removes a component and disposes its cached instances.
    ///
    /// Returns `false` if no component was registered under `key`.
    pub fn unregister(&self, key: &str) -> bool {
        self.kernel.unregister(key)
    }

    /// Adds a converter for raw parameters; later converters take precedence.
    pub fn add_converter(&self, converter: Arc<dyn Converter>) {
        self.kernel.add_converter(converter);
    }

    /// Whether a component is registered under a key (`&str`) or for a
    /// contract ([`Contract`]).
    pub fn has_component(&self, request: impl Into<ComponentRef>) -> bool {
        self.kernel.has_component(&request.into())
    }

    pub fn handler_state(&self, key: &str) -> Option<HandlerState> {
        self.kernel.handler_state(key)
    }

    /// Components waiting for dependencies, with what each is missing.
    pub fn waiting_components(&self) -> Vec<(String, Vec<String>)> {
        self.kernel.waiting_components()
    }

    /// Registered keys in registration order.
    pub fn component_keys(&self) -> Vec<String> {
        self.kernel.component_keys()
    }

    /// Opens a logical context for per-scope components.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.kernel.clone())
    }

    /// Number of distinct proxy shapes built so far.
    pub fn proxy_shape_count(&self) -> usize {
        self.kernel.engine().shape_count()
    }

    /// Releases every tracked instance, newest first, then disposes all
    /// cached instances in reverse registration order.
    ///
    /// The registry stays intact; later resolves create new instances.
    pub fn dispose(&self) {
        self.kernel.dispose();
    }
}

impl ResolverCore for Container {
    fn resolve_request(
        &self,
        request: &ComponentRef,
        expected: Contract,
        overrides: Option<&Overrides>,
    ) -> DiResult<AnyArc> {
        self.kernel.resolve(request, expected, None, overrides)
    }

    fn resolve_every(&self, contract: Contract) -> DiResult<Vec<AnyArc>> {
        self.kernel.resolve_all(contract, None)
    }

    fn release_address(&self, address: usize) -> bool {
        self.kernel.release(address)
    }

    fn contains_request(&self, request: &ComponentRef) -> bool {
        self.kernel.has_component(request)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container").field("kernel", &self.kernel).finish()
    }
}
