//! Component descriptors and dependency models.
//!
//! A [`ComponentDescriptor`] is the immutable, type-erased form of a
//! registration. It is produced by the typed builder in
//! [`registration`](crate::registration) and owned by the registry once the
//! component is registered.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::arguments::{Arguments, DependencyValue};
use crate::config::PoolWait;
use crate::error::{BoxError, DiResult};
use crate::interception::{Interceptor, ProxyDispatcher};
use crate::key::{AnyArc, Contract};
use crate::lifestyle::Lifestyle;

/// A constructed instance before it is shared.
pub type RawInstance = Box<dyn Any + Send + Sync>;

pub(crate) type ConstructFn =
    Arc<dyn Fn(&Arguments) -> Result<RawInstance, BoxError> + Send + Sync>;
pub(crate) type InjectFn = Arc<dyn Fn(&mut RawInstance, DependencyValue) -> DiResult<()> + Send + Sync>;
pub(crate) type CommissionFn = Arc<dyn Fn(&mut RawInstance) + Send + Sync>;
pub(crate) type InstanceHook = Arc<dyn Fn(&AnyArc) + Send + Sync>;
pub(crate) type PublishFn =
    Arc<dyn Fn(RawInstance, Option<ProxyDispatcher>) -> DiResult<Published> + Send + Sync>;

/// Where a dependency is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Mandatory constructor argument
    ConstructorParameter,
    /// Optional settable property
    Property,
}

/// A single slot to be filled during activation.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{contract_of, DependencyModel};
///
/// trait Store: Send + Sync {}
///
/// let dependency = DependencyModel::on::<dyn Store>("store").with_reference("primary_store");
/// assert_eq!(dependency.name(), "store");
/// assert_eq!(dependency.target(), contract_of::<dyn Store>());
/// assert_eq!(dependency.reference(), Some("primary_store"));
/// assert!(!dependency.is_collection());
/// ```
#[derive(Debug, Clone)]
pub struct DependencyModel {
    name: String,
    target: Contract,
    reference: Option<String>,
    kind: DependencyKind,
    collection: bool,
}

impl DependencyModel {
    /// Dependency on a single service of contract `T`, identified by parameter `name`.
    pub fn on<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: Contract::of::<T>(),
            reference: None,
            kind: DependencyKind::ConstructorParameter,
            collection: false,
        }
    }

    /// Dependency on every service registered for contract `T`.
    pub fn all<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            collection: true,
            ..Self::on::<T>(name)
        }
    }

    /// Pins the dependency to the component registered under `key`.
    pub fn with_reference(mut self, key: impl Into<String>) -> Self {
        self.reference = Some(key.into());
        self
    }

    pub(crate) fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Contract {
        self.target
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Identity used on the resolution stack.
    pub(crate) fn identity(&self) -> String {
        match &self.reference {
            Some(reference) => format!("{}@{}", self.name, reference),
            None => format!("{}:{}", self.name, self.target.name()),
        }
    }

    /// What to report when nothing satisfies the dependency.
    pub(crate) fn requested(&self) -> String {
        match &self.reference {
            Some(reference) => format!("'{}' ({})", reference, self.target.name()),
            None => self.target.name().to_string(),
        }
    }
}

/// One constructor of an implementation.
#[derive(Clone)]
pub struct ConstructorCandidate {
    pub(crate) dependencies: Vec<DependencyModel>,
    pub(crate) construct: ConstructFn,
}

impl ConstructorCandidate {
    pub fn dependencies(&self) -> &[DependencyModel] {
        &self.dependencies
    }
}

impl std::fmt::Debug for ConstructorCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorCandidate")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// A settable property and its injector.
#[derive(Clone)]
pub struct PropertyDependency {
    pub(crate) dependency: DependencyModel,
    pub(crate) inject: InjectFn,
}

impl PropertyDependency {
    pub fn dependency(&self) -> &DependencyModel {
        &self.dependency
    }
}

impl std::fmt::Debug for PropertyDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyDependency")
            .field("dependency", &self.dependency)
            .finish_non_exhaustive()
    }
}

/// How an interceptor in a component's chain is obtained.
#[derive(Clone)]
pub enum InterceptorTarget {
    /// Resolved from the container by component key (contract `dyn Interceptor`)
    Component(String),
    /// A fixed instance, identified by `id` for proxy shape caching
    Instance {
        id: String,
        interceptor: Arc<dyn Interceptor>,
    },
}

/// An entry in a component's interceptor chain.
#[derive(Clone)]
pub struct InterceptorReference {
    pub(crate) target: InterceptorTarget,
    pub(crate) methods: Option<Vec<String>>,
}

impl InterceptorReference {
    /// Interceptor registered as a component under `key`.
    pub fn component(key: impl Into<String>) -> Self {
        Self {
            target: InterceptorTarget::Component(key.into()),
            methods: None,
        }
    }

    /// Interceptor supplied as an instance.
    pub fn instance(id: impl Into<String>, interceptor: Arc<dyn Interceptor>) -> Self {
        Self {
            target: InterceptorTarget::Instance {
                id: id.into(),
                interceptor,
            },
            methods: None,
        }
    }

    /// Restricts the interceptor to the named contract methods.
    pub fn only_for<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn target(&self) -> &InterceptorTarget {
        &self.target
    }

    /// Stable identity of this entry, part of the proxy shape.
    pub fn identity(&self) -> String {
        let base = match &self.target {
            InterceptorTarget::Component(key) => format!("component:{}", key),
            InterceptorTarget::Instance { id, .. } => format!("instance:{}", id),
        };
        match &self.methods {
            Some(methods) => format!("{}[{}]", base, methods.join(",")),
            None => base,
        }
    }
}

impl std::fmt::Debug for InterceptorReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identity())
    }
}

/// Result of publishing a raw instance.
pub(crate) struct Published {
    /// The implementation instance, `Arc<I>` erased
    pub(crate) target: AnyArc,
    /// The service handed to consumers, in storage form
    pub(crate) service: AnyArc,
    /// Address of the service the consumer sees
    pub(crate) address: usize,
}

/// Immutable registration metadata for one component.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Component, ComponentDescriptor, Lifestyle, contract_of};
///
/// struct Clock;
///
/// let descriptor: ComponentDescriptor = Component::<Clock>::named("clock")
///     .implemented_by_self()
///     .constructor(vec![], |_| Ok(Clock))
///     .transient()
///     .into();
///
/// assert_eq!(descriptor.key(), "clock");
/// assert_eq!(descriptor.contract(), contract_of::<Clock>());
/// assert_eq!(descriptor.lifestyle(), Lifestyle::Transient);
/// assert_eq!(descriptor.constructors().len(), 1);
/// ```
pub struct ComponentDescriptor {
    pub(crate) key: String,
    pub(crate) contract: Contract,
    pub(crate) implementation: Contract,
    pub(crate) constructors: Vec<ConstructorCandidate>,
    pub(crate) properties: Vec<PropertyDependency>,
    pub(crate) lifestyle: Lifestyle,
    pub(crate) pool_wait: Option<PoolWait>,
    pub(crate) interceptors: Vec<InterceptorReference>,
    pub(crate) parameters: HashMap<String, String>,
    pub(crate) extended_properties: HashMap<String, Arc<dyn Any + Send + Sync>>,
    pub(crate) commission: Vec<CommissionFn>,
    pub(crate) decommission: Vec<InstanceHook>,
    pub(crate) pool_reset: Vec<InstanceHook>,
    pub(crate) publish: PublishFn,
    pub(crate) has_proxy: bool,
}

impl ComponentDescriptor {
    /// Unique key within the container.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The contract consumers request.
    pub fn contract(&self) -> Contract {
        self.contract
    }

    /// The implementation type.
    pub fn implementation(&self) -> Contract {
        self.implementation
    }

    pub fn constructors(&self) -> &[ConstructorCandidate] {
        &self.constructors
    }

    pub fn properties(&self) -> &[PropertyDependency] {
        &self.properties
    }

    pub fn lifestyle(&self) -> Lifestyle {
        self.lifestyle
    }

    pub fn interceptors(&self) -> &[InterceptorReference] {
        &self.interceptors
    }

    /// Raw configuration value for a dependency name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Typed view of an extended property.
    pub fn extended_property<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.extended_properties.get(name)?.downcast_ref::<T>()
    }

    /// Whether releasing an instance has observable side effects.
    pub fn requires_decommission(&self) -> bool {
        !self.decommission.is_empty()
    }

    /// Describes why the descriptor can never be activated, if it cannot.
    pub(crate) fn structural_problem(&self) -> Option<String> {
        if self.constructors.is_empty() {
            return Some("no constructor candidates".to_string());
        }
        if !self.interceptors.is_empty() && !self.has_proxy {
            return Some("interceptors declared without a proxy factory".to_string());
        }
        if let Lifestyle::Pooled { min, max } = self.lifestyle {
            if max == 0 {
                return Some("pool maximum must be at least 1".to_string());
            }
            if min > max {
                return Some(format!("pool minimum {} exceeds maximum {}", min, max));
            }
        }
        None
    }
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("key", &self.key)
            .field("contract", &self.contract.name())
            .field("implementation", &self.implementation.name())
            .field("constructors", &self.constructors)
            .field("properties", &self.properties)
            .field("lifestyle", &self.lifestyle)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}
