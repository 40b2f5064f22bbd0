//! Resolved constructor arguments and caller-supplied overrides.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptors::DependencyModel;
use crate::error::{DiError, DiResult};
use crate::key::{downcast_service, service_value, AnyArc, Contract};

/// A resolved dependency value.
#[derive(Clone)]
pub enum DependencyValue {
    /// A single service, in storage form
    One(AnyArc),
    /// Every service of a collection dependency, in registration order
    Many(Vec<AnyArc>),
}

impl std::fmt::Debug for DependencyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyValue::One(_) => f.write_str("One(..)"),
            DependencyValue::Many(values) => write!(f, "Many({})", values.len()),
        }
    }
}

impl DependencyValue {
    /// Typed view of a single value.
    pub fn single<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        match self {
            DependencyValue::One(value) => downcast_service::<S>(value.clone()),
            DependencyValue::Many(_) => Err(DiError::TypeMismatch(format!(
                "expected a single {}, found a collection",
                std::any::type_name::<S>()
            ))),
        }
    }

    /// Typed view of a collection value.
    pub fn many<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<S>>> {
        match self {
            DependencyValue::Many(values) => values
                .iter()
                .map(|value| downcast_service::<S>(value.clone()))
                .collect(),
            DependencyValue::One(value) => Ok(vec![downcast_service::<S>(value.clone())?]),
        }
    }
}

/// Constructor arguments, in the order the constructor declared its dependencies.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Component, Container, DependencyModel, Resolver};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { config: Arc<Config> }
///
/// let container = Container::new();
/// container.register(
///     Component::<Config>::named("config")
///         .implemented_by_self()
///         .constructor(vec![DependencyModel::on::<u16>("port")], |args| {
///             Ok(Config { port: args.value::<u16>(0)? })
///         })
///         .parameter("port", "8080"),
/// ).unwrap();
/// container.register(
///     Component::<Server>::named("server")
///         .implemented_by_self()
///         .constructor(vec![DependencyModel::on::<Config>("config")], |args| {
///             Ok(Server { config: args.get::<Config>(0)? })
///         }),
/// ).unwrap();
///
/// let server = container.resolve::<Server>().unwrap();
/// assert_eq!(server.config.port, 8080);
/// ```
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<(String, DependencyValue)>,
}

impl Arguments {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &str, value: DependencyValue) {
        self.values.push((name.to_string(), value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn at(&self, index: usize) -> DiResult<&DependencyValue> {
        self.values
            .get(index)
            .map(|(_, value)| value)
            .ok_or_else(|| DiError::TypeMismatch(format!("no argument at position {}", index)))
    }

    /// The service at `index`.
    pub fn get<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<S>> {
        self.at(index)?.single::<S>()
    }

    /// The service bound to the dependency called `name`.
    pub fn named<S: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<S>> {
        self.values
            .iter()
            .find(|(candidate, _)| candidate == name)
            .ok_or_else(|| DiError::TypeMismatch(format!("no argument named '{}'", name)))?
            .1
            .single::<S>()
    }

    /// Every service of the collection dependency at `index`.
    pub fn all<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Vec<Arc<S>>> {
        self.at(index)?.many::<S>()
    }

    /// A cloned scalar value at `index`.
    pub fn value<T: Clone + Send + Sync + 'static>(&self, index: usize) -> DiResult<T> {
        self.get::<T>(index).map(|value| (*value).clone())
    }
}

/// Explicit values supplied with a resolve call.
///
/// Overrides are consulted first when the root component's dependencies are
/// resolved: a value keyed by dependency name wins over one keyed by
/// contract. They are not passed on to nested components.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::Overrides;
///
/// let overrides = Overrides::new()
///     .with_value("retries", 5u32)
///     .with_value("endpoint", "https://example.test".to_string());
/// assert_eq!(overrides.len(), 2);
/// ```
#[derive(Clone, Default, Debug)]
pub struct Overrides {
    by_name: HashMap<String, DependencyValue>,
    by_contract: HashMap<Contract, DependencyValue>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies `value` for the dependency called `name`.
    pub fn with_value<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.by_name
            .insert(name.into(), DependencyValue::One(service_value(Arc::new(value))));
        self
    }

    /// Supplies `service` for the dependency called `name`.
    pub fn with_named_service<S: ?Sized + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        service: Arc<S>,
    ) -> Self {
        self.by_name
            .insert(name.into(), DependencyValue::One(service_value(service)));
        self
    }

    /// Supplies `service` for any dependency on contract `S`.
    pub fn with_service<S: ?Sized + Send + Sync + 'static>(mut self, service: Arc<S>) -> Self {
        self.by_contract
            .insert(Contract::of::<S>(), DependencyValue::One(service_value(service)));
        self
    }

    pub fn len(&self) -> usize {
        self.by_name.len() + self.by_contract.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn lookup(&self, dependency: &DependencyModel) -> Option<DependencyValue> {
        self.by_name
            .get(dependency.name())
            .or_else(|| self.by_contract.get(&dependency.target()))
            .cloned()
    }
}
