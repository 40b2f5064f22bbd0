//! # ferrous-ioc
//!
//! Inversion-of-control container for Rust with constructor selection,
//! pluggable lifestyles, release tracking and call interception.
//!
//! ## Features
//!
//! - **Constructor selection**: several constructor candidates per component, scored by which dependencies can be satisfied
//! - **Lifestyles**: Transient, Singleton, PerScope and bounded Pooled instances
//! - **Release tracking**: every resolved graph is tracked and decommissioned in reverse creation order
//! - **Interception**: ordered interceptor chains wrapped around trait-object services
//! - **Handler states**: components with missing dependencies wait until their dependencies arrive
//! - **Circular dependency detection**: cycles fail with the full path instead of looping
//! - **Thread-safe**: one container can be shared freely across threads
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{Component, Container, DependencyModel, Resolver};
//! use std::sync::Arc;
//!
//! trait Repository: Send + Sync {
//!     fn find(&self, id: u32) -> String;
//! }
//!
//! struct MemoryRepository;
//! impl Repository for MemoryRepository {
//!     fn find(&self, id: u32) -> String {
//!         format!("user-{}", id)
//!     }
//! }
//!
//! struct UserService {
//!     repository: Arc<dyn Repository>,
//! }
//!
//! let container = Container::new();
//! container.register(
//!     Component::<dyn Repository>::named("repository")
//!         .implemented_by(|repo: Arc<MemoryRepository>| repo as Arc<dyn Repository>)
//!         .constructor(vec![], |_| Ok(MemoryRepository)),
//! ).unwrap();
//! container.register(
//!     Component::<UserService>::named("users")
//!         .implemented_by_self()
//!         .constructor(vec![DependencyModel::on::<dyn Repository>("repository")], |args| {
//!             Ok(UserService { repository: args.get::<dyn Repository>(0)? })
//!         })
//!         .transient(),
//! ).unwrap();
//!
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.repository.find(7), "user-7");
//! container.release(&users);
//! ```
//!
//! ## Lifestyles
//!
//! - **Singleton** (default): one instance per container, created on first use
//! - **Transient**: a fresh instance on every resolution, tracked until released
//! - **PerScope**: one instance per [`Scope`], decommissioned when the scope ends
//! - **Pooled**: up to `max` instances lent out and returned on release
//!
//! ## Interception
//!
//! ```rust
//! use ferrous_ioc::{
//!     catch_intercepted, intercept_proxy, interceptor_fn, Component, Container, Resolver,
//! };
//! use std::sync::Arc;
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self, name: String) -> String;
//! }
//!
//! struct Plain;
//! impl Greeter for Plain {
//!     fn greet(&self, name: String) -> String {
//!         format!("hello {}", name)
//!     }
//! }
//!
//! intercept_proxy! {
//!     pub struct GreeterProxy for dyn Greeter {
//!         fn greet(&self, name: String) -> String;
//!     }
//! }
//!
//! let container = Container::new();
//! container.register(
//!     Component::<dyn Greeter>::named("greeter")
//!         .implemented_by(|plain: Arc<Plain>| plain as Arc<dyn Greeter>)
//!         .constructor(vec![], |_| Ok(Plain))
//!         .interceptor_instance("shout", interceptor_fn(|invocation| {
//!             invocation.proceed()?;
//!             if let Some(text) = invocation.return_value_mut::<String>() {
//!                 *text = text.to_uppercase();
//!             }
//!             Ok(())
//!         }))
//!         .proxy(GreeterProxy::create),
//! ).unwrap();
//!
//! let greeter = container.resolve::<dyn Greeter>().unwrap();
//! let greeting = catch_intercepted(|| greeter.greet("ada".to_string())).unwrap();
//! assert_eq!(greeting, "HELLO ADA");
//! ```
//!
//! ## Logging
//!
//! The container reports registrations, handler state changes, activations
//! and releases through [`tracing`]. Install any subscriber to see them.

pub mod arguments;
pub mod config;
pub mod container;
pub mod convert;
pub mod descriptors;
pub mod error;
pub mod interception;
pub mod key;
pub mod lifestyle;
pub mod registration;
pub mod traits;

// Internal modules
mod activator;
mod burden;
mod handler;
mod internal;
mod resolver;
mod selector;

// Re-export core types
pub use arguments::{Arguments, DependencyValue, Overrides};
pub use config::{AmbiguityPolicy, ContainerConfig, PoolWait};
pub use container::{Container, Scope, ScopeId};
pub use convert::{Converter, PrimitiveConverter};
pub use descriptors::{
    ComponentDescriptor, ConstructorCandidate, DependencyKind, DependencyModel, InterceptorReference,
    InterceptorTarget, PropertyDependency, RawInstance,
};
pub use error::{BoxError, DiError, DiResult};
pub use handler::HandlerState;
pub use interception::{catch_intercepted, interceptor_fn, CallArgument, Interceptor, Invocation, ProxyDispatcher};
pub use key::{contract_of, downcast_service, service_value, AnyArc, ComponentRef, Contract};
pub use lifestyle::Lifestyle;
pub use registration::{Component, ComponentBuilder, ComponentRegistration};
pub use traits::{Dispose, Resolver, ResolverCore};
