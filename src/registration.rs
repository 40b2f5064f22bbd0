//! Typed registration builder.
//!
//! `Component::<S>::named(key)` starts a registration for contract `S`;
//! `implemented_by` picks the implementation type and how it becomes an
//! `Arc<S>`. The resulting [`ComponentRegistration`] converts into the
//! type-erased [`ComponentDescriptor`] the container stores.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_ioc::{Component, Container, DependencyModel, Resolver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! trait Transport: Send + Sync {
//!     fn send(&self, payload: &str) -> usize;
//! }
//!
//! struct Tcp { retries: u32 }
//! impl Transport for Tcp {
//!     fn send(&self, payload: &str) -> usize { payload.len() }
//! }
//!
//! static CLOSED: AtomicUsize = AtomicUsize::new(0);
//!
//! let container = Container::new();
//! container.register(
//!     Component::<dyn Transport>::named("tcp")
//!         .implemented_by(|tcp: Arc<Tcp>| tcp as Arc<dyn Transport>)
//!         .constructor(vec![DependencyModel::on::<u32>("retries")], |args| {
//!             Ok(Tcp { retries: args.value::<u32>(0)? })
//!         })
//!         .parameter("retries", "3")
//!         .transient()
//!         .on_decommission(|tcp: &Tcp| {
//!             CLOSED.fetch_add(tcp.retries as usize, Ordering::SeqCst);
//!         }),
//! ).unwrap();
//!
//! let transport = container.resolve::<dyn Transport>().unwrap();
//! assert_eq!(transport.send("ping"), 4);
//! container.release(&transport);
//! assert_eq!(CLOSED.load(Ordering::SeqCst), 3);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::arguments::{Arguments, DependencyValue};
use crate::config::PoolWait;
use crate::descriptors::{
    CommissionFn, ComponentDescriptor, ConstructFn, ConstructorCandidate, DependencyKind, DependencyModel,
    InjectFn, InstanceHook, InterceptorReference, PropertyDependency, Published, PublishFn, RawInstance,
};
use crate::error::{BoxError, DiError, DiResult};
use crate::interception::{Interceptor, ProxyDispatcher};
use crate::key::{instance_address, service_value, AnyArc, Contract};
use crate::lifestyle::Lifestyle;
use crate::traits::Dispose;

type CastFn<S, I> = Arc<dyn Fn(Arc<I>) -> Arc<S> + Send + Sync>;
type ProxyFn<S> = Arc<dyn Fn(Arc<S>, ProxyDispatcher) -> Arc<S> + Send + Sync>;

/// Entry point of the registration builder for contract `S`.
pub struct Component<S: ?Sized>(PhantomData<fn() -> Box<S>>);

impl<S: ?Sized + Send + Sync + 'static> Component<S> {
    /// Starts a registration under the unique `key`.
    pub fn named(key: impl Into<String>) -> ComponentBuilder<S> {
        ComponentBuilder {
            key: key.into(),
            _contract: PhantomData,
        }
    }
}

/// A registration that still needs its implementation type.
pub struct ComponentBuilder<S: ?Sized> {
    key: String,
    _contract: PhantomData<fn() -> Box<S>>,
}

impl<S: ?Sized + Send + Sync + 'static> ComponentBuilder<S> {
    /// Implementation type `I`, exposed as `S` through `cast`
    /// (typically `|i: Arc<I>| i as Arc<dyn Trait>`).
    pub fn implemented_by<I, F>(self, cast: F) -> ComponentRegistration<S, I>
    where
        I: Send + Sync + 'static,
        F: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
    {
        ComponentRegistration {
            key: self.key,
            constructors: Vec::new(),
            properties: Vec::new(),
            lifestyle: Lifestyle::default(),
            pool_wait: None,
            interceptors: Vec::new(),
            parameters: HashMap::new(),
            extended_properties: HashMap::new(),
            commission: Vec::new(),
            decommission: Vec::new(),
            pool_reset: Vec::new(),
            cast: Arc::new(cast),
            proxy: None,
        }
    }
}

impl<S: Send + Sync + 'static> ComponentBuilder<S> {
    /// The contract is its own implementation.
    pub fn implemented_by_self(self) -> ComponentRegistration<S, S> {
        self.implemented_by(|instance: Arc<S>| instance)
    }
}

/// Registration of contract `S` implemented by `I`.
#[must_use = "a registration does nothing until it is passed to Container::register"]
pub struct ComponentRegistration<S: ?Sized, I> {
    key: String,
    constructors: Vec<ConstructorCandidate>,
    properties: Vec<PropertyDependency>,
    lifestyle: Lifestyle,
    pool_wait: Option<PoolWait>,
    interceptors: Vec<InterceptorReference>,
    parameters: HashMap<String, String>,
    extended_properties: HashMap<String, Arc<dyn Any + Send + Sync>>,
    commission: Vec<CommissionFn>,
    decommission: Vec<InstanceHook>,
    pool_reset: Vec<InstanceHook>,
    cast: CastFn<S, I>,
    proxy: Option<ProxyFn<S>>,
}

fn instance_mut<I: Any>(raw: &mut RawInstance) -> DiResult<&mut I> {
    let raw: &mut (dyn Any + Send + Sync) = &mut **raw;
    raw.downcast_mut::<I>()
        .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<I>().to_string()))
}

fn instance_hook<I: Any, F: Fn(&I) + Send + Sync + 'static>(hook: F) -> InstanceHook {
    Arc::new(move |target: &AnyArc| {
        let target: &(dyn Any + Send + Sync) = &**target;
        if let Some(instance) = target.downcast_ref::<I>() {
            hook(instance);
        }
    })
}

impl<S: ?Sized + Send + Sync + 'static, I: Send + Sync + 'static> ComponentRegistration<S, I> {
    /// Adds a constructor candidate.
    ///
    /// `dependencies` are resolved in order and handed to `construct` as
    /// [`Arguments`]. When several candidates are declared the container picks
    /// the one whose dependencies can be satisfied best.
    pub fn constructor<F>(mut self, dependencies: Vec<DependencyModel>, construct: F) -> Self
    where
        F: Fn(&Arguments) -> Result<I, BoxError> + Send + Sync + 'static,
    {
        let construct: ConstructFn = Arc::new(move |arguments: &Arguments| {
            construct(arguments).map(|instance| Box::new(instance) as RawInstance)
        });
        self.constructors.push(ConstructorCandidate {
            dependencies: dependencies
                .into_iter()
                .map(|dependency| dependency.with_kind(DependencyKind::ConstructorParameter))
                .collect(),
            construct,
        });
        self
    }

    fn push_property<F>(mut self, dependency: DependencyModel, inject: F) -> Self
    where
        F: Fn(&mut I, DependencyValue) -> DiResult<()> + Send + Sync + 'static,
    {
        let inject: InjectFn = Arc::new(move |raw: &mut RawInstance, value: DependencyValue| {
            inject(instance_mut::<I>(raw)?, value)
        });
        self.properties.push(PropertyDependency {
            dependency: dependency.with_kind(DependencyKind::Property),
            inject,
        });
        self
    }

    /// Optional dependency on a single `P`, injected after construction.
    ///
    /// Left unset (and logged) when it cannot be resolved.
    pub fn property<P, F>(self, name: impl Into<String>, setter: F) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
        F: Fn(&mut I, Arc<P>) + Send + Sync + 'static,
    {
        self.push_property(DependencyModel::on::<P>(name), move |instance, value| {
            setter(instance, value.single::<P>()?);
            Ok(())
        })
    }

    /// Optional dependency on the component registered under `key`.
    pub fn property_ref<P, F>(self, name: impl Into<String>, key: impl Into<String>, setter: F) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
        F: Fn(&mut I, Arc<P>) + Send + Sync + 'static,
    {
        self.push_property(
            DependencyModel::on::<P>(name).with_reference(key),
            move |instance, value| {
                setter(instance, value.single::<P>()?);
                Ok(())
            },
        )
    }

    /// Every component of contract `P`, injected after construction.
    pub fn property_all<P, F>(self, name: impl Into<String>, setter: F) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
        F: Fn(&mut I, Vec<Arc<P>>) + Send + Sync + 'static,
    {
        self.push_property(DependencyModel::all::<P>(name), move |instance, value| {
            setter(instance, value.many::<P>()?);
            Ok(())
        })
    }

    /// Raw value for the dependency called `name`, converted to the
    /// dependency's type by the container's converters.
    pub fn parameter(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), raw.into());
        self
    }

    /// Opaque metadata, readable through [`ComponentDescriptor::extended_property`].
    pub fn extended_property<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.extended_properties.insert(name.into(), Arc::new(value));
        self
    }

    pub fn lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.lifestyle = lifestyle;
        self
    }

    pub fn transient(self) -> Self {
        self.lifestyle(Lifestyle::Transient)
    }

    pub fn singleton(self) -> Self {
        self.lifestyle(Lifestyle::Singleton)
    }

    pub fn per_scope(self) -> Self {
        self.lifestyle(Lifestyle::PerScope)
    }

    pub fn pooled(self, min: usize, max: usize) -> Self {
        self.lifestyle(Lifestyle::Pooled { min, max })
    }

    /// Wait policy of a pooled component; defaults to the container's.
    pub fn pool_wait(mut self, wait: PoolWait) -> Self {
        self.pool_wait = Some(wait);
        self
    }

    /// Appends the interceptor registered as a component under `key`.
    pub fn interceptor(self, key: impl Into<String>) -> Self {
        self.interceptor_ref(InterceptorReference::component(key))
    }

    /// Appends a fixed interceptor instance.
    pub fn interceptor_instance(self, id: impl Into<String>, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor_ref(InterceptorReference::instance(id, interceptor))
    }

    pub fn interceptor_ref(mut self, reference: InterceptorReference) -> Self {
        self.interceptors.push(reference);
        self
    }

    /// Proxy factory used when interceptors are declared, usually the
    /// `create` function generated by [`intercept_proxy!`](crate::intercept_proxy).
    pub fn proxy<F>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<S>, ProxyDispatcher) -> Arc<S> + Send + Sync + 'static,
    {
        self.proxy = Some(Arc::new(factory));
        self
    }

    /// Runs after construction and property injection, in declaration order.
    pub fn on_commission<F: Fn(&mut I) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.commission.push(Arc::new(move |raw: &mut RawInstance| {
            if let Ok(instance) = instance_mut::<I>(raw) {
                hook(instance);
            }
        }));
        self
    }

    /// Runs when the instance is released or disposed, in reverse declaration order.
    pub fn on_decommission<F: Fn(&I) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.decommission.push(instance_hook(hook));
        self
    }

    /// Runs when a pooled instance is returned to the free list.
    pub fn on_pool_return<F: Fn(&I) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.pool_reset.push(instance_hook(hook));
        self
    }
}

impl<S: ?Sized + Send + Sync + 'static, I: Dispose> ComponentRegistration<S, I> {
    /// Calls [`Dispose::dispose`] when the instance is decommissioned.
    pub fn dispose_on_release(self) -> Self {
        self.on_decommission(|instance: &I| instance.dispose())
    }
}

impl<S: ?Sized + Send + Sync + 'static, I: Send + Sync + 'static> From<ComponentRegistration<S, I>>
    for ComponentDescriptor
{
    fn from(registration: ComponentRegistration<S, I>) -> Self {
        let key = registration.key.clone();
        let cast = registration.cast;
        let proxy = registration.proxy;
        let has_proxy = proxy.is_some();

        let publish: PublishFn = Arc::new(move |raw: RawInstance, dispatcher: Option<ProxyDispatcher>| {
            let instance: Arc<I> = raw
                .downcast::<I>()
                .map(|boxed| Arc::<I>::from(boxed))
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>().to_string()))?;
            let service = cast(instance.clone());
            let service = match (dispatcher, proxy.as_ref()) {
                (Some(dispatcher), Some(proxy)) => proxy(service, dispatcher),
                (Some(_), None) => {
                    return Err(DiError::InvalidComponent {
                        component: key.clone(),
                        reason: "interceptors declared without a proxy factory".to_string(),
                    })
                }
                (None, _) => service,
            };
            let address = instance_address(&service);
            let target: AnyArc = instance;
            Ok(Published {
                target,
                service: service_value(service),
                address,
            })
        });

        ComponentDescriptor {
            key: registration.key,
            contract: Contract::of::<S>(),
            implementation: Contract::of::<I>(),
            constructors: registration.constructors,
            properties: registration.properties,
            lifestyle: registration.lifestyle,
            pool_wait: registration.pool_wait,
            interceptors: registration.interceptors,
            parameters: registration.parameters,
            extended_properties: registration.extended_properties,
            commission: registration.commission,
            decommission: registration.decommission,
            pool_reset: registration.pool_reset,
            publish,
            has_proxy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Engine {
        cylinders: u8,
        tuned: bool,
    }

    #[test]
    fn descriptor_carries_registration_metadata() {
        let descriptor: ComponentDescriptor = Component::<Engine>::named("engine")
            .implemented_by_self()
            .constructor(vec![DependencyModel::on::<u8>("cylinders")], |args| {
                Ok(Engine { cylinders: args.value::<u8>(0)?, tuned: false })
            })
            .parameter("cylinders", "6")
            .extended_property("vendor", "acme")
            .pooled(1, 3)
            .into();

        assert_eq!(descriptor.key(), "engine");
        assert_eq!(descriptor.parameter("cylinders"), Some("6"));
        assert_eq!(descriptor.extended_property::<&str>("vendor"), Some(&"acme"));
        assert_eq!(descriptor.lifestyle(), Lifestyle::Pooled { min: 1, max: 3 });
        assert_eq!(
            descriptor.constructors()[0].dependencies()[0].kind(),
            DependencyKind::ConstructorParameter
        );
        assert!(descriptor.structural_problem().is_none());
    }

    #[test]
    fn hooks_see_the_implementation() {
        let descriptor: ComponentDescriptor = Component::<Engine>::named("engine")
            .implemented_by_self()
            .constructor(vec![], |_| Ok(Engine { cylinders: 4, tuned: false }))
            .on_commission(|engine: &mut Engine| engine.tuned = true)
            .into();

        let candidate = &descriptor.constructors()[0];
        let mut raw = (candidate.construct)(&Arguments::default()).unwrap();
        for hook in &descriptor.commission {
            hook(&mut raw);
        }
        let published = (descriptor.publish)(raw, None).unwrap();
        let engine = crate::key::downcast_service::<Engine>(published.service).unwrap();
        assert!(engine.tuned);
        assert_eq!(engine.cylinders, 4);
    }

    #[test]
    fn interceptors_without_proxy_are_structurally_invalid() {
        let descriptor: ComponentDescriptor = Component::<Engine>::named("engine")
            .implemented_by_self()
            .constructor(vec![], |_| Ok(Engine { cylinders: 4, tuned: false }))
            .interceptor("audit")
            .into();
        assert!(descriptor.structural_problem().is_some());
    }
}
