//! Lifestyles: how long component instances live and who shares them.
//!
//! Each registered component gets one [`LifestyleManager`] chosen from its
//! [`Lifestyle`]. The manager decides whether a resolve hits a cache or asks
//! the activator for a fresh instance, and what releasing an instance means.

use std::sync::Arc;

use crate::burden::Burden;
use crate::config::PoolWait;
use crate::container::{ResolutionContext, ScopeId};
use crate::error::DiResult;
use crate::handler::Handler;

mod pooled;
mod scoped;
mod singleton;
mod transient;

pub(crate) use pooled::PooledLifestyle;
pub(crate) use scoped::PerScopeLifestyle;
pub(crate) use singleton::SingletonLifestyle;
pub(crate) use transient::TransientLifestyle;

/// Instance lifetime policy of a component.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Component, ComponentDescriptor, Lifestyle};
///
/// struct Connection;
///
/// let descriptor: ComponentDescriptor = Component::<Connection>::named("connection")
///     .implemented_by_self()
///     .constructor(vec![], |_| Ok(Connection))
///     .pooled(1, 4)
///     .into();
/// assert_eq!(descriptor.lifestyle(), Lifestyle::Pooled { min: 1, max: 4 });
/// assert_eq!(Lifestyle::default(), Lifestyle::Singleton);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifestyle {
    /// A new instance for every resolve
    Transient,
    /// One instance per container
    #[default]
    Singleton,
    /// One instance per [`Scope`](crate::Scope)
    PerScope,
    /// Instances are recycled through a bounded pool
    Pooled { min: usize, max: usize },
}

impl Lifestyle {
    /// Whether instances resolved as dependencies are owned by a cache rather
    /// than by the consumer's burden.
    pub fn is_shared(&self) -> bool {
        matches!(self, Lifestyle::Singleton | Lifestyle::PerScope)
    }
}

/// Caching policy bound to a single handler.
pub(crate) trait LifestyleManager: Send + Sync {
    /// Returns a cached burden or activates a new one.
    fn resolve(&self, handler: &Arc<Handler>, ctx: &ResolutionContext<'_>) -> DiResult<Arc<Burden>>;

    /// Gives an instance back; what happens depends on the policy.
    fn release(&self, burden: &Arc<Burden>);

    /// Whether the container must remember a root resolved through this
    /// lifestyle so a later release can find it.
    fn track_root(&self, _burden: &Arc<Burden>) -> bool {
        true
    }

    /// Destroys every instance owned by `scope`.
    fn end_scope(&self, _scope: ScopeId) {}

    /// Destroys every cached instance.
    fn dispose(&self);
}

pub(crate) fn manager_for(lifestyle: Lifestyle, pool_wait: PoolWait) -> Box<dyn LifestyleManager> {
    match lifestyle {
        Lifestyle::Transient => Box::new(TransientLifestyle),
        Lifestyle::Singleton => Box::new(SingletonLifestyle::default()),
        Lifestyle::PerScope => Box::new(PerScopeLifestyle::default()),
        Lifestyle::Pooled { min, max } => Box::new(PooledLifestyle::new(min, max, pool_wait)),
    }
}
