//! Release tracking for activated instances.
//!
//! A [`Burden`] mirrors one activation: the instance, the handler that owns
//! it and a child burden for every dependency that was freshly created for
//! it. Dependencies served from a shared cache are not children, so
//! releasing a root never touches them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::container::ScopeId;
use crate::descriptors::ComponentDescriptor;
use crate::handler::Handler;
use crate::key::AnyArc;

pub(crate) struct Burden {
    descriptor: Arc<ComponentDescriptor>,
    handler: Weak<Handler>,
    /// The implementation instance, handed to lifecycle hooks
    target: AnyArc,
    /// The service in storage form
    service: AnyArc,
    address: usize,
    children: Vec<Arc<Burden>>,
    scope: Option<ScopeId>,
    decommissioned: AtomicBool,
}

pub(crate) struct BurdenParts {
    pub(crate) target: AnyArc,
    pub(crate) service: AnyArc,
    pub(crate) address: usize,
    pub(crate) children: Vec<Arc<Burden>>,
    pub(crate) scope: Option<ScopeId>,
}

impl Burden {
    pub(crate) fn new(handler: &Arc<Handler>, parts: BurdenParts) -> Self {
        Self {
            descriptor: handler.descriptor().clone(),
            handler: Arc::downgrade(handler),
            target: parts.target,
            service: parts.service,
            address: parts.address,
            children: parts.children,
            scope: parts.scope,
            decommissioned: AtomicBool::new(false),
        }
    }

    pub(crate) fn key(&self) -> &str {
        self.descriptor.key()
    }

    pub(crate) fn service(&self) -> &AnyArc {
        &self.service
    }

    pub(crate) fn address(&self) -> usize {
        self.address
    }

    pub(crate) fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    pub(crate) fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    #[cfg(test)]
    pub(crate) fn children(&self) -> &[Arc<Burden>] {
        &self.children
    }

    pub(crate) fn is_decommissioned(&self) -> bool {
        self.decommissioned.load(Ordering::Acquire)
    }

    /// Whether releasing this instance has any effect besides dropping it.
    pub(crate) fn requires_decommission(&self) -> bool {
        self.descriptor.requires_decommission()
            || matches!(self.descriptor.lifestyle(), crate::Lifestyle::Pooled { .. })
            || self.children.iter().any(|child| child.requires_decommission())
    }

    /// Hands the instance back to the lifestyle that owns it.
    pub(crate) fn release(self: &Arc<Self>) {
        match self.handler.upgrade() {
            Some(handler) => handler.lifestyle().release(self),
            None => self.destroy(),
        }
    }

    /// Runs decommission hooks in reverse order, then releases the children.
    /// Only the first call has an effect.
    pub(crate) fn destroy(&self) {
        if self.decommissioned.swap(true, Ordering::AcqRel) {
            return;
        }
        for hook in self.descriptor.decommission.iter().rev() {
            hook(&self.target);
        }
        debug!(component = %self.key(), children = self.children.len(), "decommissioned");
        for child in self.children.iter().rev() {
            child.release();
        }
    }

    /// Runs the pool-reset hooks before the instance is checked in again.
    pub(crate) fn reset_for_pool(&self) {
        for hook in &self.descriptor.pool_reset {
            hook(&self.target);
        }
    }
}

impl std::fmt::Debug for Burden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Burden")
            .field("component", &self.key())
            .field("children", &self.children.len())
            .field("decommissioned", &self.is_decommissioned())
            .finish()
    }
}
