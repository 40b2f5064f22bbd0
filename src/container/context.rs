//! Per-request resolution state.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::trace;

use crate::arguments::Overrides;
use crate::burden::Burden;
use crate::descriptors::DependencyModel;
use crate::error::{DiError, DiResult};
use crate::internal::{circular_path, StackGuard};

use super::kernel::Kernel;

/// Identifier of a logical context created by [`Container::create_scope`](crate::Container::create_scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

pub(crate) struct Frame {
    consumer: String,
    dependency: String,
}

/// Mutable state of one top-level resolve.
///
/// Holds the stack of (consumer, dependency) pairs and of components being
/// activated, plus the child burdens collected for the activations in
/// progress. A context is created per request and never crosses threads.
pub(crate) struct ResolutionContext<'a> {
    kernel: &'a Kernel,
    scope: Option<ScopeId>,
    overrides: Option<&'a Overrides>,
    frames: RefCell<Vec<Frame>>,
    components: RefCell<Vec<String>>,
    collectors: RefCell<Vec<Vec<Arc<Burden>>>>,
}

impl<'a> ResolutionContext<'a> {
    pub(crate) fn new(kernel: &'a Kernel, scope: Option<ScopeId>, overrides: Option<&'a Overrides>) -> Self {
        Self {
            kernel,
            scope,
            overrides,
            frames: RefCell::new(Vec::new()),
            components: RefCell::new(Vec::new()),
            collectors: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn kernel(&self) -> &'a Kernel {
        self.kernel
    }

    pub(crate) fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Pushes the component about to be activated.
    pub(crate) fn enter_component(&self, key: &str) -> DiResult<StackGuard<'_, String>> {
        {
            let components = self.components.borrow();
            if components.iter().any(|entry| entry == key) {
                return Err(circular_path(components.iter().map(String::as_str), key));
            }
            let max_depth = self.kernel.config().max_depth;
            if components.len() >= max_depth {
                return Err(DiError::DepthExceeded(max_depth));
            }
        }
        Ok(StackGuard::push(&self.components, key.to_string()))
    }

    /// Pushes a (consumer, dependency) pair, failing if it is already on the stack.
    pub(crate) fn enter_dependency(
        &self,
        consumer: &str,
        dependency: &DependencyModel,
    ) -> DiResult<StackGuard<'_, Frame>> {
        let identity = dependency.identity();
        {
            let frames = self.frames.borrow();
            if frames
                .iter()
                .any(|frame| frame.consumer == consumer && frame.dependency == identity)
            {
                return Err(circular_path(
                    frames.iter().map(|frame| frame.consumer.as_str()),
                    consumer,
                ));
            }
        }
        trace!(consumer, dependency = %identity, "resolving dependency");
        Ok(StackGuard::push(
            &self.frames,
            Frame {
                consumer: consumer.to_string(),
                dependency: identity,
            },
        ))
    }

    /// Overrides apply to the dependencies of the root component only.
    pub(crate) fn overrides_for(&self, consumer: &str) -> Option<&'a Overrides> {
        let overrides = self.overrides?;
        let components = self.components.borrow();
        (components.len() == 1 && components[0] == consumer).then_some(overrides)
    }

    pub(crate) fn has_overrides_for(&self, consumer: &str) -> bool {
        self.overrides_for(consumer)
            .map_or(false, |overrides| !overrides.is_empty())
    }

    /// Starts collecting the fresh dependencies of an activation.
    pub(crate) fn collect_children(&self) -> ChildCollector<'_, 'a> {
        self.collectors.borrow_mut().push(Vec::new());
        ChildCollector {
            ctx: self,
            finished: false,
        }
    }

    /// Records `burden` as a child of the innermost activation in progress.
    pub(crate) fn attach_child(&self, burden: Arc<Burden>) {
        if let Some(children) = self.collectors.borrow_mut().last_mut() {
            children.push(burden);
        }
    }
}

/// Children collected for one activation.
///
/// Dropping an unfinished collector releases everything it collected, so a
/// failed activation leaves no partial objects behind.
pub(crate) struct ChildCollector<'c, 'a> {
    ctx: &'c ResolutionContext<'a>,
    finished: bool,
}

impl ChildCollector<'_, '_> {
    pub(crate) fn finish(mut self) -> Vec<Arc<Burden>> {
        self.finished = true;
        self.ctx.collectors.borrow_mut().pop().unwrap_or_default()
    }
}

impl Drop for ChildCollector<'_, '_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let children = self.ctx.collectors.borrow_mut().pop().unwrap_or_default();
        for child in children.into_iter().rev() {
            child.release();
        }
    }
}
