use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::arguments::Arguments;
use crate::container::ResolutionContext;
use crate::descriptors::{ComponentDescriptor, ConstructorCandidate, InterceptorTarget, RawInstance};
use crate::error::{DiError, DiResult};
use crate::key::Contract;
use crate::resolver;

use super::proxy::{ProxyDispatcher, ProxyShape};
use super::Interceptor;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShapeKey {
    contract: Contract,
    chain: Vec<String>,
}

/// Builds intercepted instances and caches proxy shapes.
#[derive(Default)]
pub(crate) struct InterceptionEngine {
    shapes: RwLock<HashMap<ShapeKey, Arc<ProxyShape>>>,
}

impl InterceptionEngine {
    pub(crate) fn shape_count(&self) -> usize {
        self.shapes.read().len()
    }

    fn shape_for(&self, descriptor: &ComponentDescriptor) -> Arc<ProxyShape> {
        let key = ShapeKey {
            contract: descriptor.contract(),
            chain: descriptor
                .interceptors()
                .iter()
                .map(|reference| reference.identity())
                .collect(),
        };
        if let Some(shape) = self.shapes.read().get(&key) {
            return shape.clone();
        }

        let mut shapes = self.shapes.write();
        shapes
            .entry(key)
            .or_insert_with(|| {
                debug!(
                    component = %descriptor.key(),
                    contract = %descriptor.contract(),
                    interceptors = descriptor.interceptors().len(),
                    "proxy shape created"
                );
                Arc::new(ProxyShape::new(descriptor.contract(), descriptor.interceptors()))
            })
            .clone()
    }

    /// Resolves the interceptor chain, then constructs the target.
    ///
    /// Returns the raw target and the dispatcher its proxy will use; the
    /// proxy itself is created when the instance is published.
    pub(crate) fn create_intercepted(
        &self,
        ctx: &ResolutionContext<'_>,
        descriptor: &ComponentDescriptor,
        candidate: &ConstructorCandidate,
        arguments: &Arguments,
    ) -> DiResult<(RawInstance, ProxyDispatcher)> {
        let shape = self.shape_for(descriptor);

        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::with_capacity(descriptor.interceptors().len());
        for reference in descriptor.interceptors() {
            match reference.target() {
                InterceptorTarget::Component(key) => {
                    interceptors.push(resolver::resolve_interceptor(ctx, descriptor, key)?);
                }
                InterceptorTarget::Instance { interceptor, .. } => interceptors.push(interceptor.clone()),
            }
        }

        let target = (candidate.construct)(arguments)
            .map_err(|source| DiError::activation(descriptor.key(), source))?;
        Ok((target, ProxyDispatcher::new(shape, interceptors, descriptor.key())))
    }
}
