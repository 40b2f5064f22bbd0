use std::sync::Arc;

use tracing::debug;

use crate::arguments::Overrides;
use crate::error::DiResult;
use crate::key::{AnyArc, ComponentRef, Contract};
use crate::traits::ResolverCore;

use super::context::ScopeId;
use super::kernel::Kernel;

/// Logical context for per-scope components.
///
/// Per-scope components resolved through a scope are shared within it and
/// decommissioned when the scope ends, either through [`end`](Self::end) or
/// when it is dropped. Components of every other lifestyle behave exactly as
/// when resolved from the container.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Component, Container, DiError, Resolver};
/// use std::sync::Arc;
///
/// struct RequestState;
///
/// let container = Container::new();
/// container.register(
///     Component::<RequestState>::named("request_state")
///         .implemented_by_self()
///         .constructor(vec![], |_| Ok(RequestState))
///         .per_scope(),
/// ).unwrap();
///
/// let first = container.create_scope();
/// let second = container.create_scope();
/// let a = first.resolve::<RequestState>().unwrap();
/// assert!(Arc::ptr_eq(&a, &first.resolve::<RequestState>().unwrap()));
/// assert!(!Arc::ptr_eq(&a, &second.resolve::<RequestState>().unwrap()));
///
/// assert!(matches!(
///     container.resolve::<RequestState>(),
///     Err(DiError::NoActiveScope(_))
/// ));
/// first.end();
/// ```
pub struct Scope {
    kernel: Arc<Kernel>,
    id: ScopeId,
}

impl Scope {
    pub(crate) fn new(kernel: Arc<Kernel>) -> Self {
        let id = kernel.new_scope();
        debug!(scope = id.value(), "scope created");
        Self { kernel, id }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Ends the scope, decommissioning its per-scope instances.
    pub fn end(self) {}
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.kernel.end_scope(self.id);
        debug!(scope = self.id.value(), "scope ended");
    }
}

impl ResolverCore for Scope {
    fn resolve_request(
        &self,
        request: &ComponentRef,
        expected: Contract,
        overrides: Option<&Overrides>,
    ) -> DiResult<AnyArc> {
        self.kernel.resolve(request, expected, Some(self.id), overrides)
    }

    fn resolve_every(&self, contract: Contract) -> DiResult<Vec<AnyArc>> {
        self.kernel.resolve_all(contract, Some(self.id))
    }

    fn release_address(&self, address: usize) -> bool {
        self.kernel.release(address)
    }

    fn contains_request(&self, request: &ComponentRef) -> bool {
        self.kernel.has_component(request)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("id", &self.id).finish()
    }
}
