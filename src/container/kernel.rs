use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::arguments::Overrides;
use crate::burden::Burden;
use crate::config::ContainerConfig;
use crate::convert::{ConversionManager, Converter};
use crate::descriptors::ComponentDescriptor;
use crate::error::DiResult;
use crate::handler::{Handler, HandlerState};
use crate::interception::InterceptionEngine;
use crate::key::{AnyArc, ComponentRef, Contract};
use crate::resolver;

use super::context::{ResolutionContext, ScopeId};
use super::registry::Registry;

/// Roots handed out to callers that a later release has to find.
#[derive(Default)]
struct TrackedRoots {
    next: u64,
    /// By service address: (tracking order, burden)
    roots: HashMap<usize, (u64, Arc<Burden>)>,
}

/// Shared state behind [`Container`](super::Container) and its scopes.
pub(crate) struct Kernel {
    config: ContainerConfig,
    registry: Registry,
    converters: ConversionManager,
    engine: InterceptionEngine,
    tracked: Mutex<TrackedRoots>,
    next_scope: AtomicU64,
    next_sequence: AtomicU64,
}

impl Kernel {
    pub(crate) fn new(config: ContainerConfig) -> Self {
        Self {
            config,
            registry: Registry::default(),
            converters: ConversionManager::default(),
            engine: InterceptionEngine::default(),
            tracked: Mutex::new(TrackedRoots::default()),
            next_scope: AtomicU64::new(1),
            next_sequence: AtomicU64::new(0),
        }
    }

    pub(crate) fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn converters(&self) -> &ConversionManager {
        &self.converters
    }

    pub(crate) fn engine(&self) -> &InterceptionEngine {
        &self.engine
    }

    pub(crate) fn register(&self, descriptor: ComponentDescriptor) -> DiResult<()> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let handler = Arc::new(Handler::new(descriptor, &self.config, sequence));
        let key = handler.key().to_string();
        let lifestyle = handler.descriptor().lifestyle();
        self.registry.insert(handler, &self.converters)?;
        debug!(component = %key, ?lifestyle, "registered");
        Ok(())
    }

    pub(crate) fn unregister(&self, key: &str) -> bool {
        let handler = match self.registry.remove(key, &self.converters) {
            Some(handler) => handler,
            None => return false,
        };

        let orphaned: Vec<Arc<Burden>> = {
            let mut tracked = self.tracked.lock();
            let addresses: Vec<usize> = tracked
                .roots
                .iter()
                .filter(|(_, (_, burden))| Arc::ptr_eq(burden.descriptor(), handler.descriptor()))
                .map(|(address, _)| *address)
                .collect();
            addresses
                .into_iter()
                .filter_map(|address| tracked.roots.remove(&address))
                .map(|(_, burden)| burden)
                .collect()
        };
        for burden in orphaned {
            burden.release();
        }
        handler.lifestyle().dispose();
        debug!(component = %key, "unregistered");
        true
    }

    pub(crate) fn add_converter(&self, converter: Arc<dyn Converter>) {
        self.converters.add(converter);
        self.registry.refresh(&self.converters);
    }

    pub(crate) fn has_component(&self, request: &ComponentRef) -> bool {
        match request {
            ComponentRef::Key(key) => self.registry.by_key(key).is_some(),
            ComponentRef::Contract(contract) => self.registry.has_contract(*contract),
        }
    }

    pub(crate) fn handler_state(&self, key: &str) -> Option<HandlerState> {
        self.registry.by_key(key).map(|handler| handler.state())
    }

    pub(crate) fn waiting_components(&self) -> Vec<(String, Vec<String>)> {
        self.registry
            .all()
            .iter()
            .filter_map(|handler| {
                let status = handler.status();
                (status.state == HandlerState::WaitingDependency)
                    .then(|| (handler.key().to_string(), status.missing))
            })
            .collect()
    }

    pub(crate) fn component_keys(&self) -> Vec<String> {
        self.registry
            .all()
            .iter()
            .map(|handler| handler.key().to_string())
            .collect()
    }

    pub(crate) fn new_scope(&self) -> ScopeId {
        ScopeId::new(self.next_scope.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn end_scope(&self, scope: ScopeId) {
        for handler in self.registry.all().iter().rev() {
            handler.lifestyle().end_scope(scope);
        }
    }

    /// Resolves a top-level request and remembers the root for release.
    pub(crate) fn resolve(
        &self,
        request: &ComponentRef,
        expected: Contract,
        scope: Option<ScopeId>,
        overrides: Option<&Overrides>,
    ) -> DiResult<AnyArc> {
        let ctx = ResolutionContext::new(self, scope, overrides);
        let handler = resolver::select_root(&ctx, request, expected)?;
        let burden = handler.resolve(&ctx)?;
        self.track(&handler, &burden);
        Ok(burden.service().clone())
    }

    /// Resolves every valid component of `contract`, in registration order.
    ///
    /// A failure releases the fresh instances created so far; nothing is
    /// tracked unless every component resolved.
    pub(crate) fn resolve_all(&self, contract: Contract, scope: Option<ScopeId>) -> DiResult<Vec<AnyArc>> {
        let mut resolved: Vec<(Arc<Handler>, Arc<Burden>)> = Vec::new();
        for handler in self.registry.by_contract(contract) {
            if handler.state() != HandlerState::Valid {
                debug!(component = %handler.key(), "skipping handler that is not valid");
                continue;
            }
            let ctx = ResolutionContext::new(self, scope, None);
            match handler.resolve(&ctx) {
                Ok(burden) => resolved.push((handler, burden)),
                Err(error) => {
                    for (handler, burden) in resolved.into_iter().rev() {
                        if !handler.descriptor().lifestyle().is_shared() {
                            burden.release();
                        }
                    }
                    debug!(component = %handler.key(), %error, "resolve_all aborted");
                    return Err(error);
                }
            }
        }

        Ok(resolved
            .into_iter()
            .map(|(handler, burden)| {
                self.track(&handler, &burden);
                burden.service().clone()
            })
            .collect())
    }

    fn track(&self, handler: &Handler, burden: &Arc<Burden>) {
        if !handler.lifestyle().track_root(burden) {
            return;
        }
        let mut tracked = self.tracked.lock();
        tracked.next += 1;
        let order = tracked.next;
        tracked.roots.insert(burden.address(), (order, burden.clone()));
    }

    /// Releases the root whose service lives at `address`.
    ///
    /// Returns `false` when nothing is tracked there, which includes a second
    /// release of the same instance.
    pub(crate) fn release(&self, address: usize) -> bool {
        let root = self.tracked.lock().roots.remove(&address);
        match root {
            Some((_, burden)) => {
                debug!(component = %burden.key(), "released");
                burden.release();
                true
            }
            None => {
                trace!(address, "release of an untracked instance ignored");
                false
            }
        }
    }

    /// Releases tracked roots, newest first, then disposes every lifestyle in
    /// reverse registration order.
    pub(crate) fn dispose(&self) {
        let mut roots: Vec<(u64, Arc<Burden>)> =
            self.tracked.lock().roots.drain().map(|(_, root)| root).collect();
        roots.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, burden) in roots {
            burden.release();
        }
        for handler in self.registry.all().iter().rev() {
            handler.lifestyle().dispose();
        }
        debug!("container disposed");
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.config)
            .field("components", &self.component_keys())
            .finish_non_exhaustive()
    }
}
