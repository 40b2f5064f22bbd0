//! Handler registry and dependency validation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::convert::ConversionManager;
use crate::descriptors::{ComponentDescriptor, DependencyModel, InterceptorTarget};
use crate::error::{DiError, DiResult};
use crate::handler::{Handler, HandlerState};
use crate::interception::Interceptor;
use crate::key::Contract;

#[derive(Default)]
struct RegistryState {
    /// Registration order
    handlers: Vec<Arc<Handler>>,
    by_key: HashMap<String, Arc<Handler>>,
    by_contract: HashMap<Contract, Vec<Arc<Handler>>>,
}

/// Read-mostly store of handlers.
///
/// Every change bumps the generation and re-evaluates the state of every
/// handler while the write lock is held.
#[derive(Default)]
pub(crate) struct Registry {
    state: RwLock<RegistryState>,
    generation: AtomicU64,
}

impl Registry {
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn insert(&self, handler: Arc<Handler>, converters: &ConversionManager) -> DiResult<()> {
        let mut state = self.state.write();
        if state.by_key.contains_key(handler.key()) {
            return Err(DiError::DuplicateComponent(handler.key().to_string()));
        }
        state
            .by_key
            .insert(handler.key().to_string(), handler.clone());
        state
            .by_contract
            .entry(handler.descriptor().contract())
            .or_default()
            .push(handler.clone());
        state.handlers.push(handler);
        self.generation.fetch_add(1, Ordering::AcqRel);
        revalidate(&state, converters);
        Ok(())
    }

    pub(crate) fn remove(&self, key: &str, converters: &ConversionManager) -> Option<Arc<Handler>> {
        let mut state = self.state.write();
        let handler = state.by_key.remove(key)?;
        state.handlers.retain(|h| !Arc::ptr_eq(h, &handler));
        let contract = handler.descriptor().contract();
        if let Some(handlers) = state.by_contract.get_mut(&contract) {
            handlers.retain(|h| !Arc::ptr_eq(h, &handler));
            if handlers.is_empty() {
                state.by_contract.remove(&contract);
            }
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        revalidate(&state, converters);
        Some(handler)
    }

    /// Re-evaluates handler states after something other than the handler
    /// set changed, such as a new converter.
    pub(crate) fn refresh(&self, converters: &ConversionManager) {
        let state = self.state.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        revalidate(&state, converters);
    }

    pub(crate) fn by_key(&self, key: &str) -> Option<Arc<Handler>> {
        self.state.read().by_key.get(key).cloned()
    }

    /// Handlers registered for `contract`, in registration order.
    pub(crate) fn by_contract(&self, contract: Contract) -> Vec<Arc<Handler>> {
        self.state
            .read()
            .by_contract
            .get(&contract)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn has_contract(&self, contract: Contract) -> bool {
        self.state.read().by_contract.contains_key(&contract)
    }

    pub(crate) fn all(&self) -> Vec<Arc<Handler>> {
        self.state.read().handlers.clone()
    }
}

/// Static check of whether `dependency` of `consumer` could be satisfied,
/// given which component keys count as valid.
pub(crate) fn dependency_satisfiable(
    consumer: &ComponentDescriptor,
    dependency: &DependencyModel,
    converters: &ConversionManager,
    reference: impl Fn(&str) -> Option<(Contract, bool)>,
    providers: impl Fn(Contract) -> Vec<(String, bool)>,
) -> bool {
    if dependency.is_collection() {
        return true;
    }
    if consumer.parameter(dependency.name()).is_some() && converters.can_convert(&dependency.target()) {
        return true;
    }
    match dependency.reference() {
        Some(key) => matches!(reference(key), Some((contract, true)) if contract == dependency.target()),
        None => providers(dependency.target())
            .iter()
            .any(|(key, valid)| *valid && key != consumer.key()),
    }
}

/// Unsatisfiable dependencies of the constructor closest to being
/// satisfiable, or an empty list when one is fully satisfiable.
fn missing_dependencies(
    descriptor: &ComponentDescriptor,
    converters: &ConversionManager,
    reference: &dyn Fn(&str) -> Option<(Contract, bool)>,
    providers: &dyn Fn(Contract) -> Vec<(String, bool)>,
) -> Vec<String> {
    let mut best: Option<Vec<String>> = None;
    for candidate in descriptor.constructors() {
        let missing: Vec<String> = candidate
            .dependencies()
            .iter()
            .filter(|dependency| {
                !dependency_satisfiable(descriptor, dependency, converters, reference, providers)
            })
            .map(|dependency| format!("{} ({})", dependency.name(), dependency.requested()))
            .collect();
        if missing.is_empty() {
            return missing;
        }
        if best.as_ref().map_or(true, |best| missing.len() < best.len()) {
            best = Some(missing);
        }
    }

    let mut missing = best.unwrap_or_default();
    let interceptor = Contract::of::<dyn Interceptor>();
    for reference_entry in descriptor.interceptors() {
        if let InterceptorTarget::Component(key) = reference_entry.target() {
            if !matches!(reference(key), Some((contract, true)) if contract == interceptor) {
                missing.push(format!("interceptor '{}'", key));
            }
        }
    }
    missing
}

/// Fixpoint over handler states: everything structurally sound starts out
/// valid and is demoted while some dependency has no valid provider.
fn revalidate(state: &RegistryState, converters: &ConversionManager) {
    let mut valid: HashMap<&str, bool> = state
        .handlers
        .iter()
        .map(|h| (h.key(), h.descriptor().structural_problem().is_none()))
        .collect();
    let mut missing: HashMap<&str, Vec<String>> = HashMap::new();

    loop {
        let mut changed = false;
        for handler in &state.handlers {
            if !valid[handler.key()] {
                continue;
            }
            let reference = |key: &str| -> Option<(Contract, bool)> {
                state
                    .by_key
                    .get(key)
                    .map(|h| (h.descriptor().contract(), valid[h.key()]))
            };
            let providers = |contract: Contract| -> Vec<(String, bool)> {
                state
                    .by_contract
                    .get(&contract)
                    .map(|handlers| {
                        handlers
                            .iter()
                            .map(|h| (h.key().to_string(), valid[h.key()]))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            };
            let unresolved = missing_dependencies(handler.descriptor(), converters, &reference, &providers);
            if !unresolved.is_empty() {
                missing.insert(handler.key(), unresolved);
                changed = true;
            }
        }
        for key in missing.keys() {
            valid.insert(*key, false);
        }
        if !changed {
            break;
        }
    }

    for handler in &state.handlers {
        let previous = handler.state();
        let (next, unresolved) = if handler.descriptor().structural_problem().is_some() {
            (HandlerState::Invalid, Vec::new())
        } else {
            match missing.get(handler.key()) {
                Some(unresolved) => (HandlerState::WaitingDependency, unresolved.clone()),
                None => (HandlerState::Valid, Vec::new()),
            }
        };
        if next != previous {
            match next {
                HandlerState::WaitingDependency => {
                    warn!(component = %handler.key(), missing = ?unresolved, "component waiting for dependencies")
                }
                _ => debug!(component = %handler.key(), state = ?next, "component state changed"),
            }
        }
        handler.set_status(next, unresolved);
    }
}
