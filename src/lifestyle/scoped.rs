use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::burden::Burden;
use crate::container::{ResolutionContext, ScopeId};
use crate::error::{DiError, DiResult};
use crate::handler::Handler;

use super::singleton::InstanceSlot;
use super::LifestyleManager;

/// Singleton-like within a scope; instances die with their scope.
#[derive(Default)]
pub(crate) struct PerScopeLifestyle {
    slots: Mutex<HashMap<ScopeId, Arc<InstanceSlot>>>,
}

impl LifestyleManager for PerScopeLifestyle {
    fn resolve(&self, handler: &Arc<Handler>, ctx: &ResolutionContext<'_>) -> DiResult<Arc<Burden>> {
        let scope = ctx
            .scope()
            .ok_or_else(|| DiError::NoActiveScope(handler.key().to_string()))?;
        // The map lock is not held while activating
        let slot = self.slots.lock().entry(scope).or_default().clone();
        slot.get_or_activate(handler, ctx)
    }

    fn release(&self, burden: &Arc<Burden>) {
        if let Some(scope) = burden.scope() {
            let slot = self.slots.lock().get(&scope).cloned();
            if let Some(slot) = slot {
                slot.take_if(burden);
            }
        }
        burden.destroy();
    }

    // Ending the scope releases cached instances; only one-off ones need tracking
    fn track_root(&self, burden: &Arc<Burden>) -> bool {
        let slot = burden.scope().and_then(|scope| self.slots.lock().get(&scope).cloned());
        !slot.map_or(false, |slot| slot.holds(burden))
    }

    fn end_scope(&self, scope: ScopeId) {
        let slot = self.slots.lock().remove(&scope);
        if let Some(burden) = slot.and_then(|slot| slot.take()) {
            debug!(component = %burden.key(), scope = scope.value(), "scope ended");
            burden.destroy();
        }
    }

    fn dispose(&self) {
        let slots: Vec<_> = self.slots.lock().drain().collect();
        for (_, slot) in slots {
            if let Some(burden) = slot.take() {
                burden.destroy();
            }
        }
    }
}
