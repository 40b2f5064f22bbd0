use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::activator;
use crate::burden::Burden;
use crate::container::ResolutionContext;
use crate::error::DiResult;
use crate::handler::Handler;

use super::LifestyleManager;

/// A lazily populated instance with at most one construction in flight.
///
/// Reads go through the `RwLock` only; construction is serialized by a
/// separate lock and re-checks the slot once it holds it.
#[derive(Default)]
pub(crate) struct InstanceSlot {
    instance: RwLock<Option<Arc<Burden>>>,
    construction: Mutex<()>,
}

impl InstanceSlot {
    pub(crate) fn get_or_activate(
        &self,
        handler: &Arc<Handler>,
        ctx: &ResolutionContext<'_>,
    ) -> DiResult<Arc<Burden>> {
        // Overrides make a one-off instance the shared slot never sees
        if ctx.has_overrides_for(handler.key()) {
            debug!(component = %handler.key(), "overrides bypass the shared instance");
            return activator::activate(handler, ctx);
        }
        if let Some(burden) = self.instance.read().as_ref() {
            return Ok(burden.clone());
        }

        let _construction = self.construction.lock();
        if let Some(burden) = self.instance.read().as_ref() {
            debug!(component = %handler.key(), "instance created by a concurrent resolve");
            return Ok(burden.clone());
        }

        let burden = activator::activate(handler, ctx)?;
        *self.instance.write() = Some(burden.clone());
        Ok(burden)
    }

    /// Empties the slot if it still holds `burden`.
    pub(crate) fn take_if(&self, burden: &Arc<Burden>) -> bool {
        let mut instance = self.instance.write();
        match instance.as_ref() {
            Some(current) if Arc::ptr_eq(current, burden) => {
                *instance = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn holds(&self, burden: &Arc<Burden>) -> bool {
        self.instance
            .read()
            .as_ref()
            .map_or(false, |current| Arc::ptr_eq(current, burden))
    }

    pub(crate) fn take(&self) -> Option<Arc<Burden>> {
        self.instance.write().take()
    }
}

/// One instance per container, reset to empty on release or shutdown.
#[derive(Default)]
pub(crate) struct SingletonLifestyle {
    slot: InstanceSlot,
}

impl LifestyleManager for SingletonLifestyle {
    fn resolve(&self, handler: &Arc<Handler>, ctx: &ResolutionContext<'_>) -> DiResult<Arc<Burden>> {
        self.slot.get_or_activate(handler, ctx)
    }

    fn release(&self, burden: &Arc<Burden>) {
        if self.slot.take_if(burden) {
            debug!(component = %burden.key(), "singleton reset");
        }
        burden.destroy();
    }

    fn dispose(&self) {
        if let Some(burden) = self.slot.take() {
            burden.destroy();
        }
    }
}
