use std::sync::Arc;

use crate::activator;
use crate::burden::Burden;
use crate::container::ResolutionContext;
use crate::error::DiResult;
use crate::handler::Handler;

use super::LifestyleManager;

/// Activates on every resolve; release decommissions immediately.
pub(crate) struct TransientLifestyle;

impl LifestyleManager for TransientLifestyle {
    fn resolve(&self, handler: &Arc<Handler>, ctx: &ResolutionContext<'_>) -> DiResult<Arc<Burden>> {
        activator::activate(handler, ctx)
    }

    fn release(&self, burden: &Arc<Burden>) {
        burden.destroy();
    }

    // Nothing to do on release unless a hook or a child needs it
    fn track_root(&self, burden: &Arc<Burden>) -> bool {
        burden.requires_decommission()
    }

    fn dispose(&self) {}
}
