//! Handlers bind a registered descriptor to its lifestyle and validity state.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::burden::Burden;
use crate::config::ContainerConfig;
use crate::container::ResolutionContext;
use crate::descriptors::ComponentDescriptor;
use crate::error::{DiError, DiResult};
use crate::lifestyle::{manager_for, LifestyleManager};

/// Whether a registered component can currently be activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Every dependency of at least one constructor can be satisfied
    Valid,
    /// Some dependency is not registered (yet); re-evaluated on every
    /// registration change
    WaitingDependency,
    /// The descriptor can never be activated
    Invalid,
}

#[derive(Debug, Clone)]
pub(crate) struct HandlerStatus {
    pub(crate) state: HandlerState,
    pub(crate) missing: Vec<String>,
    pub(crate) reason: Option<String>,
}

/// Memoized constructor choice.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConstructorChoice {
    pub(crate) index: usize,
    /// Registry generation the choice was scored against
    pub(crate) generation: u64,
    /// Set once an activation with this constructor succeeded
    pub(crate) committed: bool,
}

pub(crate) struct Handler {
    descriptor: Arc<ComponentDescriptor>,
    lifestyle: Box<dyn LifestyleManager>,
    status: RwLock<HandlerStatus>,
    constructor: Mutex<Option<ConstructorChoice>>,
    sequence: u64,
}

impl Handler {
    pub(crate) fn new(descriptor: ComponentDescriptor, config: &ContainerConfig, sequence: u64) -> Self {
        let pool_wait = descriptor.pool_wait.unwrap_or(config.pool_wait);
        let lifestyle = manager_for(descriptor.lifestyle(), pool_wait);
        let reason = descriptor.structural_problem();
        let state = if reason.is_some() {
            HandlerState::Invalid
        } else {
            HandlerState::Valid
        };
        Self {
            descriptor: Arc::new(descriptor),
            lifestyle,
            status: RwLock::new(HandlerStatus {
                state,
                missing: Vec::new(),
                reason,
            }),
            constructor: Mutex::new(None),
            sequence,
        }
    }

    pub(crate) fn key(&self) -> &str {
        self.descriptor.key()
    }

    pub(crate) fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    pub(crate) fn lifestyle(&self) -> &dyn LifestyleManager {
        self.lifestyle.as_ref()
    }

    /// Registration order within the container.
    pub(crate) fn state(&self) -> HandlerState {
        self.status.read().state
    }

    pub(crate) fn status(&self) -> HandlerStatus {
        self.status.read().clone()
    }

    pub(crate) fn set_status(&self, state: HandlerState, missing: Vec<String>) {
        let mut status = self.status.write();
        status.state = state;
        status.missing = missing;
    }

    pub(crate) fn constructor_choice(&self) -> &Mutex<Option<ConstructorChoice>> {
        &self.constructor
    }

    /// Resolves an instance through the lifestyle.
    ///
    /// The component is entered on the resolution stack before any lifestyle
    /// lock is taken, so a cycle fails instead of waiting on itself.
    pub(crate) fn resolve(self: &Arc<Self>, ctx: &ResolutionContext<'_>) -> DiResult<Arc<Burden>> {
        if self.state() == HandlerState::Invalid {
            let reason = self.status.read().reason.clone().unwrap_or_default();
            return Err(DiError::InvalidComponent {
                component: self.key().to_string(),
                reason,
            });
        }
        let _component = ctx.enter_component(self.key())?;
        self.lifestyle.resolve(self, ctx)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("key", &self.key())
            .field("state", &self.state())
            .field("sequence", &self.sequence)
            .finish()
    }
}
