use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::activator;
use crate::burden::Burden;
use crate::config::PoolWait;
use crate::container::ResolutionContext;
use crate::error::{DiError, DiResult};
use crate::handler::Handler;

use super::LifestyleManager;

#[derive(Default)]
struct PoolState {
    free: Vec<Arc<Burden>>,
    /// Instances alive, checked out or free, plus reserved constructions
    live: usize,
    /// Burdens currently checked out: address to the epoch they were checked out in
    outstanding: HashMap<usize, u64>,
    /// Bumped by every dispose
    epoch: u64,
}

/// A bounded pool of recycled instances.
///
/// At most `max` instances exist at any time. A resolve at capacity waits
/// according to the pool's [`PoolWait`]. Released instances go back to the
/// free list after the pool-reset hooks ran, unless more than `min`
/// instances are alive, in which case they are decommissioned.
///
/// Disposing destroys the free instances and starts a new epoch. Instances
/// checked out before that are destroyed when they come back, and callers
/// waiting across it fail; the pool keeps working for later resolves.
pub(crate) struct PooledLifestyle {
    min: usize,
    max: usize,
    wait: PoolWait,
    state: Mutex<PoolState>,
    available: Condvar,
}

enum Checkout {
    Free(Arc<Burden>),
    /// Room for a new instance, reserved in the given epoch
    Reserved(u64),
}

fn address(burden: &Arc<Burden>) -> usize {
    Arc::as_ptr(burden) as usize
}

/// Undoes a capacity reservation unless the construction completed.
struct Reservation<'p> {
    pool: &'p PooledLifestyle,
    armed: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.state.lock().live -= 1;
            self.pool.available.notify_one();
        }
    }
}

impl PooledLifestyle {
    pub(crate) fn new(min: usize, max: usize, wait: PoolWait) -> Self {
        Self {
            min,
            max,
            wait,
            state: Mutex::new(PoolState::default()),
            available: Condvar::new(),
        }
    }

    fn exhausted(&self, handler: &Handler, waited: Duration) -> DiError {
        DiError::PoolExhausted {
            component: handler.key().to_string(),
            max: self.max,
            waited,
        }
    }

    /// Checks out a free instance or reserves room for a new one.
    fn acquire(&self, handler: &Handler) -> DiResult<Checkout> {
        let started = Instant::now();
        let mut state = self.state.lock();
        let epoch = state.epoch;
        loop {
            if state.epoch != epoch {
                debug!(component = %handler.key(), "pool disposed while waiting");
                return Err(self.exhausted(handler, started.elapsed()));
            }
            if let Some(burden) = state.free.pop() {
                state.outstanding.insert(address(&burden), epoch);
                trace!(component = %handler.key(), "pooled instance reused");
                return Ok(Checkout::Free(burden));
            }
            if state.live < self.max {
                state.live += 1;
                return Ok(Checkout::Reserved(epoch));
            }

            let waited = started.elapsed();
            match self.wait {
                PoolWait::FailFast => return Err(self.exhausted(handler, waited)),
                PoolWait::Block => self.available.wait(&mut state),
                PoolWait::Timeout(limit) => {
                    if waited >= limit {
                        warn!(component = %handler.key(), max = self.max, ?waited, "pool exhausted");
                        return Err(self.exhausted(handler, waited));
                    }
                    self.available.wait_for(&mut state, limit - waited);
                }
            }
        }
    }
}

impl LifestyleManager for PooledLifestyle {
    fn resolve(&self, handler: &Arc<Handler>, ctx: &ResolutionContext<'_>) -> DiResult<Arc<Burden>> {
        let epoch = match self.acquire(handler)? {
            Checkout::Free(burden) => return Ok(burden),
            Checkout::Reserved(epoch) => epoch,
        };

        let mut reservation = Reservation { pool: self, armed: true };
        let burden = activator::activate(handler, ctx)?;
        reservation.armed = false;

        self.state.lock().outstanding.insert(address(&burden), epoch);
        Ok(burden)
    }

    fn release(&self, burden: &Arc<Burden>) {
        let mut state = self.state.lock();
        let epoch = match state.outstanding.remove(&address(burden)) {
            Some(epoch) => epoch,
            None => return,
        };

        if epoch != state.epoch || state.live > self.min {
            state.live -= 1;
            drop(state);
            self.available.notify_one();
            debug!(component = %burden.key(), "pooled instance decommissioned");
            burden.destroy();
            return;
        }

        drop(state);
        burden.reset_for_pool();
        let mut state = self.state.lock();
        if epoch != state.epoch {
            state.live -= 1;
            drop(state);
            self.available.notify_one();
            burden.destroy();
            return;
        }
        state.free.push(burden.clone());
        drop(state);
        self.available.notify_one();
        trace!(component = %burden.key(), "pooled instance returned");
    }

    fn dispose(&self) {
        let free = {
            let mut state = self.state.lock();
            state.epoch += 1;
            let free = std::mem::take(&mut state.free);
            state.live -= free.len();
            free
        };
        self.available.notify_all();
        for burden in free.into_iter().rev() {
            burden.destroy();
        }
    }
}
