//! Fixed-size pool of pre-allocated locks shared by hashed identity.
//!
//! [`ResourceLockPool`] gives a large population of logical resources (sites,
//! sessions, databases) the appearance of one private lock each, without one
//! allocation per resource: a resource's stable numeric id maps to slot
//! `id % size`, and distinct ids that collide on a slot simply serialize
//! against each other. The false contention is bounded and tunable via the
//! pool size.

use std::sync::Arc;

use lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

/// A fixed set of independently lockable slots addressed by identity.
///
/// Locks are allocated once at construction; the pool is never resized. The
/// identity passed to [`lock`](Self::lock) must be a stable id assigned to
/// the resource (a site id, a session id, a database index), never anything
/// derived from its memory location.
///
/// # Caveats
///
/// Non-reentrant: acquiring an id while holding a guard whose id maps to the
/// same slot deadlocks the calling thread. No identity validation is
/// performed.
pub struct ResourceLockPool {
    slots: Vec<Arc<Mutex<()>>>,
}

/// Guard for one acquired slot. The slot is released when the guard drops,
/// on every exit path.
///
/// The guard is owned rather than borrowed, so a holder may stash it (for
/// example across a checkout/release pair) without borrowing the pool.
pub struct ResourceGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl ResourceLockPool {
    /// Allocate a pool of `size` independent locks.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "lock pool size must be nonzero");
        let slots = (0..size).map(|_| Arc::new(Mutex::new(()))).collect();
        Self { slots }
    }

    /// Number of slots in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Acquire the slot for `id`, blocking until it is free.
    ///
    /// Two ids lock each other out exactly when `id % size` collides.
    #[must_use]
    pub fn lock(&self, id: u64) -> ResourceGuard {
        let slot = &self.slots[self.index(id)];
        ResourceGuard {
            _guard: slot.lock_arc(),
        }
    }

    /// Acquire the slot for `id` only if it is free right now.
    #[must_use]
    pub fn try_lock(&self, id: u64) -> Option<ResourceGuard> {
        let slot = &self.slots[self.index(id)];
        slot.try_lock_arc().map(|guard| ResourceGuard { _guard: guard })
    }

    fn index(&self, id: u64) -> usize {
        (id % self.slots.len() as u64) as usize
    }
}
