//! Flow lock pool.
//!
//! Workers may legitimately interleave on one flow after out-of-order
//! scheduling; a small pool of mutexes, selected by flow-key hash,
//! serialises them. The pool is dedicated to the message layer so that a
//! thread exercising both the transport and message layers never nests
//! two locks from the same pool.

use std::hash::{DefaultHasher, Hash, Hasher};

use parking_lot::{Mutex, MutexGuard};

/// A fixed pool of mutexes keyed by hash.
#[derive(Debug)]
pub struct LockPool {
    locks: Box<[Mutex<()>]>,
}

impl LockPool {
    /// Create a pool of `size` locks (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let locks = (0..size).map(|_| Mutex::new(())).collect();
        Self { locks }
    }

    /// Acquire the lock a key hashes to, blocking until it is free.
    pub fn guard<K: Hash>(&self, key: K) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let slot = (hasher.finish() as usize) % self.locks.len();
        self.locks[slot].lock()
    }
}

impl Default for LockPool {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_hits_same_slot() {
        let pool = LockPool::new(4);
        {
            let _held = pool.guard(42u64);
            // A different key may or may not share the slot; the same key
            // must, which try_lock can observe through contention.
            let mut hasher = DefaultHasher::new();
            42u64.hash(&mut hasher);
            let slot = (hasher.finish() as usize) % 4;
            assert!(pool.locks[slot].try_lock().is_none());
        }
        let _reacquired = pool.guard(42u64);
    }

    #[test]
    fn zero_sized_pool_rounds_up() {
        let pool = LockPool::new(0);
        let _guard = pool.guard("flow");
    }
}
