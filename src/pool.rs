//! Free-lists of reusable decoders and readers.
//!
//! Pools are per thread. An instance taken from a pool is owned by exactly one caller
//! until it is handed back, and instances handed back to a full pool are dropped.

use std::cell::RefCell;

/// Maximum number of instances a single pool retains.
pub const POOL_CAPACITY: usize = 100;

/// A bounded free-list of `T`.
///
/// Meant to live inside a `thread_local!`, see [`Decoder::alloc`](crate::decoder::Decoder::alloc).
#[derive(Debug)]
pub struct InstancePool<T> {
    free: RefCell<Vec<T>>,
}

impl<T> InstancePool<T> {
    pub const fn new() -> Self {
        InstancePool {
            free: RefCell::new(Vec::new()),
        }
    }

    /// Takes a previously released instance, if any.
    pub fn take(&self) -> Option<T> {
        self.free.borrow_mut().pop()
    }

    /// Hands `instance` back, dropping it when the pool is already full.
    ///
    /// The caller is responsible for resetting the instance first.
    pub fn release(&self, instance: T) {
        let mut free = self.free.borrow_mut();
        if free.len() < POOL_CAPACITY {
            free.push(instance);
        } else {
            tracing::trace!(
                capacity = POOL_CAPACITY,
                kind = core::any::type_name::<T>(),
                "pool full, discarding instance"
            );
        }
    }

    /// Number of instances currently retained.
    pub fn len(&self) -> usize {
        self.free.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for InstancePool<T> {
    fn default() -> Self {
        InstancePool::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{InstancePool, POOL_CAPACITY};

    #[test]
    fn test_pool_caps_retained_instances() {
        let pool = InstancePool::new();
        for i in 0..POOL_CAPACITY + 10 {
            pool.release(i);
        }
        assert_eq!(pool.len(), POOL_CAPACITY);

        // Last in, first out.
        assert_eq!(pool.take(), Some(POOL_CAPACITY - 1));
        assert_eq!(pool.len(), POOL_CAPACITY - 1);
    }

    #[test]
    fn test_empty_pool() {
        let pool: InstancePool<u8> = InstancePool::default();
        assert!(pool.is_empty());
        assert_eq!(pool.take(), None);
    }
}
