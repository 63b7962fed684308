//! Fixed-capacity generational resource pools
//!
//! A `HandlePool` owns objects of one resource kind and hands out packed
//! [`Handle`]s to them. Slots are recycled through a free list; each reuse
//! bumps the slot generation so stale handles are detected on access.
//!
//! Capacity is fixed at construction. Pool sizes are capacity-planning
//! inputs, not runtime-elastic values, so exhausting a pool is a fatal
//! assertion rather than a recoverable error.

use std::sync::Mutex;

use crate::concurrency::lock;
use crate::handle::{Handle, ResourceKind};

struct Entry<T> {
    object: Option<T>,
    generation: u32,
    next_free: u32,
}

struct PoolState<T> {
    entries: Vec<Entry<T>>,
    free_head: u32,
    live: usize,
}

/// Handle-indexed object pool for one resource kind.
///
/// All operations are internally synchronized; pools are shared freely
/// between the recording and executing sides.
pub struct HandlePool<T> {
    kind: ResourceKind,
    state: Mutex<PoolState<T>>,
}

impl<T> HandlePool<T> {
    /// Creates a pool with `capacity` slots for resources of `kind`.
    #[must_use]
    pub fn new(kind: ResourceKind, capacity: usize) -> Self {
        assert!(capacity > 0, "pool<{kind:?}> capacity must be non-zero");
        assert!(
            capacity < 0x1_0000,
            "pool<{kind:?}> capacity exceeds handle index range"
        );

        let entries = (0..capacity)
            .map(|i| Entry {
                object: None,
                generation: 0,
                next_free: ((i + 1) % capacity) as u32,
            })
            .collect();

        Self {
            kind,
            state: Mutex::new(PoolState {
                entries,
                free_head: 0,
                live: 0,
            }),
        }
    }

    /// Stores `object` in a free slot and returns its handle.
    ///
    /// # Panics
    /// Panics if the pool is full; see the module notes on capacity.
    pub fn alloc(&self, object: T) -> Handle {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        assert!(
            state.live < state.entries.len(),
            "pool<{:?}> exhausted ({} slots)",
            self.kind,
            state.entries.len()
        );

        let index = state.free_head;
        let entry = &mut state.entries[index as usize];
        debug_assert!(entry.object.is_none());

        state.free_head = entry.next_free;
        entry.generation = (entry.generation + 1) & 0xFF;
        entry.object = Some(object);
        let generation = entry.generation;
        state.live += 1;

        Handle::pack(index, generation, self.kind)
    }

    /// Removes the object behind `handle` from the pool and returns it.
    pub fn free(&self, handle: Handle) -> T {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        let index = self.checked_index(state, handle);
        let entry = &mut state.entries[index];
        let object = entry.object.take().unwrap_or_else(|| {
            panic!("pool<{:?}> double free of {handle:?}", self.kind)
        });

        entry.next_free = state.free_head;
        state.free_head = index as u32;
        state.live -= 1;
        object
    }

    /// Runs `f` with shared access to the object behind `handle`.
    pub fn with<R>(&self, handle: Handle, f: impl FnOnce(&T) -> R) -> R {
        let state = lock(&self.state);
        let index = self.checked_index(&state, handle);
        match state.entries[index].object.as_ref() {
            Some(object) => f(object),
            None => panic!("pool<{:?}> access to freed {handle:?}", self.kind),
        }
    }

    /// Runs `f` with exclusive access to the object behind `handle`.
    pub fn with_mut<R>(&self, handle: Handle, f: impl FnOnce(&mut T) -> R) -> R {
        let mut state = lock(&self.state);
        let index = self.checked_index(&state, handle);
        match state.entries[index].object.as_mut() {
            Some(object) => f(object),
            None => panic!("pool<{:?}> access to freed {handle:?}", self.kind),
        }
    }

    /// Runs `f` over every live object in the pool.
    pub fn for_each_mut(&self, mut f: impl FnMut(&mut T)) {
        let mut state = lock(&self.state);
        for entry in &mut state.entries {
            if let Some(object) = entry.object.as_mut() {
                f(object);
            }
        }
    }

    /// Whether `handle` still refers to a live object (generation check).
    pub fn is_alive(&self, handle: Handle) -> bool {
        if !handle.is_valid() || handle.kind() != Some(self.kind) {
            return false;
        }
        let state = lock(&self.state);
        let index = handle.index();
        index < state.entries.len()
            && state.entries[index].object.is_some()
            && state.entries[index].generation == handle.generation()
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        lock(&self.state).live
    }

    fn checked_index(&self, state: &PoolState<T>, handle: Handle) -> usize {
        assert!(
            handle.is_valid(),
            "pool<{:?}> access through invalid handle",
            self.kind
        );
        assert!(
            handle.kind() == Some(self.kind),
            "pool<{:?}> resource kind mismatch: {handle:?}",
            self.kind
        );
        let index = handle.index();
        assert!(
            index < state.entries.len(),
            "pool<{:?}> handle index out of bounds: {handle:?}",
            self.kind
        );
        assert!(
            state.entries[index].generation == handle.generation(),
            "pool<{:?}> stale handle generation: {handle:?}, slot generation {}",
            self.kind,
            state.entries[index].generation
        );
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_get_free() {
        let pool: HandlePool<u32> = HandlePool::new(ResourceKind::Texture, 8);
        let handle = pool.alloc(11);
        assert!(pool.is_alive(handle));
        assert_eq!(pool.with(handle, |v| *v), 11);
        pool.with_mut(handle, |v| *v = 12);
        assert_eq!(pool.free(handle), 12);
        assert_eq!(pool.live_count(), 0);
        assert!(!pool.is_alive(handle));
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let pool: HandlePool<u32> = HandlePool::new(ResourceKind::Texture, 1);
        let first = pool.alloc(1);
        pool.free(first);
        let second = pool.alloc(2);

        // Same slot, new generation: the stale handle is rejected.
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(!pool.is_alive(first));
        assert!(pool.is_alive(second));
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn test_exhaustion_is_fatal() {
        let pool: HandlePool<u32> = HandlePool::new(ResourceKind::VertexBuffer, 2);
        pool.alloc(0);
        pool.alloc(1);
        pool.alloc(2);
    }

    #[test]
    #[should_panic(expected = "resource kind mismatch")]
    fn test_kind_mismatch_is_fatal() {
        let textures: HandlePool<u32> = HandlePool::new(ResourceKind::Texture, 2);
        let buffers: HandlePool<u32> = HandlePool::new(ResourceKind::VertexBuffer, 2);
        let handle = buffers.alloc(1);
        textures.with(handle, |_| ());
    }

    #[test]
    fn test_for_each_mut_visits_live_only() {
        let pool: HandlePool<u32> = HandlePool::new(ResourceKind::TextureSet, 4);
        let a = pool.alloc(1);
        let b = pool.alloc(2);
        pool.free(a);

        let mut seen = Vec::new();
        pool.for_each_mut(|v| seen.push(*v));
        assert_eq!(seen, vec![2]);
        pool.free(b);
    }
}
