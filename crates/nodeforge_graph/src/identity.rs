// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recyclable node id allocation.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
struct PoolState {
    next_serial: u32,
    freed: VecDeque<u32>,
    used: HashSet<u32>,
}

/// Hands out node ids, reusing recycled ones first.
///
/// Recycled ids come back in FIFO order. Ids marked used (for example while
/// loading a saved graph) are skipped by the serial counter.
#[derive(Debug, Default)]
pub struct IdentityPool {
    state: Mutex<PoolState>,
}

impl IdentityPool {
    /// Create an empty pool whose first id is 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id that no live node holds
    pub fn new_id(&self) -> u32 {
        let mut state = self.state.lock();
        if let Some(id) = state.freed.pop_front() {
            state.used.insert(id);
            return id;
        }

        let mut id = state.next_serial;
        while state.used.contains(&id) {
            id += 1;
        }
        state.next_serial = id + 1;
        state.used.insert(id);
        id
    }

    /// Return an id to the pool
    pub fn recycle_id(&self, id: u32) {
        let mut state = self.state.lock();
        if !state.freed.contains(&id) {
            state.freed.push_back(id);
        }
        state.used.remove(&id);
    }

    /// Force an id into the used set
    pub fn mark_used(&self, id: u32) {
        let mut state = self.state.lock();
        // A loaded id may also sit in the free queue from an earlier recycle.
        state.freed.retain(|&queued| queued != id);
        state.used.insert(id);
    }

    /// Whether the id is currently handed out
    pub fn is_used(&self, id: u32) -> bool {
        self.state.lock().used.contains(&id)
    }

    /// Forget all allocations
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.next_serial = 0;
        state.freed.clear();
        state.used.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_allocation() {
        let pool = IdentityPool::new();
        assert_eq!(pool.new_id(), 0);
        assert_eq!(pool.new_id(), 1);
        assert_eq!(pool.new_id(), 2);
    }

    #[test]
    fn test_recycled_ids_are_fifo() {
        let pool = IdentityPool::new();
        for _ in 0..4 {
            pool.new_id();
        }
        pool.recycle_id(2);
        pool.recycle_id(0);
        pool.recycle_id(2);

        assert_eq!(pool.new_id(), 2);
        assert_eq!(pool.new_id(), 0);
        assert_eq!(pool.new_id(), 4);
    }

    #[test]
    fn test_marked_ids_are_skipped() {
        let pool = IdentityPool::new();
        pool.mark_used(0);
        pool.mark_used(1);
        pool.mark_used(3);

        assert_eq!(pool.new_id(), 2);
        assert_eq!(pool.new_id(), 4);
    }

    #[test]
    fn test_mark_used_removes_from_free_queue() {
        let pool = IdentityPool::new();
        let id = pool.new_id();
        pool.recycle_id(id);
        pool.mark_used(id);

        assert_ne!(pool.new_id(), id);
    }

    #[test]
    fn test_reset() {
        let pool = IdentityPool::new();
        pool.new_id();
        pool.new_id();
        pool.recycle_id(1);
        pool.reset();

        assert!(!pool.is_used(0));
        assert_eq!(pool.new_id(), 0);
        assert_eq!(pool.new_id(), 1);
    }
}
