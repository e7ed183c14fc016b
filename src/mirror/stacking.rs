//! Stack Order Tracker
//!
//! Maintains the top-to-bottom ordering of all tracked windows and exports
//! the z-order of the relevant ones only when it has actually changed.
//! The order is an explicit vector of handles, so cycles are impossible and
//! membership is a structural fact rather than an assertion.

use thiserror::Error;
use tracing::debug;

use super::store::{WindowHandle, WindowStore};
use crate::host::tracker::WindowTracker;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("restack neighbor is not in the stacking order")]
    UnknownNeighbor,
}

/// Top-to-bottom stacking order with a change flag.
#[derive(Debug, Default)]
pub struct StackOrder {
    order: Vec<WindowHandle>,
    dirty: bool,
}

impl StackOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// New windows enter at the top of the stack.
    pub fn add_top(&mut self, handle: WindowHandle) {
        if !self.order.contains(&handle) {
            self.order.insert(0, handle);
        }
    }

    pub fn remove(&mut self, handle: WindowHandle) {
        self.order.retain(|&h| h != handle);
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.order.contains(&handle)
    }

    /// Reinsert `handle` immediately above `lower`, or at the very bottom
    /// when no neighbor is given. The neighbor must already be a member;
    /// caller-supplied identity alone is not trusted.
    ///
    /// `relevant` marks the export list dirty only when the moved window is
    /// actually mirrored.
    pub fn restack(
        &mut self,
        handle: WindowHandle,
        lower: Option<WindowHandle>,
        relevant: bool,
    ) -> Result<(), StackError> {
        match lower {
            Some(n) if n == handle => return Err(StackError::UnknownNeighbor),
            Some(n) if !self.order.contains(&n) => return Err(StackError::UnknownNeighbor),
            _ => {}
        }
        self.order.retain(|&h| h != handle);
        match lower {
            Some(n) => {
                let pos = self
                    .order
                    .iter()
                    .position(|&h| h == n)
                    .expect("validated above");
                self.order.insert(pos, handle);
            }
            None => self.order.push(handle),
        }
        if relevant {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Top-to-bottom order of every tracked window.
    pub fn order(&self) -> &[WindowHandle] {
        &self.order
    }

    /// Emit one z-order notification covering all relevant windows if
    /// anything changed since the last flush.
    pub fn flush(&mut self, store: &WindowStore, tracker: &mut dyn WindowTracker) {
        if !self.dirty {
            return;
        }
        let ids: Vec<_> = self
            .order
            .iter()
            .filter_map(|&h| store.get(h))
            .filter(|r| r.is_relevant())
            .map(|r| r.frame)
            .collect();
        debug!("flushing z-order of {} windows", ids.len());
        tracker.set_zorder(&ids);
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::proto::Update;
    use crate::host::tracker::HostTracker;

    fn store_with(n: usize) -> (WindowStore, Vec<WindowHandle>) {
        let mut store = WindowStore::new();
        let handles = (0..n)
            .map(|i| {
                store
                    .create(0x100 + i as u32, 0x100 + i as u32, 1)
                    .unwrap()
            })
            .collect();
        (store, handles)
    }

    #[test]
    fn test_restack_above_neighbor() {
        let (_store, h) = store_with(3);
        let mut stack = StackOrder::new();
        for &handle in &h {
            stack.add_top(handle);
        }
        // add_top: last added is topmost.
        assert_eq!(stack.order(), &[h[2], h[1], h[0]]);

        // Move the top window to just above the bottom one.
        stack.restack(h[2], Some(h[0]), true).unwrap();
        assert_eq!(stack.order(), &[h[1], h[2], h[0]]);
        assert!(stack.is_dirty());

        // Move to the very bottom.
        stack.restack(h[1], None, true).unwrap();
        assert_eq!(stack.order(), &[h[2], h[0], h[1]]);
    }

    #[test]
    fn test_restack_unknown_neighbor_rejected() {
        let (mut store, h) = store_with(2);
        let mut stack = StackOrder::new();
        stack.add_top(h[0]);

        assert_eq!(
            stack.restack(h[0], Some(h[1]), true),
            Err(StackError::UnknownNeighbor)
        );
        assert_eq!(
            stack.restack(h[0], Some(h[0]), true),
            Err(StackError::UnknownNeighbor)
        );
        // The order is untouched by a rejected restack.
        assert_eq!(stack.order(), &[h[0]]);
        let _ = store.remove(h[1]);
    }

    #[test]
    fn test_membership_matches_store() {
        let (mut store, h) = store_with(4);
        let mut stack = StackOrder::new();
        for &handle in &h {
            stack.add_top(handle);
        }
        assert_eq!(stack.order().len(), store.len());

        store.remove(h[1]);
        stack.remove(h[1]);
        assert_eq!(stack.order().len(), store.len());

        // No duplicates after arbitrary restacks.
        stack.restack(h[0], Some(h[3]), false).unwrap();
        stack.restack(h[3], None, false).unwrap();
        stack.restack(h[2], Some(h[0]), false).unwrap();
        let seen: std::collections::HashSet<_> = stack.order().iter().copied().collect();
        assert_eq!(seen.len(), stack.order().len());
        assert_eq!(seen.len(), store.len());
    }

    #[test]
    fn test_flush_only_when_dirty_and_only_relevant() {
        let (mut store, h) = store_with(3);
        let mut stack = StackOrder::new();
        for &handle in &h {
            stack.add_top(handle);
        }
        // Only the middle window is relevant.
        store.get_mut(h[1]).unwrap().flags |= super::super::record::RecordFlags::RELEVANT;

        let mut tracker = HostTracker::new();
        stack.flush(&store, &mut tracker);
        assert!(tracker.take_updates().is_empty(), "clean stack must not flush");

        stack.mark_dirty();
        stack.flush(&store, &mut tracker);
        assert_eq!(tracker.take_updates(), vec![Update::ZOrder { ids: vec![0x101] }]);
        assert!(!stack.is_dirty());
    }
}
