//! Window Record Store
//!
//! Exclusive owner of every [`WindowRecord`]. Records live in an arena and
//! are addressed by generational handles: a handle taken before a record was
//! destroyed resolves to `None` afterwards instead of dangling, so stale
//! identity is detectable structurally. Both the frame id and the content id
//! map to the same record.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::record::WindowRecord;
use crate::xserver::Wid;

/// Generational reference to a record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The id already belongs to a different record; the caller must release
    /// that record first.
    #[error("window id {id:#x} is already owned by another record")]
    IdInUse { id: Wid },
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<WindowRecord>,
}

#[derive(Debug, Default)]
pub struct WindowStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_id: HashMap<Wid, WindowHandle>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record for `(frame, content)`. `content` may equal `frame`
    /// when the window manager does not reparent.
    pub fn create(&mut self, frame: Wid, content: Wid, root: Wid) -> Result<WindowHandle, StoreError> {
        for id in [frame, content] {
            if self.lookup(id).is_some() {
                return Err(StoreError::IdInUse { id });
            }
        }

        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.record = Some(WindowRecord::new(frame, content, root));
        let handle = WindowHandle {
            index,
            generation: slot.generation,
        };
        self.by_id.insert(frame, handle);
        if content != frame {
            self.by_id.insert(content, handle);
        }
        debug!("tracking window frame={:#x} content={:#x}", frame, content);
        Ok(handle)
    }

    /// Resolve a frame or content id to its record.
    pub fn lookup(&self, id: Wid) -> Option<WindowHandle> {
        let handle = *self.by_id.get(&id)?;
        self.get(handle).map(|_| handle)
    }

    pub fn get(&self, handle: WindowHandle) -> Option<&WindowRecord> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.record.as_ref()
    }

    pub fn get_mut(&mut self, handle: WindowHandle) -> Option<&mut WindowRecord> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.record.as_mut()
    }

    /// Destroy the record, unregistering both id mappings. Outstanding
    /// handles become stale rather than dangling.
    pub fn remove(&mut self, handle: WindowHandle) -> Option<WindowRecord> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.by_id.remove(&record.frame);
        if record.content != record.frame {
            self.by_id.remove(&record.content);
        }
        debug!("dropped window frame={:#x}", record.frame);
        Some(record)
    }

    /// Register `content` as the record's inner window (reparent adoption).
    pub fn attach_content(&mut self, handle: WindowHandle, content: Wid) -> Result<(), StoreError> {
        if let Some(other) = self.lookup(content) {
            if other != handle {
                return Err(StoreError::IdInUse { id: content });
            }
        }
        let Some(record) = self.get_mut(handle) else {
            return Ok(());
        };
        let old = record.content;
        record.content = content;
        let frame = record.frame;
        if old != frame {
            self.by_id.remove(&old);
        }
        if content != frame {
            self.by_id.insert(content, handle);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.record.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of all live records, in slot order.
    pub fn handles(&self) -> Vec<WindowHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.record.is_some())
            .map(|(i, s)| WindowHandle {
                index: i as u32,
                generation: s.generation,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_lookup_remove() {
        let mut store = WindowStore::new();
        let h = store.create(0x100, 0x101, 1).unwrap();
        assert_eq!(store.lookup(0x100), Some(h));
        assert_eq!(store.lookup(0x101), Some(h));
        assert_eq!(store.get(h).unwrap().frame, 0x100);
        assert_eq!(store.len(), 1);

        let rec = store.remove(h).unwrap();
        assert_eq!(rec.content, 0x101);
        assert!(store.lookup(0x100).is_none());
        assert!(store.lookup(0x101).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_conflicting_ids_rejected() {
        let mut store = WindowStore::new();
        store.create(0x100, 0x100, 1).unwrap();
        assert_eq!(
            store.create(0x200, 0x100, 1),
            Err(StoreError::IdInUse { id: 0x100 })
        );
        assert_eq!(
            store.create(0x100, 0x300, 1),
            Err(StoreError::IdInUse { id: 0x100 })
        );
    }

    #[test]
    fn test_stale_handles_resolve_to_none() {
        let mut store = WindowStore::new();
        let h = store.create(0x100, 0x100, 1).unwrap();
        store.remove(h).unwrap();

        // The slot is reused, the old handle is not.
        let h2 = store.create(0x200, 0x200, 1).unwrap();
        assert!(store.get(h).is_none());
        assert!(store.get_mut(h).is_none());
        assert!(store.remove(h).is_none());
        assert_eq!(store.get(h2).unwrap().frame, 0x200);
    }

    #[test]
    fn test_attach_content_reindexes() {
        let mut store = WindowStore::new();
        let h = store.create(0x100, 0x100, 1).unwrap();
        store.attach_content(h, 0x101).unwrap();
        assert_eq!(store.lookup(0x101), Some(h));
        assert_eq!(store.get(h).unwrap().content, 0x101);

        // Replacing the content id drops the old mapping.
        store.attach_content(h, 0x102).unwrap();
        assert!(store.lookup(0x101).is_none());
        assert_eq!(store.lookup(0x102), Some(h));

        // A content id owned by another record is refused.
        let other = store.create(0x200, 0x200, 1).unwrap();
        assert_eq!(
            store.attach_content(other, 0x102),
            Err(StoreError::IdInUse { id: 0x102 })
        );
    }
}
