//! Window Tracker
//!
//! The sink the engine feeds with window deltas. All calls are
//! fire-and-forget appends; [`HostTracker`] owns the accumulated batch and
//! its serialization, including the untouched-window sweep that turns a full
//! resync into the right set of removes.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{debug, warn};

use super::proto::{encode_batch, region_rects, Update};
use super::transport::Transport;
use crate::mirror::record::WindowAttr;
use crate::region::{Rect, Region};
use crate::xserver::{ProtocolSet, Wid, WindowKind};

/// Initial facts announced together with a new window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddHint {
    pub kind: WindowKind,
    pub protocols: ProtocolSet,
}

/// Delta sink driven by the mirror engine.
pub trait WindowTracker {
    fn add_window(&mut self, id: Wid, hint: AddHint);
    fn remove_window(&mut self, id: Wid);
    fn move_window(&mut self, id: Wid, rect: Rect);
    fn set_title(&mut self, id: Wid, title: &str);
    /// `None` restores a plain rectangular window.
    fn set_region(&mut self, id: Wid, region: Option<&Region>);
    fn set_attribute(&mut self, id: Wid, attr: WindowAttr, on: bool);
    fn set_kind(&mut self, id: Wid, kind: WindowKind);
    fn set_desktop(&mut self, id: Wid, desktop: u32);
    /// Full top-to-bottom z-order of relevant windows.
    fn set_zorder(&mut self, ids: &[Wid]);
    fn set_active_desktop(&mut self, desktop: u32);
    /// Start a full (non-incremental) resync: every window not re-announced
    /// before [`WindowTracker::end_resync`] is swept with a remove.
    fn begin_resync(&mut self);
    fn end_resync(&mut self);
}

#[derive(Debug, Default)]
struct BatchInner {
    updates: Vec<Update>,
    /// Windows announced to the host and not yet removed.
    known: HashSet<Wid>,
    /// Windows touched since `begin_resync`.
    touched: HashSet<Wid>,
    resync: bool,
}

/// The concrete batch-accumulating tracker.
///
/// The mutex gives the transport-side collector full mutual exclusion
/// against the notification thread; there is no finer granularity and no
/// re-entrancy.
#[derive(Debug, Default)]
pub struct HostTracker {
    inner: Mutex<BatchInner>,
}

impl HostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, update: Update) {
        let mut inner = self.inner.lock().expect("tracker mutex poisoned");
        inner.updates.push(update);
    }

    fn touch(&self, id: Wid) {
        let mut inner = self.inner.lock().expect("tracker mutex poisoned");
        if inner.resync {
            inner.touched.insert(id);
        }
    }

    /// Number of accumulated updates.
    pub fn pending(&self) -> usize {
        self.inner.lock().expect("tracker mutex poisoned").updates.len()
    }

    /// Drain the batch without sending it (used by tests and by embedders
    /// that own their own transport).
    pub fn take_updates(&self) -> Vec<Update> {
        std::mem::take(&mut self.inner.lock().expect("tracker mutex poisoned").updates)
    }

    /// Serialize and send the accumulated batch. On failure the channel is
    /// reopened and the send retried once; if that also fails the batch is
    /// left unsealed so nothing accumulated is lost.
    pub fn flush(&self, transport: &mut dyn Transport) -> anyhow::Result<bool> {
        let snapshot = {
            let inner = self.inner.lock().expect("tracker mutex poisoned");
            if inner.updates.is_empty() {
                return Ok(false);
            }
            encode_batch(&inner.updates)?
        };

        if let Err(first) = transport.send(&snapshot) {
            debug!("transport send failed, reopening: {first:#}");
            if let Err(err) = transport.reopen().and_then(|_| transport.send(&snapshot)) {
                warn!("transport retry failed, keeping batch unsealed: {err:#}");
                return Ok(false);
            }
        }

        let mut inner = self.inner.lock().expect("tracker mutex poisoned");
        inner.updates.clear();
        Ok(true)
    }
}

impl WindowTracker for HostTracker {
    fn add_window(&mut self, id: Wid, hint: AddHint) {
        {
            let mut inner = self.inner.lock().expect("tracker mutex poisoned");
            inner.known.insert(id);
            if inner.resync {
                inner.touched.insert(id);
            }
        }
        self.push(Update::Add {
            id,
            kind: hint.kind,
            protocols: hint.protocols.bits(),
        });
    }

    fn remove_window(&mut self, id: Wid) {
        {
            let mut inner = self.inner.lock().expect("tracker mutex poisoned");
            inner.known.remove(&id);
        }
        self.push(Update::Remove { id });
    }

    fn move_window(&mut self, id: Wid, rect: Rect) {
        self.touch(id);
        self.push(Update::Move {
            id,
            rect: rect.into(),
        });
    }

    fn set_title(&mut self, id: Wid, title: &str) {
        self.touch(id);
        self.push(Update::Title {
            id,
            title: title.to_owned(),
        });
    }

    fn set_region(&mut self, id: Wid, region: Option<&Region>) {
        self.touch(id);
        self.push(Update::Shape {
            id,
            rects: region.map(region_rects),
        });
    }

    fn set_attribute(&mut self, id: Wid, attr: WindowAttr, on: bool) {
        self.touch(id);
        self.push(Update::Attribute { id, attr, on });
    }

    fn set_kind(&mut self, id: Wid, kind: WindowKind) {
        self.touch(id);
        self.push(Update::Kind { id, kind });
    }

    fn set_desktop(&mut self, id: Wid, desktop: u32) {
        self.touch(id);
        self.push(Update::Desktop { id, desktop });
    }

    fn set_zorder(&mut self, ids: &[Wid]) {
        self.push(Update::ZOrder { ids: ids.to_vec() });
    }

    fn set_active_desktop(&mut self, desktop: u32) {
        self.push(Update::ActiveDesktop { desktop });
    }

    fn begin_resync(&mut self) {
        let mut inner = self.inner.lock().expect("tracker mutex poisoned");
        inner.resync = true;
        inner.touched.clear();
    }

    fn end_resync(&mut self) {
        let mut inner = self.inner.lock().expect("tracker mutex poisoned");
        inner.resync = false;
        let stale: Vec<Wid> = inner.known.difference(&inner.touched).copied().collect();
        for id in stale {
            inner.known.remove(&id);
            inner.updates.push(Update::Remove { id });
        }
        inner.touched.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_accumulates_in_order() {
        let mut tracker = HostTracker::new();
        tracker.add_window(
            7,
            AddHint {
                kind: WindowKind::Normal,
                protocols: ProtocolSet::DELETE_WINDOW,
            },
        );
        tracker.move_window(7, Rect::new(0, 0, 100, 50));
        tracker.set_title(7, "hello");
        tracker.remove_window(7);

        let updates = tracker.take_updates();
        assert_eq!(updates.len(), 4);
        assert!(matches!(updates[0], Update::Add { id: 7, .. }));
        assert!(matches!(updates[3], Update::Remove { id: 7 }));
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_resync_sweeps_untouched_windows() {
        let hint = AddHint {
            kind: WindowKind::Normal,
            protocols: ProtocolSet::empty(),
        };
        let mut tracker = HostTracker::new();
        tracker.add_window(1, hint);
        tracker.add_window(2, hint);
        tracker.add_window(3, hint);
        tracker.take_updates();

        tracker.begin_resync();
        tracker.add_window(1, hint);
        tracker.move_window(3, Rect::new(0, 0, 10, 10));
        tracker.end_resync();

        let updates = tracker.take_updates();
        // 1 and 3 were touched; only 2 is swept.
        assert_eq!(
            updates,
            vec![
                Update::Add {
                    id: 1,
                    kind: WindowKind::Normal,
                    protocols: 0,
                },
                Update::Move {
                    id: 3,
                    rect: Rect::new(0, 0, 10, 10).into(),
                },
                Update::Remove { id: 2 },
            ]
        );
    }
}
