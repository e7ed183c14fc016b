//! Notification Queue
//!
//! Notifications are processed strictly in arrival order, with one
//! exception: when a destroy arrives, earlier pending notifications for the
//! same identity are discarded so nothing operates on a window that is
//! already gone.

use std::collections::VecDeque;

use tracing::debug;

use crate::xserver::WinEvent;

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<WinEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: WinEvent) {
        if let WinEvent::Destroyed { id } = event {
            let before = self.events.len();
            self.events.retain(|e| e.window() != id);
            let dropped = before - self.events.len();
            if dropped > 0 {
                debug!("discarded {dropped} pending notifications for destroyed {id:#x}");
            }
        }
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<WinEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Rect;

    #[test]
    fn test_fifo_order() {
        let mut q = EventQueue::new();
        q.push(WinEvent::Mapped { id: 1 });
        q.push(WinEvent::Mapped { id: 2 });
        assert_eq!(q.pop(), Some(WinEvent::Mapped { id: 1 }));
        assert_eq!(q.pop(), Some(WinEvent::Mapped { id: 2 }));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_destroy_discards_pending_for_same_window() {
        let mut q = EventQueue::new();
        q.push(WinEvent::Created {
            id: 1,
            parent: 0,
            rect: Rect::new(0, 0, 10, 10),
            override_redirect: false,
        });
        q.push(WinEvent::Mapped { id: 1 });
        q.push(WinEvent::Mapped { id: 2 });
        q.push(WinEvent::Destroyed { id: 1 });

        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some(WinEvent::Mapped { id: 2 }));
        assert_eq!(q.pop(), Some(WinEvent::Destroyed { id: 1 }));
        assert!(q.is_empty());
    }
}
