//! Synchronous Move/Resize
//!
//! The one place the engine actively waits: after issuing a geometry change
//! it keeps pumping notifications re-entrantly through itself until the
//! confirming configure for that window arrives, then returns the confirmed
//! geometry. The wait is bounded so a windowing system that never confirms
//! cannot livelock the caller.

use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use super::MirrorEngine;
use crate::host::tracker::WindowTracker;
use crate::region::Rect;
use crate::xserver::{Wid, WinEvent, WindowSystem};

#[derive(Debug, Error)]
pub enum MoveResizeError {
    #[error("window {0:#x} is not tracked")]
    UnknownWindow(Wid),
    #[error("no configure confirmation for {id:#x} within {timeout_ms} ms")]
    Timeout { id: Wid, timeout_ms: u64 },
    #[error("geometry change request failed")]
    Request(#[source] anyhow::Error),
}

impl MirrorEngine {
    /// Request new frame geometry and block (pumping the event stream) until
    /// the windowing system confirms it. Notifications for other windows
    /// arriving in the meantime are processed normally.
    pub fn move_resize(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        id: Wid,
        rect: Rect,
    ) -> Result<Rect, MoveResizeError> {
        let Some(handle) = self.store.lookup(id) else {
            return Err(MoveResizeError::UnknownWindow(id));
        };
        let frame = self.store.get(handle).expect("looked up").frame;

        ws.configure(frame, rect).map_err(MoveResizeError::Request)?;
        debug!("awaiting configure confirmation for {frame:#x}");

        let timeout = self.configure_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(MoveResizeError::Timeout {
                    id: frame,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            let Some(event) = ws
                .poll_event(remaining)
                .map_err(MoveResizeError::Request)?
            else {
                continue;
            };
            let confirmed =
                matches!(event, WinEvent::Configured { id: eid, .. } if eid == frame);
            self.handle_event(ws, tracker, event);
            if confirmed {
                // The handler above already recorded the confirmed geometry.
                return self
                    .store
                    .get(handle)
                    .map(|r| r.rect)
                    .ok_or(MoveResizeError::UnknownWindow(frame));
            }
        }
    }
}
