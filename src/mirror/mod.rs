//! Mirror Engine
//!
//! Consumes windowing-system notifications and keeps the host-facing view
//! of every guest top-level window in sync: which windows matter at all
//! (relevance), where they are, how they stack, what shape they have and
//! which attributes they carry. Only deltas are forwarded to the window
//! tracker; property values are always re-read from the windowing system
//! because notifications may describe conditions that have already changed
//! again.

pub mod desktop;
pub mod moveresize;
pub mod queue;
pub mod record;
pub mod relevance;
pub mod stacking;
pub mod store;

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::host::tracker::{AddHint, WindowTracker};
use crate::region::{Rect, Region};
use crate::strut::{compute_struts, Strut, StrutError};
use crate::xserver::{PropKind, Wid, WinEvent, WindowSystem};

use desktop::DesktopMap;
use queue::EventQueue;
use record::{RecordFlags, WindowRecord, ATTR_TABLE, DESKTOP_ALL};
use relevance::{compute_relevance, derive_attrs, DenyList};
use stacking::StackOrder;
use store::{WindowHandle, WindowStore};

/// Tunables the engine takes from configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Whether dock/taskbar windows are currently mirrored.
    pub chrome_visible: bool,
    /// Title/class substrings of windows never to mirror.
    pub deny_list: Vec<String>,
    /// Upper bound on the synchronous move/resize confirmation wait.
    pub configure_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chrome_visible: true,
            deny_list: Vec::new(),
            configure_timeout: Duration::from_millis(2000),
        }
    }
}

/// The per-window synchronization state machine.
pub struct MirrorEngine {
    store: WindowStore,
    stack: StackOrder,
    desktops: DesktopMap,
    /// Guest index of the active desktop.
    active_desktop: u32,
    chrome_visible: bool,
    deny: DenyList,
    screens: Vec<Rect>,
    struts: Vec<Strut>,
    configure_timeout: Duration,
}

impl MirrorEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            store: WindowStore::new(),
            stack: StackOrder::new(),
            desktops: DesktopMap::new(),
            active_desktop: 0,
            chrome_visible: options.chrome_visible,
            deny: DenyList::new(options.deny_list),
            screens: Vec::new(),
            struts: Vec::new(),
            configure_timeout: options.configure_timeout,
        }
    }

    /// Physical display areas, used for the off-screen relevance check and
    /// for strut derivation.
    pub fn set_screens(&mut self, screens: Vec<Rect>) {
        self.screens = screens;
    }

    pub fn struts(&self) -> &[Strut] {
        &self.struts
    }

    pub fn window_count(&self) -> usize {
        self.store.len()
    }

    pub fn is_tracked(&self, id: Wid) -> bool {
        self.store.lookup(id).is_some()
    }

    /// The record owning `id` (frame or content), mainly for inspection.
    pub fn record(&self, id: Wid) -> Option<&WindowRecord> {
        self.store.lookup(id).and_then(|h| self.store.get(h))
    }

    /// Top-to-bottom frame ids of all tracked windows.
    pub fn stacking_order(&self) -> Vec<Wid> {
        self.stack
            .order()
            .iter()
            .filter_map(|&h| self.store.get(h))
            .map(|r| r.frame)
            .collect()
    }

    // ------------------------------------------------------------------
    // Notification processing
    // ------------------------------------------------------------------

    /// Drain the queue in arrival order, then flush the z-order if dirty.
    pub fn drain(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        queue: &mut EventQueue,
    ) {
        while let Some(event) = queue.pop() {
            self.handle_event(ws, tracker, event);
        }
        self.stack.flush(&self.store, tracker);
    }

    /// Flush a pending z-order change without draining anything.
    pub fn flush_stacking(&mut self, tracker: &mut dyn WindowTracker) {
        self.stack.flush(&self.store, tracker);
    }

    pub fn handle_event(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        event: WinEvent,
    ) {
        match event {
            WinEvent::Created {
                id,
                parent,
                rect,
                override_redirect,
            } => self.on_created(ws, tracker, id, parent, rect, override_redirect),
            WinEvent::Destroyed { id } => self.on_destroyed(tracker, id),
            WinEvent::Reparented { id, parent } => self.on_reparented(ws, tracker, id, parent),
            WinEvent::Mapped { id } => self.on_mapped(ws, tracker, id),
            WinEvent::Unmapped { id } => self.on_unmapped(ws, tracker, id),
            WinEvent::Configured {
                id,
                rect,
                above,
                override_redirect,
            } => self.on_configured(ws, tracker, id, rect, above, override_redirect),
            WinEvent::PropertyChanged { id, prop } => self.on_property(ws, tracker, id, prop),
            WinEvent::ShapeChanged { id } => self.on_shape_changed(ws, tracker, id),
        }
    }

    fn on_created(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        id: Wid,
        parent: Wid,
        rect: Rect,
        override_redirect: bool,
    ) {
        if parent != ws.root() {
            return;
        }
        if self.store.lookup(id).is_some() {
            debug!("create for already-tracked window {id:#x}");
            return;
        }
        let handle = match self.store.create(id, id, ws.root()) {
            Ok(h) => h,
            Err(err) => {
                warn!("cannot track window {id:#x}: {err}");
                return;
            }
        };
        {
            let rec = self.store.get_mut(handle).expect("just created");
            rec.rect = rect;
            rec.flags
                .set(RecordFlags::OVERRIDE_REDIRECT, override_redirect);
        }
        self.stack.add_top(handle);
        self.refresh_properties(ws, handle);
        self.update_relevance(ws, tracker, handle);
    }

    fn on_destroyed(&mut self, tracker: &mut dyn WindowTracker, id: Wid) {
        let Some(handle) = self.store.lookup(id) else {
            debug!("destroy for untracked window {id:#x}");
            return;
        };
        let rec = self.store.get(handle).expect("looked up");
        if rec.is_relevant() {
            tracker.remove_window(rec.frame);
            self.stack.mark_dirty();
        }
        self.stack.remove(handle);
        self.store.remove(handle);
    }

    fn on_reparented(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        id: Wid,
        parent: Wid,
    ) {
        let root = ws.root();
        if parent == root {
            // Back at top level; treat an unseen id as a fresh window.
            if self.store.lookup(id).is_none() {
                if let Some(rect) = ws.geometry(id) {
                    let or = ws
                        .attributes(id)
                        .map(|a| a.override_redirect)
                        .unwrap_or(false);
                    self.on_created(ws, tracker, id, root, rect, or);
                }
            }
            return;
        }

        // The id is now a child of some other window and stops being a
        // top-level of its own.
        if let Some(handle) = self.store.lookup(id) {
            let rec = self.store.get(handle).expect("looked up");
            if rec.frame == id {
                if rec.is_relevant() {
                    tracker.remove_window(id);
                    self.stack.mark_dirty();
                }
                self.stack.remove(handle);
                self.store.remove(handle);
            }
        }

        // A window manager frame adopting a client window: properties now
        // live on the content id.
        if let Some(parent_handle) = self.store.lookup(parent) {
            if let Err(err) = self.store.attach_content(parent_handle, id) {
                warn!("cannot adopt {id:#x} into frame {parent:#x}: {err}");
                return;
            }
            self.refresh_properties(ws, parent_handle);
            self.refresh_shape(ws, parent_handle);
            self.apply_attrs(ws, tracker, parent_handle);
            self.update_relevance(ws, tracker, parent_handle);
        }
    }

    fn on_mapped(&mut self, ws: &mut dyn WindowSystem, tracker: &mut dyn WindowTracker, id: Wid) {
        let handle = match self.store.lookup(id) {
            Some(h) => h,
            None => {
                // Mapped before we ever saw a create (startup race); adopt it.
                let Some(rect) = ws.geometry(id) else {
                    debug!("map for vanished window {id:#x}");
                    return;
                };
                let root = ws.root();
                self.on_created(ws, tracker, id, root, rect, false);
                match self.store.lookup(id) {
                    Some(h) => h,
                    None => return,
                }
            }
        };
        if let Some(rec) = self.store.get_mut(handle) {
            rec.flags
                .insert(RecordFlags::VIEWABLE | RecordFlags::WAS_VIEWABLE);
        }
        self.refresh_properties(ws, handle);
        self.refresh_shape(ws, handle);
        self.apply_attrs(ws, tracker, handle);
        self.update_relevance(ws, tracker, handle);
    }

    fn on_unmapped(&mut self, ws: &mut dyn WindowSystem, tracker: &mut dyn WindowTracker, id: Wid) {
        let Some(handle) = self.store.lookup(id) else {
            debug!("unmap for untracked window {id:#x}");
            return;
        };
        let content = {
            let rec = self.store.get_mut(handle).expect("looked up");
            rec.flags.remove(RecordFlags::VIEWABLE);
            rec.content
        };
        let states = ws.states(content);
        let iconic = ws.iconic_wm_state(content);
        if let Some(rec) = self.store.get_mut(handle) {
            rec.states = states;
            rec.iconic = iconic;
        }
        self.apply_attrs(ws, tracker, handle);
        self.update_relevance(ws, tracker, handle);
    }

    fn on_configured(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        id: Wid,
        rect: Rect,
        above: Option<Wid>,
        override_redirect: bool,
    ) {
        let Some(handle) = self.store.lookup(id) else {
            debug!("configure for untracked window {id:#x}");
            return;
        };
        let (frame, moved, relevant) = {
            let rec = self.store.get_mut(handle).expect("looked up");
            if rec.frame != id {
                // Content windows move with their frame; nothing to do.
                return;
            }
            rec.flags
                .set(RecordFlags::OVERRIDE_REDIRECT, override_redirect);
            let moved = rec.rect != rect;
            rec.rect = rect;
            (rec.frame, moved, rec.is_relevant())
        };
        if moved && relevant {
            tracker.move_window(frame, rect);
        }

        let lower = above.and_then(|sibling| self.store.lookup(sibling));
        if above.is_some() && lower.is_none() {
            // The sibling is not (or no longer) one of ours; the exported
            // order is stale until the next flush recomputes it.
            debug!("restack of {frame:#x} above unknown sibling {above:?}");
            self.stack.mark_dirty();
        } else if let Err(err) = self.stack.restack(handle, lower, relevant) {
            debug!("restack of {frame:#x} rejected: {err}");
        }

        if moved {
            self.update_relevance(ws, tracker, handle);
        }
    }

    fn on_property(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        id: Wid,
        prop: PropKind,
    ) {
        let Some(handle) = self.store.lookup(id) else {
            debug!("property change for untracked window {id:#x}");
            return;
        };
        let content = self.store.get(handle).expect("looked up").content;

        match prop {
            PropKind::Title => {
                let Some(bytes) = ws.title(content) else {
                    return;
                };
                match String::from_utf8(bytes) {
                    Ok(title) => {
                        let rec = self.store.get_mut(handle).expect("looked up");
                        if rec.title != title {
                            rec.title = title;
                            if rec.is_relevant() {
                                let (frame, title) = (rec.frame, rec.title.clone());
                                tracker.set_title(frame, &title);
                            }
                        }
                    }
                    Err(_) => {
                        // Malformed text cancels the update; the previous
                        // title stays in place.
                        debug!("discarding malformed title for {id:#x}");
                    }
                }
            }
            PropKind::Kind => {
                let kind = ws.window_kind(content).unwrap_or_default();
                let rec = self.store.get_mut(handle).expect("looked up");
                if rec.kind != kind {
                    rec.kind = kind;
                    if rec.is_relevant() {
                        tracker.set_kind(rec.frame, kind);
                    }
                    self.update_relevance(ws, tracker, handle);
                }
            }
            PropKind::Desktop => {
                let Some(desktop) = ws.desktop(content) else {
                    return;
                };
                if desktop != DESKTOP_ALL && desktop >= self.desktops.count() {
                    // Desktop configuration has not converged yet; keep the
                    // previous assignment until a later notification
                    // resolves cleanly.
                    warn!(
                        "window {id:#x} reports desktop {desktop} outside known count {}; keeping previous",
                        self.desktops.count()
                    );
                    return;
                }
                let rec = self.store.get_mut(handle).expect("looked up");
                if rec.desktop != desktop {
                    rec.desktop = desktop;
                    if rec.is_relevant() {
                        let frame = rec.frame;
                        let host = self.host_desktop(desktop);
                        tracker.set_desktop(frame, host);
                    }
                    self.apply_attrs(ws, tracker, handle);
                    self.update_relevance(ws, tracker, handle);
                }
            }
            PropKind::State | PropKind::WmState => {
                let states = ws.states(content);
                let iconic = ws.iconic_wm_state(content);
                if let Some(rec) = self.store.get_mut(handle) {
                    rec.states = states;
                    rec.iconic = iconic;
                }
                self.apply_attrs(ws, tracker, handle);
            }
            PropKind::Actions => {
                let actions = ws.actions(content);
                if let Some(rec) = self.store.get_mut(handle) {
                    rec.actions = actions;
                }
                self.apply_attrs(ws, tracker, handle);
            }
            PropKind::Protocols => {
                let protocols = ws.protocols(content);
                if let Some(rec) = self.store.get_mut(handle) {
                    rec.protocols = protocols;
                }
            }
            PropKind::WmHints => {
                // Input/urgency hints can flip the visibility class.
                if let Some(attrs) = ws.attributes(id) {
                    if let Some(rec) = self.store.get_mut(handle) {
                        rec.flags.set(RecordFlags::INPUT_ONLY, attrs.input_only);
                    }
                    self.update_relevance(ws, tracker, handle);
                }
            }
            PropKind::Other => {}
        }
    }

    fn on_shape_changed(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        id: Wid,
    ) {
        let Some(handle) = self.store.lookup(id) else {
            debug!("shape change for untracked window {id:#x}");
            return;
        };
        if self.refresh_shape(ws, handle) {
            let rec = self.store.get(handle).expect("looked up");
            if rec.is_relevant() {
                tracker.set_region(rec.frame, rec.shape.as_ref());
            }
        }
    }

    // ------------------------------------------------------------------
    // State refresh
    // ------------------------------------------------------------------

    /// Re-read every property the relevance and attribute machinery feeds
    /// on. The notification payload is never trusted: by the time it is
    /// processed the state it described may have changed again.
    fn refresh_properties(&mut self, ws: &mut dyn WindowSystem, handle: WindowHandle) {
        let Some(rec) = self.store.get(handle) else {
            return;
        };
        let (frame, content) = (rec.frame, rec.content);

        let attrs = ws.attributes(frame);
        let kind = ws.window_kind(content);
        let class = ws.class_hint(content);
        let desktop = ws.desktop(content);
        let states = ws.states(content);
        let actions = ws.actions(content);
        let iconic = ws.iconic_wm_state(content);
        let protocols = ws.protocols(content);
        let title = ws.title(content);

        let desktop_count = self.desktops.count();
        let Some(rec) = self.store.get_mut(handle) else {
            return;
        };
        if let Some(a) = attrs {
            rec.flags.set(RecordFlags::INPUT_ONLY, a.input_only);
            rec.flags
                .set(RecordFlags::OVERRIDE_REDIRECT, a.override_redirect);
            if a.viewable {
                rec.flags
                    .insert(RecordFlags::VIEWABLE | RecordFlags::WAS_VIEWABLE);
            } else {
                rec.flags.remove(RecordFlags::VIEWABLE);
            }
        }
        rec.kind = kind.unwrap_or_default();
        if let Some(class) = class {
            rec.class = class;
        }
        if let Some(d) = desktop {
            if d == DESKTOP_ALL || d < desktop_count {
                rec.desktop = d;
            } else {
                warn!(
                    "window {frame:#x} reports desktop {d} outside known count {desktop_count}; keeping previous"
                );
            }
        }
        rec.states = states;
        rec.actions = actions;
        rec.iconic = iconic;
        rec.protocols = protocols;
        if let Some(bytes) = title {
            match String::from_utf8(bytes) {
                Ok(t) => rec.title = t,
                Err(_) => debug!("discarding malformed title for {frame:#x}"),
            }
        }
    }

    /// Recompute the effective clip shape: intersection of the clip and
    /// bounding shapes, either absent side counting as unbounded. Returns
    /// whether the stored shape changed; a broken intersection keeps the
    /// previous shape.
    fn refresh_shape(&mut self, ws: &mut dyn WindowSystem, handle: WindowHandle) -> bool {
        let Some(rec) = self.store.get(handle) else {
            return false;
        };
        let (frame, content) = (rec.frame, rec.content);
        let pair = ws.shape(content);
        let new = match (pair.clip, pair.bounding) {
            (None, None) => None,
            (clip, bounding) => {
                let clip = clip.map(|v| Region::validate(&v).0);
                let bounding = bounding.map(|v| Region::validate(&v).0);
                let combined = match (clip, bounding) {
                    (Some(c), Some(b)) => c.intersect(&b),
                    (Some(c), None) => c,
                    (None, Some(b)) => b,
                    (None, None) => unreachable!("matched above"),
                };
                if combined.is_broken() {
                    warn!("shape arithmetic failed for {frame:#x}; keeping previous shape");
                    return false;
                }
                Some(combined)
            }
        };
        let rec = self.store.get_mut(handle).expect("looked up");
        if rec.shape == new {
            false
        } else {
            rec.shape = new;
            true
        }
    }

    /// Re-derive the attribute set and forward only the flipped bits.
    fn apply_attrs(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        handle: WindowHandle,
    ) {
        let supports_hidden = ws.supports_hidden_state();
        let Some(rec) = self.store.get_mut(handle) else {
            return;
        };
        let new = derive_attrs(rec, self.active_desktop, supports_hidden);
        let old = rec.attrs;
        if old == new {
            return;
        }
        rec.attrs = new;
        if !rec.is_relevant() {
            return;
        }
        let frame = rec.frame;
        let flipped = old ^ new;
        for &(bit, attr) in ATTR_TABLE {
            if flipped.contains(bit) {
                tracker.set_attribute(frame, attr, new.contains(bit));
            }
        }
    }

    // ------------------------------------------------------------------
    // Relevance transitions
    // ------------------------------------------------------------------

    fn update_relevance(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        handle: WindowHandle,
    ) {
        let Some(rec) = self.store.get(handle) else {
            return;
        };
        let was = rec.is_relevant();
        let now = compute_relevance(
            rec,
            self.active_desktop,
            self.chrome_visible,
            &self.deny,
            &self.screens,
        );
        if was == now {
            return;
        }
        if now {
            self.store
                .get_mut(handle)
                .expect("looked up")
                .flags
                .insert(RecordFlags::RELEVANT);
            // The record may have sat dormant and gone stale; re-read
            // everything before announcing it.
            self.resync_record(ws, tracker, handle);
            self.stack.mark_dirty();
        } else {
            let rec = self.store.get_mut(handle).expect("looked up");
            rec.flags.remove(RecordFlags::RELEVANT);
            // Withdrawn, not destroyed: iconify/restore must not become
            // destroy/recreate.
            tracker.remove_window(rec.frame);
            self.stack.mark_dirty();
        }
    }

    /// Full per-window resync: refresh every field from the windowing
    /// system, then announce the complete state.
    fn resync_record(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        handle: WindowHandle,
    ) {
        let Some(rec) = self.store.get(handle) else {
            return;
        };
        let frame = rec.frame;
        if let Some(rect) = ws.geometry(frame) {
            self.store.get_mut(handle).expect("looked up").rect = rect;
        }
        self.refresh_properties(ws, handle);
        self.refresh_shape(ws, handle);

        let supports_hidden = ws.supports_hidden_state();
        let host_desktop;
        {
            let rec = self.store.get_mut(handle).expect("looked up");
            rec.attrs = derive_attrs(rec, self.active_desktop, supports_hidden);
            host_desktop = rec.desktop;
        }
        let host_desktop = self.host_desktop(host_desktop);

        let rec = self.store.get(handle).expect("looked up");
        tracker.add_window(
            rec.frame,
            AddHint {
                kind: rec.kind,
                protocols: rec.protocols,
            },
        );
        tracker.move_window(rec.frame, rec.rect);
        if !rec.title.is_empty() {
            tracker.set_title(rec.frame, &rec.title);
        }
        if rec.shape.is_some() {
            tracker.set_region(rec.frame, rec.shape.as_ref());
        }
        tracker.set_desktop(rec.frame, host_desktop);
        for &(bit, attr) in ATTR_TABLE {
            if rec.attrs.contains(bit) {
                tracker.set_attribute(rec.frame, attr, true);
            }
        }
    }

    fn refresh_all_relevance(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
    ) {
        for handle in self.store.handles() {
            self.apply_attrs(ws, tracker, handle);
            self.update_relevance(ws, tracker, handle);
        }
    }

    fn host_desktop(&self, guest: u32) -> u32 {
        if guest == DESKTOP_ALL {
            DESKTOP_ALL
        } else {
            self.desktops.host_id(guest).unwrap_or(guest)
        }
    }

    // ------------------------------------------------------------------
    // Session-level operations
    // ------------------------------------------------------------------

    /// Enumerate the existing window tree and adopt every top-level window,
    /// as if creation notifications had arrived bottom-to-top.
    pub fn initial_scan(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
    ) -> Result<()> {
        let root = ws.root();
        let windows = ws.top_level_windows()?;
        info!("initial scan found {} top-level windows", windows.len());
        for id in windows {
            let Some(rect) = ws.geometry(id) else {
                continue;
            };
            let attrs = ws.attributes(id);
            let or = attrs.map(|a| a.override_redirect).unwrap_or(false);
            self.on_created(ws, tracker, id, root, rect, or);
            if attrs.map(|a| a.viewable).unwrap_or(false) {
                self.on_mapped(ws, tracker, id);
            }
        }
        self.stack.flush(&self.store, tracker);
        Ok(())
    }

    /// Full resync of every relevant window, sweeping hosts-side windows
    /// that no longer exist here.
    pub fn resync_all(&mut self, ws: &mut dyn WindowSystem, tracker: &mut dyn WindowTracker) {
        tracker.begin_resync();
        for handle in self.store.handles() {
            if self
                .store
                .get(handle)
                .map(|r| r.is_relevant())
                .unwrap_or(false)
            {
                self.resync_record(ws, tracker, handle);
            }
        }
        tracker.end_resync();
        self.stack.mark_dirty();
        self.stack.flush(&self.store, tracker);
    }

    // ------------------------------------------------------------------
    // Produced synchronous API
    // ------------------------------------------------------------------

    /// Raise a group of windows to the top, preserving their relative order
    /// (`ids` bottom-to-top).
    pub fn raise_group(&mut self, ws: &mut dyn WindowSystem, ids: &[Wid]) -> Result<()> {
        let mut below: Option<Wid> = None;
        for &id in ids {
            if self.store.lookup(id).is_none() {
                debug!("raise for untracked window {id:#x}");
                continue;
            }
            ws.restack_above(id, below)?;
            below = Some(id);
        }
        Ok(())
    }

    pub fn close_window(&mut self, ws: &mut dyn WindowSystem, id: Wid) -> Result<()> {
        if self.store.lookup(id).is_none() {
            debug!("close for untracked window {id:#x}");
            return Ok(());
        }
        ws.close(id)
    }

    pub fn show_window(&mut self, ws: &mut dyn WindowSystem, id: Wid) -> Result<()> {
        if self.store.lookup(id).is_none() {
            debug!("show for untracked window {id:#x}");
            return Ok(());
        }
        ws.map(id)
    }

    pub fn hide_window(&mut self, ws: &mut dyn WindowSystem, id: Wid) -> Result<()> {
        if self.store.lookup(id).is_none() {
            debug!("hide for untracked window {id:#x}");
            return Ok(());
        }
        ws.unmap(id)
    }

    pub fn minimize_window(&mut self, ws: &mut dyn WindowSystem, id: Wid) -> Result<()> {
        if self.store.lookup(id).is_none() {
            debug!("minimize for untracked window {id:#x}");
            return Ok(());
        }
        ws.iconify(id)
    }

    pub fn maximize_window(&mut self, ws: &mut dyn WindowSystem, id: Wid) -> Result<()> {
        if self.store.lookup(id).is_none() {
            debug!("maximize for untracked window {id:#x}");
            return Ok(());
        }
        ws.set_maximized(id, true)
    }

    pub fn unmaximize_window(&mut self, ws: &mut dyn WindowSystem, id: Wid) -> Result<()> {
        if self.store.lookup(id).is_none() {
            debug!("unmaximize for untracked window {id:#x}");
            return Ok(());
        }
        ws.set_maximized(id, false)
    }

    /// Replace the desktop configuration; `host_ids[i]` is the host id of
    /// guest desktop `i`.
    pub fn set_desktop_config(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        host_ids: &[u32],
    ) {
        self.desktops.rebuild(host_ids);
        let count = self.desktops.count();
        if count > 0 && self.active_desktop >= count {
            self.active_desktop = count - 1;
        }
        self.refresh_all_relevance(ws, tracker);
        self.stack.flush(&self.store, tracker);
    }

    /// Switch the active desktop (by host id) and re-evaluate every window.
    pub fn set_active_desktop(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        host_id: u32,
    ) {
        let Some(index) = self.desktops.index_of(host_id) else {
            warn!("active desktop {host_id} is not in the desktop map");
            return;
        };
        if index == self.active_desktop {
            return;
        }
        self.active_desktop = index;
        tracker.set_active_desktop(host_id);
        self.refresh_all_relevance(ws, tracker);
        self.stack.flush(&self.store, tracker);
    }

    /// Recompute struts from per-screen work areas. On failure the previous
    /// strut configuration stays in place.
    pub fn set_work_areas(&mut self, work_areas: &[Rect]) -> Result<(), StrutError> {
        match compute_struts(&self.screens, work_areas) {
            Ok(struts) => {
                self.struts = struts;
                Ok(())
            }
            Err(err) => {
                warn!("work-area translation failed, keeping previous struts: {err}");
                Err(err)
            }
        }
    }

    /// Toggle whether dock/taskbar windows are mirrored.
    pub fn set_chrome_visible(
        &mut self,
        ws: &mut dyn WindowSystem,
        tracker: &mut dyn WindowTracker,
        visible: bool,
    ) {
        if self.chrome_visible == visible {
            return;
        }
        self.chrome_visible = visible;
        self.refresh_all_relevance(ws, tracker);
        self.stack.flush(&self.store, tracker);
    }
}
