//! Live X11 implementation of [`WindowSystem`] on top of `x11rb`.
//!
//! Per-window query failures are collapsed into "absent": a window that
//! vanished mid-query is indistinguishable from one that never set the
//! property, and the engine treats both as irrelevant.

use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::atoms::Atoms;
use super::{
    ActionSet, PropKind, ProtocolSet, ShapePair, StateSet, Wid, WinEvent, WindowAttributes,
    WindowKind, WindowSystem,
};
use crate::region::Rect;

const X11_TOKEN: Token = Token(0);

pub struct LiveWindowSystem {
    conn: RustConnection,
    root: Wid,
    atoms: Atoms,
    has_shape: bool,
    supports_hidden: bool,
    poll: Poll,
    events: Events,
}

impl LiveWindowSystem {
    /// Connect to the display, select the root event masks and probe the
    /// extensions this adapter uses.
    pub fn open() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("connecting to the X server")?;
        let root = conn.setup().roots[screen_num].root;
        let atoms = Atoms::new(&conn)?;

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::SUBSTRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
        )?
        .check()
        .context("selecting root window events")?;

        let has_shape = conn
            .shape_query_version()
            .ok()
            .and_then(|c| c.reply().ok())
            .is_some();
        if !has_shape {
            warn!("shape extension unavailable; windows will mirror as rectangles");
        }

        let supports_hidden = conn
            .get_property(false, root, atoms.net_supported, AtomEnum::ATOM, 0, 4096)
            .ok()
            .and_then(|c| c.reply().ok())
            .and_then(|r| r.value32().map(|v| v.collect::<Vec<_>>()))
            .map(|v| v.contains(&atoms.net_wm_state_hidden))
            .unwrap_or(false);

        let poll = Poll::new().context("creating event poll")?;
        let fd = conn.stream().as_raw_fd();
        poll.registry()
            .register(&mut SourceFd(&fd), X11_TOKEN, Interest::READABLE)
            .context("registering X connection for polling")?;

        info!(
            "connected to X screen {screen_num}, root {root:#x} (shape={has_shape}, hidden-state={supports_hidden})"
        );
        Ok(Self {
            conn,
            root,
            atoms,
            has_shape,
            supports_hidden,
            poll,
            events: Events::with_capacity(8),
        })
    }

    /// Physical display rectangles (one per RandR monitor, or the whole
    /// screen when RandR is unavailable).
    pub fn screen_rects(&self) -> Result<Vec<Rect>> {
        use x11rb::protocol::randr::ConnectionExt as _;
        if let Ok(cookie) = self.conn.randr_get_monitors(self.root, true) {
            if let Ok(reply) = cookie.reply() {
                if !reply.monitors.is_empty() {
                    return Ok(reply
                        .monitors
                        .iter()
                        .map(|m| {
                            Rect::new(
                                m.x as i32,
                                m.y as i32,
                                m.x as i32 + m.width as i32,
                                m.y as i32 + m.height as i32,
                            )
                        })
                        .collect());
                }
            }
        }
        let geom = self.conn.get_geometry(self.root)?.reply()?;
        Ok(vec![Rect::new(
            0,
            0,
            geom.width as i32,
            geom.height as i32,
        )])
    }

    fn get_prop(
        &self,
        id: Wid,
        property: Atom,
        type_: impl Into<Atom>,
        length: u32,
    ) -> Option<GetPropertyReply> {
        let reply = self
            .conn
            .get_property(false, id, property, type_, 0, length)
            .ok()?
            .reply()
            .ok()?;
        if reply.type_ == x11rb::NONE {
            None
        } else {
            Some(reply)
        }
    }

    fn atom_list(&self, id: Wid, property: Atom) -> Option<Vec<Atom>> {
        self.get_prop(id, property, AtomEnum::ATOM, 1024)
            .and_then(|r| r.value32().map(|v| v.collect()))
    }

    fn kind_from_atom(&self, atom: Atom) -> Option<WindowKind> {
        let a = &self.atoms;
        let kind = if atom == a.net_wm_window_type_desktop {
            WindowKind::Desktop
        } else if atom == a.net_wm_window_type_dock {
            WindowKind::Dock
        } else if atom == a.net_wm_window_type_toolbar {
            WindowKind::Toolbar
        } else if atom == a.net_wm_window_type_menu {
            WindowKind::Menu
        } else if atom == a.net_wm_window_type_utility {
            WindowKind::Utility
        } else if atom == a.net_wm_window_type_splash {
            WindowKind::Splash
        } else if atom == a.net_wm_window_type_dialog {
            WindowKind::Dialog
        } else if atom == a.net_wm_window_type_dropdown_menu {
            WindowKind::DropdownMenu
        } else if atom == a.net_wm_window_type_popup_menu {
            WindowKind::PopupMenu
        } else if atom == a.net_wm_window_type_tooltip {
            WindowKind::Tooltip
        } else if atom == a.net_wm_window_type_notification {
            WindowKind::Notification
        } else if atom == a.net_wm_window_type_combo {
            WindowKind::Combo
        } else if atom == a.net_wm_window_type_dnd {
            WindowKind::Dnd
        } else if atom == a.net_wm_window_type_normal {
            WindowKind::Normal
        } else {
            return None;
        };
        Some(kind)
    }

    fn prop_kind(&self, atom: Atom) -> PropKind {
        let a = &self.atoms;
        let wm_name: Atom = AtomEnum::WM_NAME.into();
        let wm_hints: Atom = AtomEnum::WM_HINTS.into();
        if atom == a.net_wm_name || atom == wm_name {
            PropKind::Title
        } else if atom == a.net_wm_state {
            PropKind::State
        } else if atom == a.net_wm_window_type {
            PropKind::Kind
        } else if atom == a.net_wm_desktop {
            PropKind::Desktop
        } else if atom == a.wm_protocols {
            PropKind::Protocols
        } else if atom == a.net_wm_allowed_actions {
            PropKind::Actions
        } else if atom == a.wm_state {
            PropKind::WmState
        } else if atom == wm_hints {
            PropKind::WmHints
        } else {
            PropKind::Other
        }
    }

    /// Select per-window notifications on a window we just learned about.
    fn watch_window(&self, id: Wid) {
        let _ = self.conn.change_window_attributes(
            id,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        );
        if self.has_shape {
            let _ = self.conn.shape_select_input(id, true);
        }
        let _ = self.conn.flush();
    }

    fn shape_rects(&self, id: Wid, kind: shape::SK) -> Option<Vec<Rect>> {
        let reply = self.conn.shape_get_rectangles(id, kind).ok()?.reply().ok()?;
        Some(
            reply
                .rectangles
                .iter()
                .map(|r| {
                    Rect::new(
                        r.x as i32,
                        r.y as i32,
                        r.x as i32 + r.width as i32,
                        r.y as i32 + r.height as i32,
                    )
                })
                .collect(),
        )
    }

    fn send_client_message(
        &self,
        window: Wid,
        destination: Wid,
        type_: Atom,
        data: [u32; 5],
        mask: EventMask,
    ) -> Result<()> {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_,
            data: data.into(),
        };
        self.conn.send_event(false, destination, mask, &event)?;
        self.conn.flush()?;
        Ok(())
    }

    fn translate(&mut self, event: Event) -> Option<WinEvent> {
        match event {
            Event::CreateNotify(e) => {
                if e.parent != self.root {
                    return None;
                }
                self.watch_window(e.window);
                Some(WinEvent::Created {
                    id: e.window,
                    parent: e.parent,
                    rect: Rect::new(
                        e.x as i32,
                        e.y as i32,
                        e.x as i32 + e.width as i32,
                        e.y as i32 + e.height as i32,
                    ),
                    override_redirect: e.override_redirect,
                })
            }
            Event::DestroyNotify(e) => Some(WinEvent::Destroyed { id: e.window }),
            Event::ReparentNotify(e) => {
                self.watch_window(e.window);
                Some(WinEvent::Reparented {
                    id: e.window,
                    parent: e.parent,
                })
            }
            Event::MapNotify(e) => Some(WinEvent::Mapped { id: e.window }),
            Event::UnmapNotify(e) => Some(WinEvent::Unmapped { id: e.window }),
            Event::ConfigureNotify(e) => Some(WinEvent::Configured {
                id: e.window,
                rect: Rect::new(
                    e.x as i32,
                    e.y as i32,
                    e.x as i32 + e.width as i32,
                    e.y as i32 + e.height as i32,
                ),
                above: if e.above_sibling == x11rb::NONE {
                    None
                } else {
                    Some(e.above_sibling)
                },
                override_redirect: e.override_redirect,
            }),
            Event::PropertyNotify(e) => Some(WinEvent::PropertyChanged {
                id: e.window,
                prop: self.prop_kind(e.atom),
            }),
            Event::ShapeNotify(e) => Some(WinEvent::ShapeChanged {
                id: e.affected_window,
            }),
            Event::Error(e) => {
                debug!(
                    "X error: code={}, request={}.{}",
                    e.error_code, e.major_opcode, e.minor_opcode
                );
                None
            }
            _ => None,
        }
    }
}

impl WindowSystem for LiveWindowSystem {
    fn root(&self) -> Wid {
        self.root
    }

    fn top_level_windows(&mut self) -> Result<Vec<Wid>> {
        let reply = self
            .conn
            .query_tree(self.root)?
            .reply()
            .context("enumerating the window tree")?;
        // Watch them all; the create notifications predate us.
        for &child in &reply.children {
            self.watch_window(child);
        }
        Ok(reply.children)
    }

    fn attributes(&mut self, id: Wid) -> Option<WindowAttributes> {
        let reply = self.conn.get_window_attributes(id).ok()?.reply().ok()?;
        Some(WindowAttributes {
            input_only: reply.class == WindowClass::INPUT_ONLY,
            viewable: reply.map_state == MapState::VIEWABLE,
            override_redirect: reply.override_redirect,
        })
    }

    fn geometry(&mut self, id: Wid) -> Option<Rect> {
        let geom = self.conn.get_geometry(id).ok()?.reply().ok()?;
        Some(Rect::new(
            geom.x as i32,
            geom.y as i32,
            geom.x as i32 + geom.width as i32,
            geom.y as i32 + geom.height as i32,
        ))
    }

    fn title(&mut self, id: Wid) -> Option<Vec<u8>> {
        if let Some(reply) = self.get_prop(id, self.atoms.net_wm_name, self.atoms.utf8_string, 1024)
        {
            return Some(reply.value);
        }
        self.get_prop(id, AtomEnum::WM_NAME.into(), AtomEnum::ANY, 1024)
            .map(|r| r.value)
    }

    fn class_hint(&mut self, id: Wid) -> Option<String> {
        let reply = self.get_prop(id, AtomEnum::WM_CLASS.into(), AtomEnum::STRING, 1024)?;
        // WM_CLASS is two NUL-terminated strings: instance, then class.
        let mut parts = reply.value.split(|&b| b == 0).filter(|s| !s.is_empty());
        let instance = parts.next();
        let class = parts.next().or(instance)?;
        String::from_utf8(class.to_vec()).ok()
    }

    fn window_kind(&mut self, id: Wid) -> Option<WindowKind> {
        let list = self.atom_list(id, self.atoms.net_wm_window_type)?;
        Some(
            list.iter()
                .find_map(|&a| self.kind_from_atom(a))
                .unwrap_or(WindowKind::Normal),
        )
    }

    fn states(&mut self, id: Wid) -> Option<StateSet> {
        let list = self.atom_list(id, self.atoms.net_wm_state)?;
        let a = &self.atoms;
        let mut set = StateSet::empty();
        for atom in list {
            if atom == a.net_wm_state_modal {
                set |= StateSet::MODAL;
            } else if atom == a.net_wm_state_sticky {
                set |= StateSet::STICKY;
            } else if atom == a.net_wm_state_maximized_vert {
                set |= StateSet::MAXIMIZED_VERT;
            } else if atom == a.net_wm_state_maximized_horz {
                set |= StateSet::MAXIMIZED_HORZ;
            } else if atom == a.net_wm_state_shaded {
                set |= StateSet::SHADED;
            } else if atom == a.net_wm_state_skip_taskbar {
                set |= StateSet::SKIP_TASKBAR;
            } else if atom == a.net_wm_state_skip_pager {
                set |= StateSet::SKIP_PAGER;
            } else if atom == a.net_wm_state_hidden {
                set |= StateSet::HIDDEN;
            } else if atom == a.net_wm_state_fullscreen {
                set |= StateSet::FULLSCREEN;
            } else if atom == a.net_wm_state_above {
                set |= StateSet::ABOVE;
            } else if atom == a.net_wm_state_below {
                set |= StateSet::BELOW;
            } else if atom == a.net_wm_state_demands_attention {
                set |= StateSet::DEMANDS_ATTENTION;
            }
        }
        Some(set)
    }

    fn actions(&mut self, id: Wid) -> Option<ActionSet> {
        let list = self.atom_list(id, self.atoms.net_wm_allowed_actions)?;
        let a = &self.atoms;
        let mut set = ActionSet::empty();
        for atom in list {
            if atom == a.net_wm_action_move {
                set |= ActionSet::MOVE;
            } else if atom == a.net_wm_action_resize {
                set |= ActionSet::RESIZE;
            } else if atom == a.net_wm_action_minimize {
                set |= ActionSet::MINIMIZE;
            } else if atom == a.net_wm_action_shade {
                set |= ActionSet::SHADE;
            } else if atom == a.net_wm_action_stick {
                set |= ActionSet::STICK;
            } else if atom == a.net_wm_action_maximize_horz {
                set |= ActionSet::MAXIMIZE_HORZ;
            } else if atom == a.net_wm_action_maximize_vert {
                set |= ActionSet::MAXIMIZE_VERT;
            } else if atom == a.net_wm_action_fullscreen {
                set |= ActionSet::FULLSCREEN;
            } else if atom == a.net_wm_action_change_desktop {
                set |= ActionSet::CHANGE_DESKTOP;
            } else if atom == a.net_wm_action_close {
                set |= ActionSet::CLOSE;
            }
        }
        Some(set)
    }

    fn desktop(&mut self, id: Wid) -> Option<u32> {
        self.get_prop(id, self.atoms.net_wm_desktop, AtomEnum::CARDINAL, 1)
            .and_then(|r| r.value32()?.next())
    }

    fn iconic_wm_state(&mut self, id: Wid) -> Option<bool> {
        const ICONIC_STATE: u32 = 3;
        let state = self
            .get_prop(id, self.atoms.wm_state, self.atoms.wm_state, 2)
            .and_then(|r| r.value32()?.next())?;
        Some(state == ICONIC_STATE)
    }

    fn supports_hidden_state(&self) -> bool {
        self.supports_hidden
    }

    fn protocols(&mut self, id: Wid) -> ProtocolSet {
        let Some(list) = self.atom_list(id, self.atoms.wm_protocols) else {
            return ProtocolSet::empty();
        };
        let a = &self.atoms;
        let mut set = ProtocolSet::empty();
        for atom in list {
            if atom == a.wm_delete_window {
                set |= ProtocolSet::DELETE_WINDOW;
            } else if atom == a.wm_take_focus {
                set |= ProtocolSet::TAKE_FOCUS;
            } else if atom == a.net_wm_ping {
                set |= ProtocolSet::PING;
            }
        }
        set
    }

    fn shape(&mut self, id: Wid) -> ShapePair {
        if !self.has_shape {
            return ShapePair::default();
        }
        let Some(extents) = self
            .conn
            .shape_query_extents(id)
            .ok()
            .and_then(|c| c.reply().ok())
        else {
            return ShapePair::default();
        };
        ShapePair {
            clip: if extents.clip_shaped {
                self.shape_rects(id, shape::SK::CLIP)
            } else {
                None
            },
            bounding: if extents.bounding_shaped {
                self.shape_rects(id, shape::SK::BOUNDING)
            } else {
                None
            },
        }
    }

    fn configure(&mut self, id: Wid, rect: Rect) -> Result<()> {
        self.conn.configure_window(
            id,
            &ConfigureWindowAux::new()
                .x(rect.x1)
                .y(rect.y1)
                .width(rect.width() as u32)
                .height(rect.height() as u32),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn restack_above(&mut self, id: Wid, sibling: Option<Wid>) -> Result<()> {
        let mut aux = ConfigureWindowAux::new().stack_mode(StackMode::ABOVE);
        if let Some(s) = sibling {
            aux = aux.sibling(s);
        }
        self.conn.configure_window(id, &aux)?;
        self.conn.flush()?;
        Ok(())
    }

    fn map(&mut self, id: Wid) -> Result<()> {
        self.conn.map_window(id)?;
        self.conn.flush()?;
        Ok(())
    }

    fn unmap(&mut self, id: Wid) -> Result<()> {
        self.conn.unmap_window(id)?;
        self.conn.flush()?;
        Ok(())
    }

    fn iconify(&mut self, id: Wid) -> Result<()> {
        const ICONIC_STATE: u32 = 3;
        self.send_client_message(
            id,
            self.root,
            self.atoms.wm_change_state,
            [ICONIC_STATE, 0, 0, 0, 0],
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
        )
    }

    fn set_maximized(&mut self, id: Wid, on: bool) -> Result<()> {
        const NET_WM_STATE_REMOVE: u32 = 0;
        const NET_WM_STATE_ADD: u32 = 1;
        let action = if on { NET_WM_STATE_ADD } else { NET_WM_STATE_REMOVE };
        self.send_client_message(
            id,
            self.root,
            self.atoms.net_wm_state,
            [
                action,
                self.atoms.net_wm_state_maximized_horz,
                self.atoms.net_wm_state_maximized_vert,
                1,
                0,
            ],
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
        )
    }

    fn close(&mut self, id: Wid) -> Result<()> {
        if self.protocols(id).contains(ProtocolSet::DELETE_WINDOW) {
            self.send_client_message(
                id,
                id,
                self.atoms.wm_protocols,
                [self.atoms.wm_delete_window, 0, 0, 0, 0],
                EventMask::NO_EVENT,
            )
        } else {
            // No polite protocol; sever the client.
            self.conn.kill_client(id)?;
            self.conn.flush()?;
            Ok(())
        }
    }

    fn poll_event(&mut self, timeout: Duration) -> Result<Option<WinEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(event) = self.conn.poll_for_event()? {
                if let Some(win_event) = self.translate(event) {
                    return Ok(Some(win_event));
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.events.clear();
            self.poll
                .poll(&mut self.events, Some(remaining))
                .context("polling the X connection")?;
        }
    }
}
