//! Windowing-System Adapter
//!
//! The engine treats the windowing system as a key-value/tree oracle plus a
//! notification stream. Everything it needs is behind the [`WindowSystem`]
//! trait so the synchronization logic can run against a scripted fake in
//! tests; the real X11 implementation lives in [`live`].
//!
//! Queries return `Option`: a window that vanished mid-query and a property
//! that was never set look the same to the engine ("absent"), which then
//! assumes the window is irrelevant rather than retrying.

pub mod atoms;
pub mod live;

use std::time::Duration;

use anyhow::Result;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::region::Rect;

/// X11 window id.
pub type Wid = u32;

bitflags! {
    /// Snapshot of the window-manager state set (`_NET_WM_STATE`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StateSet: u32 {
        const MODAL             = 1 << 0;
        const STICKY            = 1 << 1;
        const MAXIMIZED_VERT    = 1 << 2;
        const MAXIMIZED_HORZ    = 1 << 3;
        const SHADED            = 1 << 4;
        const SKIP_TASKBAR      = 1 << 5;
        const SKIP_PAGER        = 1 << 6;
        const HIDDEN            = 1 << 7;
        const FULLSCREEN        = 1 << 8;
        const ABOVE             = 1 << 9;
        const BELOW             = 1 << 10;
        const DEMANDS_ATTENTION = 1 << 11;
    }
}

bitflags! {
    /// Advertised capability set (`_NET_WM_ALLOWED_ACTIONS`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ActionSet: u32 {
        const MOVE           = 1 << 0;
        const RESIZE         = 1 << 1;
        const MINIMIZE       = 1 << 2;
        const SHADE          = 1 << 3;
        const STICK          = 1 << 4;
        const MAXIMIZE_HORZ  = 1 << 5;
        const MAXIMIZE_VERT  = 1 << 6;
        const FULLSCREEN     = 1 << 7;
        const CHANGE_DESKTOP = 1 << 8;
        const CLOSE          = 1 << 9;
    }
}

bitflags! {
    /// Protocols the window itself participates in (`WM_PROTOCOLS`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProtocolSet: u8 {
        const DELETE_WINDOW = 1 << 0;
        const TAKE_FOCUS    = 1 << 1;
        const PING          = 1 << 2;
    }
}

/// Effective window type (`_NET_WM_WINDOW_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    #[default]
    Normal,
    Desktop,
    Dock,
    Dialog,
    Toolbar,
    Menu,
    Utility,
    Splash,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
}

/// Core attributes snapshot for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    /// Input-only windows receive events but have no pixels.
    pub input_only: bool,
    /// Currently mapped and viewable.
    pub viewable: bool,
    pub override_redirect: bool,
}

/// Clip and bounding shape rectangle lists, window-relative.
/// `None` means "no explicit shape on that side" (unbounded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapePair {
    pub clip: Option<Vec<Rect>>,
    pub bounding: Option<Vec<Rect>>,
}

/// Which property a property-change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Title,
    State,
    Kind,
    Desktop,
    Protocols,
    Actions,
    WmState,
    WmHints,
    Other,
}

/// A windowing-system notification, normalized for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinEvent {
    Created {
        id: Wid,
        parent: Wid,
        rect: Rect,
        override_redirect: bool,
    },
    Destroyed {
        id: Wid,
    },
    Reparented {
        id: Wid,
        parent: Wid,
    },
    Mapped {
        id: Wid,
    },
    Unmapped {
        id: Wid,
    },
    Configured {
        id: Wid,
        rect: Rect,
        /// The window now sits directly above this sibling;
        /// `None` means bottom of the stack.
        above: Option<Wid>,
        override_redirect: bool,
    },
    PropertyChanged {
        id: Wid,
        prop: PropKind,
    },
    ShapeChanged {
        id: Wid,
    },
}

impl WinEvent {
    /// The window the notification is about.
    pub fn window(&self) -> Wid {
        match *self {
            WinEvent::Created { id, .. }
            | WinEvent::Destroyed { id }
            | WinEvent::Reparented { id, .. }
            | WinEvent::Mapped { id }
            | WinEvent::Unmapped { id }
            | WinEvent::Configured { id, .. }
            | WinEvent::PropertyChanged { id, .. }
            | WinEvent::ShapeChanged { id } => id,
        }
    }
}

/// Query-and-request surface of the windowing system.
///
/// Change requests return `Result` because issuing them can fail at the
/// connection level; property queries return `Option` because per-window
/// failures mean "assume irrelevant" (error taxonomy class 4).
pub trait WindowSystem {
    fn root(&self) -> Wid;

    /// Direct children of the root, bottom-to-top.
    fn top_level_windows(&mut self) -> Result<Vec<Wid>>;

    fn attributes(&mut self, id: Wid) -> Option<WindowAttributes>;
    fn geometry(&mut self, id: Wid) -> Option<Rect>;
    /// Raw title bytes; the engine validates the encoding.
    fn title(&mut self, id: Wid) -> Option<Vec<u8>>;
    fn class_hint(&mut self, id: Wid) -> Option<String>;
    /// First recognized `_NET_WM_WINDOW_TYPE` entry; `None` when unset.
    fn window_kind(&mut self, id: Wid) -> Option<WindowKind>;
    /// `None` when the property is absent (distinct from an empty set).
    fn states(&mut self, id: Wid) -> Option<StateSet>;
    fn actions(&mut self, id: Wid) -> Option<ActionSet>;
    fn desktop(&mut self, id: Wid) -> Option<u32>;
    /// ICCCM `WM_STATE` iconic flag.
    fn iconic_wm_state(&mut self, id: Wid) -> Option<bool>;
    /// Whether the window manager advertises the dedicated hidden state.
    fn supports_hidden_state(&self) -> bool;
    fn protocols(&mut self, id: Wid) -> ProtocolSet;
    fn shape(&mut self, id: Wid) -> ShapePair;

    fn configure(&mut self, id: Wid, rect: Rect) -> Result<()>;
    /// Place directly above `sibling`, or raise to the top when `None`.
    fn restack_above(&mut self, id: Wid, sibling: Option<Wid>) -> Result<()>;
    fn map(&mut self, id: Wid) -> Result<()>;
    fn unmap(&mut self, id: Wid) -> Result<()>;
    fn iconify(&mut self, id: Wid) -> Result<()>;
    fn set_maximized(&mut self, id: Wid, on: bool) -> Result<()>;
    fn close(&mut self, id: Wid) -> Result<()>;

    /// Wait up to `timeout` for the next notification. This is the pump the
    /// synchronous move/resize wait re-enters.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<WinEvent>>;
}
