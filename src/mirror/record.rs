//! Window Record
//!
//! The canonical per-window state the engine keeps for every guest
//! top-level window it has ever been told about.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::region::{Rect, Region};
use crate::xserver::{ActionSet, ProtocolSet, StateSet, Wid, WindowKind};

/// Desktop value for sticky windows (present on all desktops).
pub const DESKTOP_ALL: u32 = 0xFFFF_FFFF;

bitflags! {
    /// Engine-internal bookkeeping flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RecordFlags: u32 {
        const OVERRIDE_REDIRECT = 1 << 0;
        const INPUT_ONLY        = 1 << 1;
        /// Currently mapped and viewable.
        const VIEWABLE          = 1 << 2;
        /// Was viewable at least once; survives iconify/unmap.
        const WAS_VIEWABLE      = 1 << 3;
        /// Currently mirrored to the host.
        const RELEVANT          = 1 << 4;
    }
}

bitflags! {
    /// Attribute set exported to the host tracker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AttrSet: u32 {
        const MINIMIZABLE       = 1 << 0;
        const MAXIMIZABLE       = 1 << 1;
        const CLOSABLE          = 1 << 2;
        const MOVABLE           = 1 << 3;
        const RESIZABLE         = 1 << 4;
        const STICKY            = 1 << 5;
        const ABOVE             = 1 << 6;
        const BELOW             = 1 << 7;
        const MODAL             = 1 << 8;
        const SHADED            = 1 << 9;
        const FULLSCREEN        = 1 << 10;
        const DEMANDS_ATTENTION = 1 << 11;
        const SKIP_TASKBAR      = 1 << 12;
        const SKIP_PAGER        = 1 << 13;
        const MAXIMIZED         = 1 << 14;
        const MINIMIZED         = 1 << 15;
    }
}

/// Host-visible attribute names, one per [`AttrSet`] bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAttr {
    Minimizable,
    Maximizable,
    Closable,
    Movable,
    Resizable,
    Sticky,
    Above,
    Below,
    Modal,
    Shaded,
    Fullscreen,
    DemandsAttention,
    SkipTaskbar,
    SkipPager,
    Maximized,
    Minimized,
}

/// Bit-to-name table used when diffing attribute sets into tracker calls.
pub const ATTR_TABLE: &[(AttrSet, WindowAttr)] = &[
    (AttrSet::MINIMIZABLE, WindowAttr::Minimizable),
    (AttrSet::MAXIMIZABLE, WindowAttr::Maximizable),
    (AttrSet::CLOSABLE, WindowAttr::Closable),
    (AttrSet::MOVABLE, WindowAttr::Movable),
    (AttrSet::RESIZABLE, WindowAttr::Resizable),
    (AttrSet::STICKY, WindowAttr::Sticky),
    (AttrSet::ABOVE, WindowAttr::Above),
    (AttrSet::BELOW, WindowAttr::Below),
    (AttrSet::MODAL, WindowAttr::Modal),
    (AttrSet::SHADED, WindowAttr::Shaded),
    (AttrSet::FULLSCREEN, WindowAttr::Fullscreen),
    (AttrSet::DEMANDS_ATTENTION, WindowAttr::DemandsAttention),
    (AttrSet::SKIP_TASKBAR, WindowAttr::SkipTaskbar),
    (AttrSet::SKIP_PAGER, WindowAttr::SkipPager),
    (AttrSet::MAXIMIZED, WindowAttr::Maximized),
    (AttrSet::MINIMIZED, WindowAttr::Minimized),
];

/// One guest top-level window.
///
/// `frame` is the outer decoration window; `content` is the inner
/// application window when the window manager reparents, otherwise it equals
/// `frame`. Both ids resolve to the same record in the store.
#[derive(Debug)]
pub struct WindowRecord {
    pub frame: Wid,
    pub content: Wid,
    pub root: Wid,

    /// Last known frame geometry in root coordinates.
    pub rect: Rect,
    pub kind: WindowKind,
    pub title: String,
    pub class: String,
    pub desktop: u32,
    /// Effective clip shape; `None` means rectangular.
    pub shape: Option<Region>,

    pub flags: RecordFlags,
    /// Attribute set as last exported to the host.
    pub attrs: AttrSet,
    pub protocols: ProtocolSet,

    /// Last-read raw state/action snapshots, kept so attributes can be
    /// re-derived when the active desktop changes without touching the
    /// windowing system.
    pub states: Option<StateSet>,
    pub actions: Option<ActionSet>,
    pub iconic: Option<bool>,
}

impl WindowRecord {
    pub fn new(frame: Wid, content: Wid, root: Wid) -> Self {
        Self {
            frame,
            content,
            root,
            rect: Rect::EMPTY,
            kind: WindowKind::Normal,
            title: String::new(),
            class: String::new(),
            desktop: 0,
            shape: None,
            flags: RecordFlags::default(),
            attrs: AttrSet::default(),
            protocols: ProtocolSet::default(),
            states: None,
            actions: None,
            iconic: None,
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.flags.contains(RecordFlags::RELEVANT)
    }

    /// Sticky windows live on every desktop.
    pub fn on_all_desktops(&self) -> bool {
        self.desktop == DESKTOP_ALL
    }
}
