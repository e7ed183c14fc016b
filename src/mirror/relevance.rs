//! Relevance & Attribute Derivation
//!
//! Relevance is never stored on its own: it is recomputed from the record
//! after every notification that could affect any of its inputs. Attributes
//! are derived table-driven from the last-read state and action snapshots.

use crate::region::Rect;
use crate::xserver::{ActionSet, StateSet, WindowKind};

use super::record::{AttrSet, RecordFlags, WindowRecord, DESKTOP_ALL};

/// Deny-list of known-problematic windows, matched against title or class.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    patterns: Vec<String>,
}

impl DenyList {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn matches(&self, record: &WindowRecord) -> bool {
        self.patterns
            .iter()
            .any(|p| record.title.contains(p.as_str()) || record.class.contains(p.as_str()))
    }
}

/// Should this window be mirrored to the host right now?
///
/// Input-only, degenerate and fully off-screen windows never qualify. A
/// window must have been viewable at least once, but staying viewable is not
/// required: iconify/restore cycles keep it relevant. Desktop membership is
/// checked against the active desktop, with sticky windows on all desktops.
pub fn compute_relevance(
    record: &WindowRecord,
    active_desktop: u32,
    chrome_visible: bool,
    deny: &DenyList,
    screens: &[Rect],
) -> bool {
    if record.flags.contains(RecordFlags::INPUT_ONLY) {
        return false;
    }
    if record.rect.is_empty() {
        return false;
    }
    if !screens.is_empty() && !screens.iter().any(|s| s.overlaps(&record.rect)) {
        return false;
    }
    if !record.flags.contains(RecordFlags::WAS_VIEWABLE) {
        return false;
    }
    match record.kind {
        WindowKind::Desktop | WindowKind::Dnd => return false,
        WindowKind::Dock | WindowKind::Toolbar => {
            if !chrome_visible {
                return false;
            }
        }
        _ => {}
    }
    if record.desktop != DESKTOP_ALL && record.desktop != active_desktop {
        return false;
    }
    if deny.matches(record) {
        return false;
    }
    true
}

/// Derive the exported attribute set from the record's raw snapshots.
///
/// Capability-sourced attributes default to false when the advertised set is
/// absent. Maximized needs both axes simultaneously. Minimized prefers the
/// dedicated hidden indicator; when the window manager does not support it,
/// iconic `WM_STATE` counts, but only on the active desktop so a desktop
/// switch does not spuriously minimize windows.
pub fn derive_attrs(
    record: &WindowRecord,
    active_desktop: u32,
    supports_hidden: bool,
) -> AttrSet {
    let mut attrs = AttrSet::empty();

    let actions = record.actions.unwrap_or_else(ActionSet::empty);
    const ACTION_RULES: &[(AttrSet, ActionSet)] = &[
        (AttrSet::MINIMIZABLE, ActionSet::MINIMIZE),
        (
            AttrSet::MAXIMIZABLE,
            ActionSet::MAXIMIZE_HORZ.union(ActionSet::MAXIMIZE_VERT),
        ),
        (AttrSet::CLOSABLE, ActionSet::CLOSE),
        (AttrSet::MOVABLE, ActionSet::MOVE),
        (AttrSet::RESIZABLE, ActionSet::RESIZE),
    ];
    for &(attr, needed) in ACTION_RULES {
        if actions.contains(needed) {
            attrs |= attr;
        }
    }

    let states = record.states.unwrap_or_else(StateSet::empty);
    const STATE_RULES: &[(AttrSet, StateSet)] = &[
        (AttrSet::STICKY, StateSet::STICKY),
        (AttrSet::ABOVE, StateSet::ABOVE),
        (AttrSet::BELOW, StateSet::BELOW),
        (AttrSet::MODAL, StateSet::MODAL),
        (AttrSet::SHADED, StateSet::SHADED),
        (AttrSet::FULLSCREEN, StateSet::FULLSCREEN),
        (AttrSet::DEMANDS_ATTENTION, StateSet::DEMANDS_ATTENTION),
        (AttrSet::SKIP_TASKBAR, StateSet::SKIP_TASKBAR),
        (AttrSet::SKIP_PAGER, StateSet::SKIP_PAGER),
    ];
    for &(attr, state) in STATE_RULES {
        if states.contains(state) {
            attrs |= attr;
        }
    }

    if states.contains(StateSet::MAXIMIZED_HORZ) && states.contains(StateSet::MAXIMIZED_VERT) {
        attrs |= AttrSet::MAXIMIZED;
    }

    let minimized = if supports_hidden {
        states.contains(StateSet::HIDDEN)
    } else {
        let on_active =
            record.desktop == DESKTOP_ALL || record.desktop == active_desktop;
        states.contains(StateSet::HIDDEN) || (record.iconic == Some(true) && on_active)
    };
    if minimized {
        attrs |= AttrSet::MINIMIZED;
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xserver::Wid;

    fn viewable_record(id: Wid) -> WindowRecord {
        let mut rec = WindowRecord::new(id, id, 1);
        rec.rect = Rect::new(10, 10, 200, 200);
        rec.flags |= RecordFlags::VIEWABLE | RecordFlags::WAS_VIEWABLE;
        rec
    }

    fn screens() -> Vec<Rect> {
        vec![Rect::new(0, 0, 1280, 960)]
    }

    #[test]
    fn test_plain_viewable_window_is_relevant() {
        let rec = viewable_record(5);
        assert!(compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));
    }

    #[test]
    fn test_sticky_was_viewable_survives_iconify() {
        let mut rec = viewable_record(5);
        rec.flags.remove(RecordFlags::VIEWABLE);
        assert!(
            compute_relevance(&rec, 0, true, &DenyList::default(), &screens()),
            "iconified window must stay relevant"
        );
    }

    #[test]
    fn test_never_viewable_window_is_never_relevant() {
        let mut rec = WindowRecord::new(5, 5, 1);
        rec.rect = Rect::new(10, 10, 200, 200);
        assert!(!compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));
    }

    #[test]
    fn test_degenerate_offscreen_and_input_only_excluded() {
        let mut rec = viewable_record(5);
        rec.rect = Rect::new(10, 10, 10, 200);
        assert!(!compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));

        let mut rec = viewable_record(5);
        rec.rect = Rect::new(5000, 5000, 5100, 5100);
        assert!(!compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));

        let mut rec = viewable_record(5);
        rec.flags |= RecordFlags::INPUT_ONLY;
        assert!(!compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));
    }

    #[test]
    fn test_kind_gating() {
        let mut rec = viewable_record(5);
        rec.kind = WindowKind::Desktop;
        assert!(!compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));

        rec.kind = WindowKind::Dnd;
        assert!(!compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));

        rec.kind = WindowKind::Dock;
        assert!(compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));
        assert!(!compute_relevance(&rec, 0, false, &DenyList::default(), &screens()));
    }

    #[test]
    fn test_desktop_membership_and_sticky() {
        let mut rec = viewable_record(5);
        rec.desktop = 2;
        assert!(!compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));
        assert!(compute_relevance(&rec, 2, true, &DenyList::default(), &screens()));

        rec.desktop = DESKTOP_ALL;
        assert!(compute_relevance(&rec, 0, true, &DenyList::default(), &screens()));
    }

    #[test]
    fn test_deny_list() {
        let mut rec = viewable_record(5);
        rec.title = "Splash helper".into();
        rec.class = "badapp".into();
        let deny = DenyList::new(vec!["badapp".into()]);
        assert!(!compute_relevance(&rec, 0, true, &deny, &screens()));
        let deny = DenyList::new(vec!["otherapp".into()]);
        assert!(compute_relevance(&rec, 0, true, &deny, &screens()));
    }

    #[test]
    fn test_action_attrs_default_false_when_absent() {
        let rec = viewable_record(5);
        let attrs = derive_attrs(&rec, 0, true);
        assert!(!attrs.contains(AttrSet::CLOSABLE));
        assert!(!attrs.contains(AttrSet::MINIMIZABLE));

        let mut rec = viewable_record(5);
        rec.actions = Some(ActionSet::CLOSE | ActionSet::MOVE);
        let attrs = derive_attrs(&rec, 0, true);
        assert!(attrs.contains(AttrSet::CLOSABLE));
        assert!(attrs.contains(AttrSet::MOVABLE));
        assert!(!attrs.contains(AttrSet::RESIZABLE));
    }

    #[test]
    fn test_maximizable_needs_both_axes() {
        let mut rec = viewable_record(5);
        rec.actions = Some(ActionSet::MAXIMIZE_HORZ);
        assert!(!derive_attrs(&rec, 0, true).contains(AttrSet::MAXIMIZABLE));
        rec.actions = Some(ActionSet::MAXIMIZE_HORZ | ActionSet::MAXIMIZE_VERT);
        assert!(derive_attrs(&rec, 0, true).contains(AttrSet::MAXIMIZABLE));
    }

    #[test]
    fn test_maximized_needs_both_indicators() {
        let mut rec = viewable_record(5);
        rec.states = Some(StateSet::MAXIMIZED_HORZ);
        assert!(!derive_attrs(&rec, 0, true).contains(AttrSet::MAXIMIZED));
        rec.states = Some(StateSet::MAXIMIZED_HORZ | StateSet::MAXIMIZED_VERT);
        assert!(derive_attrs(&rec, 0, true).contains(AttrSet::MAXIMIZED));
    }

    #[test]
    fn test_minimized_is_desktop_scoped_without_hidden_support() {
        let mut rec = viewable_record(5);
        rec.iconic = Some(true);
        rec.desktop = 0;

        // Dedicated indicator supported but not set: iconic alone is not
        // minimized.
        assert!(!derive_attrs(&rec, 0, true).contains(AttrSet::MINIMIZED));

        // Fallback path: iconic on the active desktop counts...
        assert!(derive_attrs(&rec, 0, false).contains(AttrSet::MINIMIZED));
        // ...but not on another desktop.
        assert!(!derive_attrs(&rec, 1, false).contains(AttrSet::MINIMIZED));

        // The dedicated indicator wins regardless.
        rec.iconic = Some(false);
        rec.states = Some(StateSet::HIDDEN);
        assert!(derive_attrs(&rec, 0, true).contains(AttrSet::MINIMIZED));
        assert!(derive_attrs(&rec, 1, false).contains(AttrSet::MINIMIZED));
    }
}
