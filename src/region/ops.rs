//! Band-sweep implementations of the binary region operations.
//!
//! All three boolean operations are special cases of one generic sweep: walk
//! both source rectangle lists in increasing `y1` order, cut the plane into
//! horizontal bands at every boundary either source introduces, and for each
//! band either copy rectangles from the side that alone covers it or run the
//! operator-specific merge routine where both sides overlap. After every
//! appended band the builder tries to coalesce it with the previous one.

use super::{Rect, RectTag, Region, MAX_RECTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpKind {
    Union,
    Intersect,
    Subtract,
}

impl OpKind {
    /// Does the operation keep bands covered only by the first source?
    fn appends_first(self) -> bool {
        matches!(self, OpKind::Union | OpKind::Subtract)
    }

    /// Does the operation keep bands covered only by the second source?
    fn appends_second(self) -> bool {
        matches!(self, OpKind::Union)
    }
}

/// Index one past the last rectangle of the band starting at `i`.
pub(crate) fn band_end(rects: &[Rect], i: usize) -> usize {
    let y1 = rects[i].y1;
    let mut e = i + 1;
    while e < rects.len() && rects[e].y1 == y1 {
        e += 1;
    }
    e
}

/// Can two rectangles merge into one without changing what a renderer would
/// produce? `b` sits to the right of (or below) `a`.
///
/// Plain joins Plain unconditionally. Fill joins on equal color alone. Copy
/// joins only when the source offset relative to the rectangle origin is the
/// same on both axes; the per-kind asymmetry is deliberate and must not be
/// unified.
pub(crate) fn tags_join(a: &Rect, b: &Rect) -> bool {
    match (a.tag, b.tag) {
        (RectTag::Plain, RectTag::Plain) => true,
        (RectTag::Fill { color: ca }, RectTag::Fill { color: cb }) => ca == cb,
        (
            RectTag::Copy {
                src_x: ax,
                src_y: ay,
            },
            RectTag::Copy {
                src_x: bx,
                src_y: by,
            },
        ) => {
            ax as i64 - a.x1 as i64 == bx as i64 - b.x1 as i64
                && ay as i64 - a.y1 as i64 == by as i64 - b.y1 as i64
        }
        _ => false,
    }
}

/// Accumulates output rectangles band by band, coalescing adjacent bands
/// whose rectangle sets are identical and tag-compatible.
pub(crate) struct Builder {
    rects: Vec<Rect>,
    prev_band: usize,
    broken: bool,
}

impl Builder {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            rects: Vec::with_capacity(capacity),
            prev_band: 0,
            broken: false,
        }
    }

    pub(crate) fn begin_band(&mut self) -> usize {
        self.rects.len()
    }

    pub(crate) fn extend_band(&mut self, rects: &[Rect]) {
        self.rects.extend_from_slice(rects);
    }

    /// Close the band that started at `cur`, merging it into the previous
    /// band when both contain the same count of rectangles with identical
    /// x-extents and joinable tags.
    pub(crate) fn end_band(&mut self, cur: usize) {
        if self.rects.len() == cur {
            return;
        }
        if self.rects.len() > MAX_RECTS {
            self.broken = true;
            return;
        }
        let prev = self.prev_band;
        let prev_len = cur - prev;
        let cur_len = self.rects.len() - cur;
        if prev_len == cur_len && prev_len > 0 && self.rects[prev].y2 == self.rects[cur].y1 {
            let mergeable = (0..prev_len).all(|k| {
                let p = self.rects[prev + k];
                let c = self.rects[cur + k];
                p.x1 == c.x1 && p.x2 == c.x2 && tags_join(&p, &c)
            });
            if mergeable {
                let new_y2 = self.rects[cur].y2;
                for k in 0..prev_len {
                    self.rects[prev + k].y2 = new_y2;
                }
                self.rects.truncate(cur);
                return;
            }
        }
        self.prev_band = cur;
    }

    /// Append a source band clipped to `[top, bot)`, one rectangle at a time.
    fn append_band(&mut self, band: &[Rect], top: i32, bot: i32) {
        let cur = self.begin_band();
        for r in band {
            self.rects.push(r.slice(r.x1, top, r.x2, bot));
        }
        self.end_band(cur);
    }

    /// Append a rectangle, merging with the band's last rectangle when they
    /// touch and their tags join.
    fn push_merged(&mut self, cur: usize, piece: Rect) {
        if self.rects.len() > cur {
            let last = self.rects.last_mut().expect("band not empty");
            if last.x2 == piece.x1 && tags_join(last, &piece) {
                last.x2 = piece.x2;
                return;
            }
        }
        self.rects.push(piece);
    }

    /// Union merge step for one rectangle against the growing band.
    fn union_rect(&mut self, cur: usize, r: &Rect, top: i32, bot: i32, overlap: &mut bool) {
        let piece = r.slice(r.x1, top, r.x2, bot);
        if self.rects.len() > cur {
            let last = *self.rects.last().expect("band not empty");
            if piece.x1 <= last.x2 {
                if piece.x1 < last.x2 {
                    *overlap = true;
                }
                if tags_join(&last, &piece) {
                    if piece.x2 > last.x2 {
                        self.rects.last_mut().expect("band not empty").x2 = piece.x2;
                    }
                } else if piece.x2 > last.x2 {
                    // Incompatible tags: the already-appended rectangle keeps
                    // the overlapped slice, coverage is never lost.
                    self.rects.push(piece.slice(last.x2, top, piece.x2, bot));
                }
                return;
            }
        }
        self.rects.push(piece);
    }

    fn union_band(&mut self, b1: &[Rect], b2: &[Rect], top: i32, bot: i32, overlap: &mut bool) {
        let cur = self.begin_band();
        let mut i = 0;
        let mut j = 0;
        while i < b1.len() && j < b2.len() {
            if b1[i].x1 <= b2[j].x1 {
                self.union_rect(cur, &b1[i], top, bot, overlap);
                i += 1;
            } else {
                self.union_rect(cur, &b2[j], top, bot, overlap);
                j += 1;
            }
        }
        while i < b1.len() {
            self.union_rect(cur, &b1[i], top, bot, overlap);
            i += 1;
        }
        while j < b2.len() {
            self.union_rect(cur, &b2[j], top, bot, overlap);
            j += 1;
        }
        self.end_band(cur);
    }

    fn intersect_band(&mut self, b1: &[Rect], b2: &[Rect], top: i32, bot: i32) {
        let cur = self.begin_band();
        let mut i = 0;
        let mut j = 0;
        while i < b1.len() && j < b2.len() {
            let x1 = b1[i].x1.max(b2[j].x1);
            let x2 = b1[i].x2.min(b2[j].x2);
            if x1 < x2 {
                // The second operand's tag wins in the overlap.
                self.push_merged(cur, b2[j].slice(x1, top, x2, bot));
            }
            if b1[i].x2 < b2[j].x2 {
                i += 1;
            } else if b2[j].x2 < b1[i].x2 {
                j += 1;
            } else {
                i += 1;
                j += 1;
            }
        }
        self.end_band(cur);
    }

    fn subtract_band(&mut self, b1: &[Rect], b2: &[Rect], top: i32, bot: i32) {
        let cur = self.begin_band();
        let mut i = 0;
        let mut j = 0;
        let mut x1 = b1[0].x1;
        while i < b1.len() && j < b2.len() {
            let r1 = b1[i];
            let r2 = b2[j];
            if r2.x2 <= x1 {
                // Subtrahend entirely to the left of the walk position.
                j += 1;
            } else if r2.x1 <= x1 {
                // Subtrahend covers the walk position: consume it.
                x1 = r2.x2;
                if x1 >= r1.x2 {
                    i += 1;
                    if i < b1.len() {
                        x1 = b1[i].x1;
                    }
                } else {
                    j += 1;
                }
            } else if r2.x1 < r1.x2 {
                // Uncovered piece of the minuend before the subtrahend.
                self.push_merged(cur, r1.slice(x1, top, r2.x1, bot));
                x1 = r2.x2;
                if x1 >= r1.x2 {
                    i += 1;
                    if i < b1.len() {
                        x1 = b1[i].x1;
                    }
                } else {
                    j += 1;
                }
            } else {
                // Subtrahend starts beyond this minuend rectangle.
                if r1.x2 > x1 {
                    self.push_merged(cur, r1.slice(x1, top, r1.x2, bot));
                }
                i += 1;
                if i < b1.len() {
                    x1 = b1[i].x1;
                }
            }
        }
        while i < b1.len() {
            let r1 = b1[i];
            self.push_merged(cur, r1.slice(x1, top, r1.x2, bot));
            i += 1;
            if i < b1.len() {
                x1 = b1[i].x1;
            }
        }
        self.end_band(cur);
    }

    pub(crate) fn finish(self) -> Region {
        if self.broken {
            Region::broken()
        } else {
            Region::from_banded(self.rects)
        }
    }
}

/// The generic sweep. Returns the result region and whether the two sources
/// actually overlapped anywhere (meaningful for union, used by validate).
pub(crate) fn region_op(a: &Region, b: &Region, kind: OpKind) -> (Region, bool) {
    let r1 = a.rects();
    let r2 = b.rects();
    debug_assert!(!r1.is_empty() && !r2.is_empty());

    let mut out = Builder::new(r1.len() + r2.len());
    let mut overlap = false;

    let mut i1 = 0;
    let mut i2 = 0;
    let mut ybot = a.extents().y1.min(b.extents().y1);

    while i1 < r1.len() && i2 < r2.len() {
        let b1_end = band_end(r1, i1);
        let b2_end = band_end(r2, i2);
        let top1 = r1[i1].y1;
        let top2 = r2[i2].y1;

        let ytop;
        if top1 < top2 {
            let top = top1.max(ybot);
            let bot = r1[i1].y2.min(top2);
            if top < bot && kind.appends_first() {
                out.append_band(&r1[i1..b1_end], top, bot);
            }
            ytop = top2;
        } else if top2 < top1 {
            let top = top2.max(ybot);
            let bot = r2[i2].y2.min(top1);
            if top < bot && kind.appends_second() {
                out.append_band(&r2[i2..b2_end], top, bot);
            }
            ytop = top1;
        } else {
            ytop = top1;
        }

        ybot = r1[i1].y2.min(r2[i2].y2);
        if ybot > ytop {
            match kind {
                OpKind::Union => {
                    out.union_band(&r1[i1..b1_end], &r2[i2..b2_end], ytop, ybot, &mut overlap)
                }
                OpKind::Intersect => out.intersect_band(&r1[i1..b1_end], &r2[i2..b2_end], ytop, ybot),
                OpKind::Subtract => out.subtract_band(&r1[i1..b1_end], &r2[i2..b2_end], ytop, ybot),
            }
        }

        if r1[i1].y2 == ybot {
            i1 = b1_end;
        }
        if r2[i2].y2 == ybot {
            i2 = b2_end;
        }
    }

    // Whatever remains of one source lies strictly below the other.
    if i1 < r1.len() && kind.appends_first() {
        while i1 < r1.len() {
            let e = band_end(r1, i1);
            let top = r1[i1].y1.max(ybot);
            out.append_band(&r1[i1..e], top, r1[i1].y2);
            i1 = e;
        }
    } else if i2 < r2.len() && kind.appends_second() {
        while i2 < r2.len() {
            let e = band_end(r2, i2);
            let top = r2[i2].y1.max(ybot);
            out.append_band(&r2[i2..e], top, r2[i2].y2);
            i2 = e;
        }
    }

    (out.finish(), overlap)
}

#[cfg(test)]
mod tests {
    use super::super::{assert_invariants, Containment, Rect, RectTag, Region};

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
        Rect::new(x1, y1, x2, y2)
    }

    #[test]
    fn test_union_disjoint_same_band() {
        let a = Region::from_rect(rect(0, 0, 10, 10));
        let b = Region::from_rect(rect(20, 0, 30, 10));
        let u = a.union(&b);
        assert_invariants(&u);
        assert_eq!(u.rects(), &[rect(0, 0, 10, 10), rect(20, 0, 30, 10)]);
        assert_eq!(u.extents(), rect(0, 0, 30, 10));
    }

    #[test]
    fn test_union_touching_merges() {
        let a = Region::from_rect(rect(0, 0, 10, 10));
        let b = Region::from_rect(rect(10, 0, 20, 10));
        let u = a.union(&b);
        assert_eq!(u.rects(), &[rect(0, 0, 20, 10)]);
    }

    #[test]
    fn test_union_vertical_coalesce() {
        let a = Region::from_rect(rect(0, 0, 10, 10));
        let b = Region::from_rect(rect(0, 10, 10, 25));
        let u = a.union(&b);
        assert_eq!(u.rects(), &[rect(0, 0, 10, 25)]);
    }

    #[test]
    fn test_union_cross_shape() {
        let vertical = Region::from_rect(rect(40, 0, 60, 100));
        let horizontal = Region::from_rect(rect(0, 40, 100, 60));
        let cross = vertical.union(&horizontal);
        assert_invariants(&cross);
        assert_eq!(
            cross.rects(),
            &[
                rect(40, 0, 60, 40),
                rect(0, 40, 100, 60),
                rect(40, 60, 60, 100),
            ]
        );
        assert_eq!(cross.area(), 20 * 100 + 100 * 20 - 20 * 20);
    }

    #[test]
    fn test_union_idempotent() {
        let vertical = Region::from_rect(rect(40, 0, 60, 100));
        let horizontal = Region::from_rect(rect(0, 40, 100, 60));
        let cross = vertical.union(&horizontal);
        assert_eq!(cross.union(&cross), cross);
        assert_eq!(cross.union(&Region::empty()), cross);
        assert_eq!(Region::empty().union(&cross), cross);
    }

    #[test]
    fn test_intersect_basic() {
        let a = Region::from_rect(rect(0, 0, 10, 10));
        let b = Region::from_rect(rect(5, 5, 15, 15));
        let i = a.intersect(&b);
        assert_eq!(i.rects(), &[rect(5, 5, 10, 10)]);
        assert!(a.intersect(&Region::from_rect(rect(50, 50, 60, 60))).is_empty());
    }

    #[test]
    fn test_intersect_with_superset_is_identity() {
        let vertical = Region::from_rect(rect(40, 0, 60, 100));
        let horizontal = Region::from_rect(rect(0, 40, 100, 60));
        let cross = vertical.union(&horizontal);
        let screen = Region::from_rect(rect(0, 0, 1280, 960));
        assert_eq!(cross.intersect(&screen), cross);
        assert_eq!(screen.intersect(&cross), cross);
    }

    #[test]
    fn test_subtract_hole_and_self() {
        let outer = Region::from_rect(rect(0, 0, 100, 100));
        let hole = Region::from_rect(rect(25, 25, 75, 75));
        let frame = outer.subtract(&hole);
        assert_invariants(&frame);
        assert_eq!(
            frame.rects(),
            &[
                rect(0, 0, 100, 25),
                rect(0, 25, 25, 75),
                rect(75, 25, 100, 75),
                rect(0, 75, 100, 100),
            ]
        );
        assert_eq!(frame.area(), 10_000 - 2_500);
        assert!(frame.subtract(&frame).is_empty());
    }

    #[test]
    fn test_subtract_band_split() {
        let a = Region::from_rect(rect(0, 0, 30, 10));
        let bites = Region::from_rect(rect(5, 0, 10, 10)).union(&Region::from_rect(rect(20, 0, 25, 10)));
        let d = a.subtract(&bites);
        assert_eq!(
            d.rects(),
            &[rect(0, 0, 5, 10), rect(10, 0, 20, 10), rect(25, 0, 30, 10)]
        );
    }

    #[test]
    fn test_invert() {
        let shape = Region::from_rect(rect(10, 10, 20, 20));
        let inv = shape.invert(&rect(0, 0, 30, 30));
        assert_invariants(&inv);
        assert_eq!(inv.area(), 900 - 100);
        assert_eq!(inv.contains_rect(&rect(10, 10, 20, 20)), Containment::Out);
        assert_eq!(inv.contains_rect(&rect(0, 0, 5, 5)), Containment::In);
    }

    #[test]
    fn test_inclusion_exclusion_area() {
        let cases = [
            (rect(0, 0, 10, 10), rect(5, 5, 15, 15)),
            (rect(0, 0, 10, 10), rect(10, 0, 20, 10)),
            (rect(0, 0, 10, 10), rect(50, 50, 60, 60)),
            (rect(-8, -3, 9, 4), rect(-2, -9, 3, 12)),
        ];
        for (ra, rb) in cases {
            let a = Region::from_rect(ra);
            let b = Region::from_rect(rb);
            let u = a.union(&b);
            let i = a.intersect(&b);
            assert_invariants(&u);
            assert_invariants(&i);
            assert_eq!(u.area(), a.area() + b.area() - i.area(), "{:?} {:?}", ra, rb);
        }
    }

    #[test]
    fn test_intersect_second_operand_tag_wins() {
        let base = Region::from_rect(rect(0, 0, 20, 20));
        let stencil = Region::from_rect(Rect::tagged(
            5,
            5,
            30,
            30,
            RectTag::Fill { color: 0x00ff_0000 },
        ));
        let out = base.intersect(&stencil);
        assert_eq!(out.rects().len(), 1);
        assert_eq!(out.rects()[0].tag, RectTag::Fill { color: 0x00ff_0000 });

        // Clipping a copy-source stencil shifts the source consistently.
        let copy = Region::from_rect(Rect::tagged(
            5,
            5,
            30,
            30,
            RectTag::Copy { src_x: 100, src_y: 200 },
        ));
        let out = Region::from_rect(rect(10, 10, 20, 20)).intersect(&copy);
        assert_eq!(out.rects().len(), 1);
        assert_eq!(
            out.rects()[0].tag,
            RectTag::Copy { src_x: 105, src_y: 205 }
        );
    }

    #[test]
    fn test_fill_tags_join_on_equal_color_only() {
        let red = RectTag::Fill { color: 1 };
        let blue = RectTag::Fill { color: 2 };
        let a = Region::from_rect(Rect::tagged(0, 0, 10, 10, red));
        let b = Region::from_rect(Rect::tagged(10, 0, 20, 10, red));
        assert_eq!(a.union(&b).rects().len(), 1);

        let c = Region::from_rect(Rect::tagged(10, 0, 20, 10, blue));
        let u = a.union(&c);
        assert_eq!(u.rects().len(), 2);
        assert_eq!(u.area(), 200);
    }

    #[test]
    fn test_copy_tags_join_only_with_consistent_offset() {
        // Offset (src - origin) identical: joins.
        let a = Region::from_rect(Rect::tagged(0, 0, 10, 10, RectTag::Copy { src_x: 50, src_y: 7 }));
        let b = Region::from_rect(Rect::tagged(10, 0, 20, 10, RectTag::Copy { src_x: 60, src_y: 7 }));
        assert_eq!(a.union(&b).rects().len(), 1);

        // Offset differs: stays split.
        let c = Region::from_rect(Rect::tagged(10, 0, 20, 10, RectTag::Copy { src_x: 61, src_y: 7 }));
        assert_eq!(a.union(&c).rects().len(), 2);

        // Vertical coalesce follows the same offset rule.
        let top = Region::from_rect(Rect::tagged(0, 0, 10, 10, RectTag::Copy { src_x: 50, src_y: 7 }));
        let below = Region::from_rect(Rect::tagged(0, 10, 10, 20, RectTag::Copy { src_x: 50, src_y: 17 }));
        assert_eq!(top.union(&below).rects().len(), 1);
        let below_bad = Region::from_rect(Rect::tagged(0, 10, 10, 20, RectTag::Copy { src_x: 50, src_y: 18 }));
        assert_eq!(top.union(&below_bad).rects().len(), 2);
    }

    #[test]
    fn test_union_overlap_incompatible_tags_keeps_coverage() {
        let a = Region::from_rect(Rect::tagged(0, 0, 10, 10, RectTag::Fill { color: 1 }));
        let b = Region::from_rect(Rect::tagged(5, 0, 15, 10, RectTag::Fill { color: 2 }));
        let u = a.union(&b);
        assert_invariants(&u);
        assert_eq!(u.area(), 150);
        // First-seen tag keeps the overlapped slice.
        assert_eq!(u.rects()[0], Rect::tagged(0, 0, 10, 10, RectTag::Fill { color: 1 }));
        assert_eq!(u.rects()[1], Rect::tagged(10, 0, 15, 10, RectTag::Fill { color: 2 }));
    }

    #[test]
    fn test_multi_band_subtract_keeps_banding() {
        // Staircase minus a column.
        let stairs = Region::from_rect(rect(0, 0, 30, 10))
            .union(&Region::from_rect(rect(0, 10, 20, 20)))
            .union(&Region::from_rect(rect(0, 20, 10, 30)));
        assert_invariants(&stairs);
        let column = Region::from_rect(rect(5, 0, 8, 30));
        let d = stairs.subtract(&column);
        assert_invariants(&d);
        assert_eq!(d.area(), stairs.area() - 3 * 30);
    }
}
