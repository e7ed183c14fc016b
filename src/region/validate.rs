//! Normalization of unordered rectangle lists into banded regions.
//!
//! Rectangles arrive in arbitrary order (typically by repeated single-rect
//! additions against a growing shape). The list is stable-sorted by
//! `(y1, x1)`, greedily bucketed into maximal sub-regions that can each
//! accept the next rectangle without breaking the banding invariants, and
//! the sub-regions are then merged pairwise by union, smallest first.

use super::{region_op, tags_join, OpKind, Rect, Region, MAX_RECTS};

/// Normalize `input` into banded form. The flag reports whether any input
/// rectangles overlapped one another (observed during merging).
pub(crate) fn validate_rects(input: &[Rect]) -> (Region, bool) {
    let mut list: Vec<Rect> = input.iter().copied().filter(|r| !r.is_empty()).collect();
    match list.len() {
        0 => return (Region::empty(), false),
        1 => return (Region::from_rect(list[0]), false),
        _ => {}
    }
    if list.len() > MAX_RECTS {
        return (Region::broken(), false);
    }
    list.sort_by(|a, b| (a.y1, a.x1).cmp(&(b.y1, b.x1)));

    let mut overlap = false;
    let mut subs: Vec<Vec<Rect>> = Vec::new();

    'next: for r in list {
        for sub in subs.iter_mut() {
            let last = *sub.last().expect("sub-regions are never empty");
            if r.y1 == last.y1 && r.y2 == last.y2 {
                // Same band as this sub-region's tail.
                if r.x1 > last.x2 {
                    sub.push(r);
                } else {
                    if r.x1 < last.x2 {
                        overlap = true;
                    }
                    if tags_join(&last, &r) {
                        if r.x2 > last.x2 {
                            sub.last_mut().expect("non-empty").x2 = r.x2;
                        }
                    } else if r.x2 > last.x2 {
                        sub.push(r.slice(last.x2, r.y1, r.x2, r.y2));
                    }
                }
                continue 'next;
            }
            if r.y1 >= last.y2 {
                // Opens a new band below this sub-region.
                sub.push(r);
                continue 'next;
            }
            // Would break banding here; try the next sub-region.
        }
        subs.push(vec![r]);
    }

    let mut regions: Vec<Region> = subs.into_iter().map(Region::from_sorted_rects).collect();
    while regions.len() > 1 {
        regions.sort_by_key(|r| r.rects().len());
        let mut merged = Vec::with_capacity(regions.len().div_ceil(2));
        let mut it = regions.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => {
                    if a.is_broken() || b.is_broken() {
                        return (Region::broken(), overlap);
                    }
                    let (u, o) = region_op(&a, &b, OpKind::Union);
                    overlap |= o;
                    merged.push(u);
                }
                None => merged.push(a),
            }
        }
        regions = merged;
    }
    let out = regions.pop().expect("at least one sub-region");
    (out, overlap)
}

#[cfg(test)]
mod tests {
    use super::super::{assert_invariants, Rect, Region};

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
        Rect::new(x1, y1, x2, y2)
    }

    #[test]
    fn test_validate_empty_and_degenerate() {
        let (r, o) = Region::validate(&[]);
        assert!(r.is_empty());
        assert!(!o);
        let (r, o) = Region::validate(&[rect(3, 3, 3, 10), rect(5, 5, 9, 5)]);
        assert!(r.is_empty());
        assert!(!o);
    }

    #[test]
    fn test_validate_single_rect() {
        let (r, o) = Region::validate(&[rect(1, 2, 3, 4)]);
        assert_eq!(r.rects(), &[rect(1, 2, 3, 4)]);
        assert!(!o);
    }

    #[test]
    fn test_validate_coalesces_grid() {
        // A 2x2 grid of touching tiles collapses to one rectangle.
        let tiles = [
            rect(0, 0, 10, 10),
            rect(10, 0, 20, 10),
            rect(0, 10, 10, 20),
            rect(10, 10, 20, 20),
        ];
        let (r, o) = Region::validate(&tiles);
        assert_invariants(&r);
        assert!(!o);
        assert_eq!(r.rects(), &[rect(0, 0, 20, 20)]);
    }

    #[test]
    fn test_validate_order_independent() {
        let rects = [
            rect(40, 0, 60, 100),
            rect(0, 40, 100, 60),
            rect(70, 70, 90, 120),
            rect(-10, -10, 5, 5),
        ];
        let (forward, _) = Region::validate(&rects);
        assert_invariants(&forward);

        let mut reversed = rects;
        reversed.reverse();
        let (backward, _) = Region::validate(&reversed);
        let shuffled = [rects[2], rects[0], rects[3], rects[1]];
        let (mixed, _) = Region::validate(&shuffled);

        assert_eq!(forward, backward);
        assert_eq!(forward, mixed);

        // Point-set membership matches the incremental union.
        let mut incremental = Region::empty();
        for r in rects {
            incremental = incremental.union(&Region::from_rect(r));
        }
        assert_eq!(forward, incremental);
        assert_eq!(forward.area(), incremental.area());
        for (x, y) in [(45, 50), (80, 110), (0, 0), (99, 59), (-10, -10), (61, 5)] {
            assert_eq!(
                forward.rect_at(x, y).is_some(),
                incremental.rect_at(x, y).is_some(),
                "point ({}, {})",
                x,
                y
            );
        }
    }

    #[test]
    fn test_validate_reports_overlap() {
        let (_, o) = Region::validate(&[rect(0, 0, 10, 10), rect(20, 0, 30, 10)]);
        assert!(!o);
        let (r, o) = Region::validate(&[rect(0, 0, 10, 10), rect(5, 0, 15, 10)]);
        assert!(o);
        assert_eq!(r.rects(), &[rect(0, 0, 15, 10)]);
        // Overlap across different bands is observed during the merge pass.
        let (r, o) = Region::validate(&[rect(0, 0, 10, 10), rect(5, 5, 15, 15)]);
        assert!(o);
        assert_eq!(r.area(), 175);
    }

    #[test]
    fn test_validate_many_bands() {
        // Interleaved scanline-ish input.
        let mut rects = Vec::new();
        for i in 0..20 {
            rects.push(rect(0, i * 10, 50 + (i % 3), i * 10 + 10));
        }
        rects.reverse();
        let (r, _) = Region::validate(&rects);
        assert_invariants(&r);
        let expected: i64 = (0..20).map(|i| (50 + (i % 3)) as i64 * 10).sum();
        assert_eq!(r.area(), expected);
    }
}
