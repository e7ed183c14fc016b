//! Work-Area Translator
//!
//! Derives per-edge screen reservations (struts) from the usable work area
//! the window manager advertises. The reserved area is `screen − work_area`;
//! each resulting rectangle is classified by which screen edges it touches
//! and emitted as a left/right/top/bottom strut.

use thiserror::Error;
use tracing::debug;

use crate::region::{Rect, Region};

/// Which screen edge a strut is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrutSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// A screen-edge-attached reserved rectangle (taskbar, dock, panel).
///
/// `thickness` is measured into the screen from the attached edge;
/// `start..=end` spans the perpendicular axis in root coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strut {
    pub side: StrutSide,
    pub thickness: i32,
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrutError {
    #[error("screen/work-area count mismatch: {screens} screens, {areas} work areas")]
    CountMismatch { screens: usize, areas: usize },
    #[error("reserved rectangle {rect:?} is not attached to a representable edge of screen {screen:?}")]
    Ambiguous { rect: Rect, screen: Rect },
    #[error("region arithmetic ran out of capacity")]
    Broken,
}

/// Compute the strut set for every screen, where `work_areas[i]` is the
/// usable area of `screens[i]`.
///
/// Fails without partial output on the first reserved rectangle whose edge
/// membership is ambiguous; callers keep their previous strut configuration
/// in that case.
pub fn compute_struts(screens: &[Rect], work_areas: &[Rect]) -> Result<Vec<Strut>, StrutError> {
    if screens.len() != work_areas.len() {
        return Err(StrutError::CountMismatch {
            screens: screens.len(),
            areas: work_areas.len(),
        });
    }

    let mut struts = Vec::new();
    for (screen, work_area) in screens.iter().zip(work_areas) {
        let reserved = Region::from_rect(*screen).subtract(&Region::from_rect(*work_area));
        if reserved.is_broken() {
            return Err(StrutError::Broken);
        }
        for rect in reserved.rects() {
            struts.push(classify(rect, screen)?);
        }
    }
    debug!("computed {} struts for {} screens", struts.len(), screens.len());
    Ok(struts)
}

/// Classify one reserved rectangle by exact edge-coordinate equality.
fn classify(rect: &Rect, screen: &Rect) -> Result<Strut, StrutError> {
    let left = rect.x1 == screen.x1;
    let right = rect.x2 == screen.x2;
    let top = rect.y1 == screen.y1;
    let bottom = rect.y2 == screen.y2;

    let side = match (left, right) {
        // Spans the full width: must hang off the top or the bottom.
        (true, true) => match (top, bottom) {
            (true, false) => StrutSide::Top,
            (false, true) => StrutSide::Bottom,
            _ => {
                return Err(StrutError::Ambiguous {
                    rect: *rect,
                    screen: *screen,
                })
            }
        },
        (true, false) => StrutSide::Left,
        (false, true) => StrutSide::Right,
        (false, false) => match (top, bottom) {
            (true, false) => StrutSide::Top,
            (false, true) => StrutSide::Bottom,
            _ => {
                return Err(StrutError::Ambiguous {
                    rect: *rect,
                    screen: *screen,
                })
            }
        },
    };

    Ok(match side {
        StrutSide::Left | StrutSide::Right => Strut {
            side,
            thickness: rect.width(),
            start: rect.y1,
            end: rect.y2 - 1,
        },
        StrutSide::Top | StrutSide::Bottom => Strut {
            side,
            thickness: rect.height(),
            start: rect.x1,
            end: rect.x2 - 1,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_panel() {
        // Screen 1280x960 with a 25px panel along the top edge.
        let struts = compute_struts(
            &[Rect::new(0, 0, 1280, 960)],
            &[Rect::new(0, 25, 1280, 960)],
        )
        .unwrap();
        assert_eq!(
            struts,
            vec![Strut {
                side: StrutSide::Top,
                thickness: 25,
                start: 0,
                end: 1279,
            }]
        );
    }

    #[test]
    fn test_left_dock_and_bottom_bar() {
        let struts = compute_struts(
            &[Rect::new(0, 0, 1920, 1080)],
            &[Rect::new(64, 0, 1920, 1040)],
        )
        .unwrap();
        assert_eq!(struts.len(), 2);
        assert!(struts.contains(&Strut {
            side: StrutSide::Left,
            thickness: 64,
            start: 0,
            end: 1039,
        }));
        assert!(struts.contains(&Strut {
            side: StrutSide::Bottom,
            thickness: 40,
            start: 0,
            end: 1919,
        }));
    }

    #[test]
    fn test_full_work_area_has_no_struts() {
        let screen = Rect::new(0, 0, 1280, 960);
        let struts = compute_struts(&[screen], &[screen]).unwrap();
        assert!(struts.is_empty());
    }

    #[test]
    fn test_multi_screen() {
        let screens = [Rect::new(0, 0, 1280, 960), Rect::new(1280, 0, 2560, 960)];
        let works = [Rect::new(0, 25, 1280, 960), Rect::new(1280, 0, 2560, 930)];
        let struts = compute_struts(&screens, &works).unwrap();
        assert_eq!(
            struts,
            vec![
                Strut {
                    side: StrutSide::Top,
                    thickness: 25,
                    start: 0,
                    end: 1279,
                },
                Strut {
                    side: StrutSide::Bottom,
                    thickness: 30,
                    start: 1280,
                    end: 2559,
                },
            ]
        );
    }

    #[test]
    fn test_disjoint_work_area_is_ambiguous() {
        // Nothing usable on this screen: the whole screen is "reserved" and
        // touches all four edges, which no strut orientation can express.
        let err = compute_struts(
            &[Rect::new(0, 0, 1280, 960)],
            &[Rect::new(5000, 0, 6280, 960)],
        )
        .unwrap_err();
        assert!(matches!(err, StrutError::Ambiguous { .. }));
    }

    #[test]
    fn test_count_mismatch() {
        let err = compute_struts(&[Rect::new(0, 0, 10, 10)], &[]).unwrap_err();
        assert_eq!(
            err,
            StrutError::CountMismatch {
                screens: 1,
                areas: 0,
            }
        );
    }
}
