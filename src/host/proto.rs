//! Host Update Protocol
//!
//! Wire records for the update batch, serialized as tagged JSON with a
//! 4-byte big-endian length prefix per frame.

use serde::{Deserialize, Serialize};

use crate::mirror::record::WindowAttr;
use crate::region::{Rect, Region};
use crate::xserver::{Wid, WindowKind};

/// A rectangle as it appears on the wire. Renderer tags never cross the
/// transport; window shapes are plain coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl From<Rect> for WireRect {
    fn from(r: Rect) -> Self {
        Self {
            x1: r.x1,
            y1: r.y1,
            x2: r.x2,
            y2: r.y2,
        }
    }
}

pub fn region_rects(region: &Region) -> Vec<WireRect> {
    region.rects().iter().map(|&r| WireRect::from(r)).collect()
}

// ============================================================================
// Guest → Host Updates
// ============================================================================

/// One accumulated delta for the host window tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Update {
    /// A window became relevant.
    Add {
        id: Wid,
        kind: WindowKind,
        protocols: u8,
    },

    /// A window stopped being relevant (or vanished).
    Remove { id: Wid },

    /// Frame geometry changed.
    Move { id: Wid, rect: WireRect },

    /// Title changed (already validated UTF-8).
    Title { id: Wid, title: String },

    /// Clip shape changed; `None` restores a plain rectangular window.
    Shape {
        id: Wid,
        rects: Option<Vec<WireRect>>,
    },

    /// One boolean attribute flipped.
    Attribute {
        id: Wid,
        attr: WindowAttr,
        on: bool,
    },

    /// Effective window type changed.
    Kind { id: Wid, kind: WindowKind },

    /// Desktop assignment changed (host desktop id).
    Desktop { id: Wid, desktop: u32 },

    /// Full top-to-bottom z-order of all relevant windows.
    ZOrder { ids: Vec<Wid> },

    /// The active desktop switched (host desktop id).
    ActiveDesktop { desktop: u32 },
}

// ============================================================================
// Framing
// ============================================================================

/// Encode one batch with a length prefix (4 bytes, big-endian) for reliable
/// socket reads.
pub fn encode_batch(updates: &[Update]) -> anyhow::Result<Vec<u8>> {
    let data = serde_json::to_vec(updates)?;
    let mut buf = Vec::with_capacity(4 + data.len());
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(&data);
    Ok(buf)
}

/// Decode a framed batch payload (without the length prefix).
pub fn decode_batch(data: &[u8]) -> anyhow::Result<Vec<Update>> {
    Ok(serde_json::from_slice(data)?)
}
