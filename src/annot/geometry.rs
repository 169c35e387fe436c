//! Annotation geometry: bounding boxes and quad point resolution
//!
//! All coordinates are in top-left-origin page space (x grows right, y grows
//! down), the space the text layout index and the PDF backend agree on.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in page space.
///
/// Invariant after [`BoundingBox::normalized`]: `x0 <= x1` and `y0 <= y1`.
/// Raw PDF rectangles may arrive with reversed corners and must be normalized
/// on read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Return the box with corners in canonical order. Idempotent. NaN
    /// coordinates pass through unchanged (`f32::min`/`max` would silently
    /// replace them with the finite corner), so `is_finite` still rejects
    /// the box afterwards.
    pub fn normalized(self) -> Self {
        let mut b = self;
        if b.x0 > b.x1 {
            std::mem::swap(&mut b.x0, &mut b.x1);
        }
        if b.y0 > b.y1 {
            std::mem::swap(&mut b.y0, &mut b.y1);
        }
        b
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// True if the horizontal extents of the two boxes overlap.
    pub fn overlaps_horizontally(&self, other: &BoundingBox) -> bool {
        self.x1 > other.x0 && self.x0 < other.x1
    }

    /// True if the vertical extents of the two boxes overlap.
    pub fn overlaps_vertically(&self, other: &BoundingBox) -> bool {
        self.y1 > other.y0 && self.y0 < other.y1
    }

    /// Minimal box enclosing both boxes.
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Outcome of resolving an annotation's raw geometry into page-space boxes.
///
/// The decision chain is deterministic: well-formed quad points win, anything
/// else falls back to the annotation rectangle, and a non-finite rectangle
/// leaves the annotation without usable geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedRegions {
    /// Quad points were present and well formed: one box per quadrilateral,
    /// in the order the quads were given.
    Quads(Vec<BoundingBox>),
    /// Quad points were absent or malformed; the annotation rectangle is used.
    FellBackToRect(BoundingBox),
    /// Neither quad points nor a finite rectangle were available.
    NoGeometry,
}

impl ResolvedRegions {
    /// The boxes to extract text from, in order.
    pub fn boxes(&self) -> &[BoundingBox] {
        match self {
            ResolvedRegions::Quads(boxes) => boxes,
            ResolvedRegions::FellBackToRect(rect) => std::slice::from_ref(rect),
            ResolvedRegions::NoGeometry => &[],
        }
    }

    /// Union of all boxes, for reporting the annotation position.
    pub fn position(&self) -> Option<BoundingBox> {
        let mut boxes = self.boxes().iter();
        let first = *boxes.next()?;
        Some(boxes.fold(first, |acc, b| acc.union(b)))
    }
}

/// Resolve an annotation's geometric anchor into axis-aligned page-space boxes.
///
/// Quad points, when present, take precedence over the rectangle. A quad list
/// is well formed when it is non-empty, its length is a multiple of 8, and
/// every value is finite; each group of 8 floats (4 corner pairs, corner order
/// not guaranteed) becomes the minimal enclosing box. A malformed quad list is
/// a recoverable data-quality condition, not an error: fall back to the
/// rectangle silently.
pub fn resolve_regions(rect: &BoundingBox, quad_points: Option<&[f32]>) -> ResolvedRegions {
    if let Some(quads) = quad_points {
        if let Some(boxes) = quad_boxes(quads) {
            return ResolvedRegions::Quads(boxes);
        }
        if !quads.is_empty() {
            tracing::debug!(
                len = quads.len(),
                "malformed quad points, falling back to rect"
            );
        }
    }

    let rect = rect.normalized();
    if rect.is_finite() {
        ResolvedRegions::FellBackToRect(rect)
    } else {
        ResolvedRegions::NoGeometry
    }
}

/// Split a quad point list into enclosing boxes, or None when malformed.
fn quad_boxes(quads: &[f32]) -> Option<Vec<BoundingBox>> {
    if quads.is_empty() || quads.len() % 8 != 0 || quads.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let boxes = quads
        .chunks_exact(8)
        .map(|q| {
            let xs = [q[0], q[2], q[4], q[6]];
            let ys = [q[1], q[3], q[5], q[7]];
            BoundingBox {
                x0: xs.iter().copied().fold(f32::INFINITY, f32::min),
                y0: ys.iter().copied().fold(f32::INFINITY, f32::min),
                x1: xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
                y1: ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            }
        })
        .collect();

    Some(boxes)
}
