//! Spatially queryable index of a page's positioned text atoms
//!
//! A [`PageTextLayout`] is built once per page from the word atoms the text
//! layout source provides, and is immutable afterwards. Queries are linear
//! scans over the page's atoms, which number in the tens to low thousands on
//! typical pages.

use crate::annot::geometry::BoundingBox;

/// Multiplier applied to the page's median atom height to obtain the
/// row-clustering tolerance. Atoms whose vertical centers fall within this
/// band of a row's first atom belong to the same row.
pub const ROW_TOLERANCE_FACTOR: f32 = 1.0;

/// Fallback row tolerance for pages where no atom has a usable height.
const DEFAULT_ROW_TOLERANCE: f32 = 5.0;

/// The smallest positioned unit of page text available from the layout
/// source (a word, for the pdfium backend), carrying its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAtom {
    pub text: String,
    pub bbox: BoundingBox,
}

impl TextAtom {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox: bbox.normalized(),
        }
    }
}

/// One row of atoms, left to right, with the row's vertical extent.
#[derive(Debug)]
struct Row {
    atoms: Vec<TextAtom>,
    y0: f32,
    y1: f32,
}

impl Row {
    fn span(&self) -> BoundingBox {
        BoundingBox::new(f32::NEG_INFINITY, self.y0, f32::INFINITY, self.y1)
    }
}

/// Immutable per-page index answering "what text, if any, lies within box B".
///
/// Atoms are clustered into rows by vertical center (tolerance: the median
/// atom height times [`ROW_TOLERANCE_FACTOR`]), rows ordered top to bottom,
/// atoms within a row ordered left to right. That ordering is the page's
/// natural reading order for both extraction strategies.
#[derive(Debug)]
pub struct PageTextLayout {
    rows: Vec<Row>,
    atom_count: usize,
    row_tolerance: f32,
}

impl PageTextLayout {
    /// Build the index from a page's atoms. Atom order does not matter.
    pub fn new(atoms: Vec<TextAtom>) -> Self {
        let row_tolerance = median_atom_height(&atoms)
            .map(|h| h * ROW_TOLERANCE_FACTOR)
            .unwrap_or(DEFAULT_ROW_TOLERANCE);

        let mut sorted: Vec<TextAtom> = atoms
            .into_iter()
            .filter(|a| a.bbox.is_finite() && !a.text.is_empty())
            .collect();
        sorted.sort_by(|a, b| {
            let (ax, ay) = a.bbox.center();
            let (bx, by) = b.bbox.center();
            ay.partial_cmp(&by)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut rows: Vec<Row> = Vec::new();
        let mut current: Vec<TextAtom> = Vec::new();
        let mut current_center: Option<f32> = None;
        let mut atom_count = 0usize;

        for atom in sorted {
            atom_count += 1;
            let (_, cy) = atom.bbox.center();
            match current_center {
                Some(row_cy) if (cy - row_cy).abs() <= row_tolerance => current.push(atom),
                _ => {
                    if !current.is_empty() {
                        rows.push(finish_row(std::mem::take(&mut current)));
                    }
                    current_center = Some(cy);
                    current.push(atom);
                }
            }
        }
        if !current.is_empty() {
            rows.push(finish_row(current));
        }

        Self {
            rows,
            atom_count,
            row_tolerance,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.atom_count == 0
    }

    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    pub fn row_tolerance(&self) -> f32 {
        self.row_tolerance
    }

    /// Bounded-region extraction ("crop-and-read"): atoms whose center point
    /// lies within the target box, concatenated in reading order with single
    /// spaces. Empty result is valid and means nothing was contained.
    pub fn crop_text(&self, target: &BoundingBox) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for row in &self.rows {
            for atom in &row.atoms {
                let (cx, cy) = atom.bbox.center();
                if target.contains_point(cx, cy) {
                    parts.push(&atom.text);
                }
            }
        }
        parts.join(" ")
    }

    /// Proximity-clustering extraction: rows intersecting the target's
    /// vertical span, atoms within them intersecting its horizontal span.
    /// Atoms joined with single spaces, rows with single newlines.
    pub fn clustered_text(&self, target: &BoundingBox) -> String {
        let mut lines: Vec<String> = Vec::new();
        for row in &self.rows {
            if !row.span().overlaps_vertically(target) {
                continue;
            }
            let parts: Vec<&str> = row
                .atoms
                .iter()
                .filter(|a| a.bbox.overlaps_horizontally(target))
                .map(|a| a.text.as_str())
                .collect();
            if !parts.is_empty() {
                lines.push(parts.join(" "));
            }
        }
        lines.join("\n")
    }

    /// Full page text in reading order, one line per row.
    pub fn page_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.atoms
                    .iter()
                    .map(|a| a.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn finish_row(mut atoms: Vec<TextAtom>) -> Row {
    atoms.sort_by(|a, b| {
        a.bbox
            .x0
            .partial_cmp(&b.bbox.x0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let y0 = atoms.iter().map(|a| a.bbox.y0).fold(f32::INFINITY, f32::min);
    let y1 = atoms
        .iter()
        .map(|a| a.bbox.y1)
        .fold(f32::NEG_INFINITY, f32::max);
    Row { atoms, y0, y1 }
}

/// Median height across finite atoms, or None when no atom has one.
fn median_atom_height(atoms: &[TextAtom]) -> Option<f32> {
    let mut heights: Vec<f32> = atoms
        .iter()
        .map(|a| a.bbox.normalized().height())
        .filter(|h| h.is_finite() && *h > 0.0)
        .collect();
    if heights.is_empty() {
        return None;
    }
    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(heights[heights.len() / 2])
}
