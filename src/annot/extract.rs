//! Ranked text extraction strategies and the highlight-to-text mapper

use crate::annot::annotation::RawAnnotation;
use crate::annot::geometry::{resolve_regions, BoundingBox};
use crate::annot::layout::PageTextLayout;

/// Outcome of recovering text for one bounding box, tagged by the strategy
/// that produced it. The ranking is fixed: crop-and-read first, proximity
/// clustering second, and both may legitimately find nothing (an annotation
/// over a scanned image is not an error).
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    ExtractedViaCrop(String),
    ExtractedViaClustering(String),
    NoTextFound,
}

impl ExtractionOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionOutcome::ExtractedViaCrop(t)
            | ExtractionOutcome::ExtractedViaClustering(t) => Some(t),
            ExtractionOutcome::NoTextFound => None,
        }
    }
}

/// Recover the text within one box: strategy 1 (bounded-region crop), then
/// strategy 2 (proximity clustering) when the crop finds no atoms. First
/// non-empty result wins.
pub fn extract_region_text(layout: &PageTextLayout, region: &BoundingBox) -> ExtractionOutcome {
    let cropped = layout.crop_text(region);
    if !cropped.is_empty() {
        return ExtractionOutcome::ExtractedViaCrop(cropped);
    }

    let clustered = layout.clustered_text(region);
    if clustered.is_empty() {
        ExtractionOutcome::NoTextFound
    } else {
        ExtractionOutcome::ExtractedViaClustering(clustered)
    }
}

/// Map an annotation to the page text it covers.
///
/// Each box from geometry resolution (one per quad, or the rect) is extracted
/// independently and the non-empty spans are joined with single spaces in the
/// order the quads were given. `None` means no text was recoverable, which is
/// a valid result, never an error.
pub fn map_annotation_text(
    annotation: &RawAnnotation,
    layout: &PageTextLayout,
) -> Option<String> {
    let regions = resolve_regions(&annotation.rect, annotation.quad_points.as_deref());

    let spans: Vec<String> = regions
        .boxes()
        .iter()
        .filter_map(|b| extract_region_text(layout, b).text().map(str::to_owned))
        .collect();

    if spans.is_empty() {
        None
    } else {
        Some(spans.join(" "))
    }
}
