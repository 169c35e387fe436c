//! Annotation-to-text mapping: geometry resolution, page text indexing,
//! covered-text extraction, and unification into structured records.
//!
//! Everything here is pure over positioned data. Reading that data out of a
//! document lives in [`crate::pdf`]; the seams are the [`AnnotationSource`]
//! and [`TextLayoutSource`] traits.

pub mod annotation;
pub mod extract;
pub mod geometry;
pub mod layout;
pub mod unify;

pub use annotation::{AnnotationKind, AnnotationSource, RawAnnotation, TextLayoutSource};
pub use extract::{extract_region_text, map_annotation_text, ExtractionOutcome};
pub use geometry::{resolve_regions, BoundingBox, ResolvedRegions};
pub use layout::{PageTextLayout, TextAtom};
pub use unify::{unify_pages, PageDiagnostic, UnifiedAnnotation, UnifyOptions, UnifyReport};
