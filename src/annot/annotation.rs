//! Raw annotation model and the source seams the core is built against
//!
//! The core never talks to a PDF library directly: structural metadata comes
//! through [`AnnotationSource`] and positioned text through
//! [`TextLayoutSource`], so either backend can be swapped without touching
//! the geometry or mapping logic.

use crate::annot::geometry::BoundingBox;
use crate::annot::layout::TextAtom;
use crate::error::Result;

/// Annotation subtype.
///
/// The named variants cover the kinds this server reasons about; everything
/// else is carried as `Other` with its lowercased subtype name so type
/// filters can still admit it (e.g. "underline").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    Highlight,
    /// Sticky note (PDF `/Text` annotation).
    Text,
    /// Free text placed directly on the page (PDF `/FreeText`).
    Note,
    Link,
    Popup,
    Other(String),
}

impl AnnotationKind {
    /// Parse a lowercased subtype name. Leading slashes are ignored so raw
    /// PDF names like "/Highlight" resolve too.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().trim_start_matches('/').to_ascii_lowercase();
        match name.as_str() {
            "highlight" => AnnotationKind::Highlight,
            "text" => AnnotationKind::Text,
            "note" | "freetext" => AnnotationKind::Note,
            "link" => AnnotationKind::Link,
            "popup" => AnnotationKind::Popup,
            _ => AnnotationKind::Other(name),
        }
    }

    /// Lowercased subtype name, the form type filters match on.
    pub fn as_str(&self) -> &str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Text => "text",
            AnnotationKind::Note => "freetext",
            AnnotationKind::Link => "link",
            AnnotationKind::Popup => "popup",
            AnnotationKind::Other(name) => name,
        }
    }

    /// Whether this annotation's semantics include a span of page text worth
    /// recovering (the mapper is only invoked for these kinds).
    pub fn is_text_markup(&self) -> bool {
        match self {
            AnnotationKind::Highlight => true,
            AnnotationKind::Other(name) => {
                matches!(name.as_str(), "underline" | "squiggly" | "strikeout")
            }
            _ => false,
        }
    }
}

/// One annotation as read from the document, structural fields only.
///
/// `rect` is always present and stored normalized. `quad_points`, when
/// present, encodes one or more quadrilaterals (groups of 8 floats) and takes
/// precedence over `rect` for geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotation {
    /// Page number, 1-indexed.
    pub page: u32,
    pub kind: AnnotationKind,
    pub author: Option<String>,
    /// Note/comment text attached to the annotation.
    pub contents: Option<String>,
    pub rect: BoundingBox,
    pub quad_points: Option<Vec<f32>>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Yields a document's annotations, page by page.
pub trait AnnotationSource {
    fn page_count(&self) -> u32;

    /// All annotations on the given page (1-indexed), in the document's
    /// enumeration order. A structural failure for the whole page is an error;
    /// a page without annotations is an empty vec.
    fn annotations_on_page(&self, page: u32) -> Result<Vec<RawAnnotation>>;
}

/// Yields a page's positioned text atoms.
pub trait TextLayoutSource {
    /// Word atoms for the given page (1-indexed). A scanned or image-only
    /// page legitimately yields an empty vec.
    fn atoms_on_page(&self, page: u32) -> Result<Vec<TextAtom>>;
}
