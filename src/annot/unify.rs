//! Joining annotation metadata with extracted text into unified records

use crate::annot::annotation::{AnnotationKind, AnnotationSource, RawAnnotation, TextLayoutSource};
use crate::annot::extract::map_annotation_text;
use crate::annot::geometry::{resolve_regions, BoundingBox};
use crate::annot::layout::PageTextLayout;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::HashSet;

/// Filters applied while unifying, as supplied at the tool-call boundary.
#[derive(Debug, Clone)]
pub struct UnifyOptions {
    /// Lowercased subtype names to include. Annotations of other kinds are
    /// excluded entirely (not emitted, not counted).
    pub include_kinds: HashSet<String>,
    /// When true, drop records with neither highlighted text nor a note.
    pub drop_empty: bool,
}

impl Default for UnifyOptions {
    /// Default filter: highlights and sticky notes, dropping empty records.
    /// Noisy kinds such as links and popups are excluded.
    fn default() -> Self {
        Self {
            include_kinds: ["highlight", "text"].iter().map(|s| s.to_string()).collect(),
            drop_empty: true,
        }
    }
}

impl UnifyOptions {
    /// Build options from the raw type names a client supplied. Names are
    /// matched case-insensitively, leading slashes are ignored, and aliases
    /// canonicalize ("note" and "freetext" address the same kind). An empty
    /// list keeps the default kind set.
    pub fn with_types(type_names: &[String], drop_empty: bool) -> Self {
        let include_kinds: HashSet<String> = type_names
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| AnnotationKind::from_name(t).as_str().to_string())
            .collect();
        if include_kinds.is_empty() {
            Self {
                drop_empty,
                ..Self::default()
            }
        } else {
            Self {
                include_kinds,
                drop_empty,
            }
        }
    }

    fn includes(&self, annotation: &RawAnnotation) -> bool {
        self.include_kinds.contains(annotation.kind.as_str())
    }
}

/// One annotation joined with the text it covers. Constructed once, never
/// mutated, serialized as pure structured data.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct UnifiedAnnotation {
    /// Page number, 1-indexed.
    pub page: u32,
    /// Annotation subtype, lowercased (e.g. "highlight", "text").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// The document text the annotation geometrically covers, when any was
    /// recoverable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_text: Option<String>,
    /// The note/comment attached to the annotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Union of the annotation's resolved boxes in page space.
    pub position: BoundingBox,
}

/// Diagnostic for a page that produced no annotations due to a structural
/// failure (text atoms or annotation list unavailable).
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PageDiagnostic {
    pub page: u32,
    pub message: String,
}

/// Result of unifying the requested pages of one document.
#[derive(Debug, Default)]
pub struct UnifyReport {
    /// Page ascending, then per-page enumeration order. Deterministic.
    pub annotations: Vec<UnifiedAnnotation>,
    pub skipped_pages: Vec<PageDiagnostic>,
}

/// Unify the requested pages: read annotations, map text for text-markup
/// kinds, apply the type filter and drop-empty policy.
///
/// Pages are independent: a structural failure on one page yields zero
/// annotations for that page plus a diagnostic, and the remaining pages
/// proceed. An empty page set yields an empty report.
pub fn unify_pages(
    annotations: &dyn AnnotationSource,
    layouts: &dyn TextLayoutSource,
    pages: &[u32],
    options: &UnifyOptions,
) -> UnifyReport {
    let mut report = UnifyReport::default();
    let total = annotations.page_count();

    for &page in pages {
        if page < 1 || page > total {
            tracing::warn!(page, total, "requested page out of range");
            report.skipped_pages.push(PageDiagnostic {
                page,
                message: format!("page {} out of range (total: {})", page, total),
            });
            continue;
        }

        let raw = match annotations.annotations_on_page(page) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(page, error = %e, "failed to read page annotations");
                report.skipped_pages.push(PageDiagnostic {
                    page,
                    message: e.client_message(),
                });
                continue;
            }
        };

        let surviving: Vec<RawAnnotation> =
            raw.into_iter().filter(|a| options.includes(a)).collect();
        if surviving.is_empty() {
            continue;
        }

        // The layout index is built once per page, and only when some
        // surviving annotation actually carries a text span.
        let layout = if surviving.iter().any(|a| a.kind.is_text_markup()) {
            match layouts.atoms_on_page(page) {
                Ok(atoms) => Some(PageTextLayout::new(atoms)),
                Err(e) => {
                    tracing::warn!(page, error = %e, "failed to read page text atoms");
                    report.skipped_pages.push(PageDiagnostic {
                        page,
                        message: e.client_message(),
                    });
                    continue;
                }
            }
        } else {
            None
        };

        for annotation in surviving {
            let highlighted_text = match (&layout, annotation.kind.is_text_markup()) {
                (Some(layout), true) => map_annotation_text(&annotation, layout),
                _ => None,
            };

            let note = annotation.contents.filter(|c| !c.is_empty());
            if options.drop_empty && highlighted_text.is_none() && note.is_none() {
                continue;
            }

            let position = resolve_regions(&annotation.rect, annotation.quad_points.as_deref())
                .position()
                .unwrap_or_else(|| annotation.rect.normalized());

            // The enumerated page labels the record; the raw annotation's
            // own page field may be stale in malformed documents.
            report.annotations.push(UnifiedAnnotation {
                page,
                kind: annotation.kind.as_str().to_string(),
                author: annotation.author.filter(|a| !a.is_empty()),
                highlighted_text,
                note,
                position,
            });
        }
    }

    report
}
