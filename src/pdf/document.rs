//! PDFium-backed document loading
//!
//! Everything a document exposes to the rest of the crate is pulled out
//! eagerly at load time and converted to top-left-origin page coordinates.
//! PDFium is not thread-safe, so a fresh instance is created per load and
//! never crosses a task boundary.

use crate::annot::{AnnotationKind, AnnotationSource, BoundingBox, RawAnnotation, TextAtom, TextLayoutSource};
use crate::error::{Error, Result};
use pdfium_render::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Get a PDFium instance (created per call, PDFium is not thread-safe).
fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Document information dictionary fields.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// Per-page data in top-left-origin coordinates.
#[derive(Debug, Clone, Default)]
struct PageData {
    annotations: Vec<RawAnnotation>,
    atoms: Vec<TextAtom>,
}

/// A fully loaded document. Owns no PDFium state, so it is Send and can be
/// returned from a blocking task.
#[derive(Debug)]
pub struct LoadedDocument {
    page_count: u32,
    metadata: DocumentMetadata,
    pages: BTreeMap<u32, PageData>,
}

/// Character with its box already flipped to top-left origin.
struct CharBox {
    ch: char,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl CharBox {
    fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

impl LoadedDocument {
    /// Load a document from a file path.
    pub fn open<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::PdfNotFound {
                path: path.display().to_string(),
            });
        }

        let data = std::fs::read(path)?;
        Self::open_bytes(&data, password)
    }

    /// Load a document from bytes, extracting annotations and text atoms for
    /// every page upfront.
    pub fn open_bytes(data: &[u8], password: Option<&str>) -> Result<Self> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidPdf {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        let pdfium = create_pdfium()?;

        let document = pdfium
            .load_pdf_from_byte_slice(data, password)
            .map_err(map_pdfium_error)?;

        let page_count = document.pages().len() as u32;
        let metadata = extract_metadata(&document);

        let mut page_data = BTreeMap::new();
        for page_num in 1..=page_count {
            let page = document
                .pages()
                .get((page_num - 1) as u16)
                .map_err(|e| Error::Pdfium {
                    reason: format!("Failed to get page {}: {}", page_num, e),
                })?;

            let page_height = page.height().value;
            let atoms = collect_text_atoms(&page, page_height);
            let annotations = collect_annotations(&page, page_num, page_height);

            page_data.insert(page_num, PageData { annotations, atoms });
        }

        Ok(Self {
            page_count,
            metadata,
            pages: page_data,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }
}

impl AnnotationSource for LoadedDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn annotations_on_page(&self, page: u32) -> Result<Vec<RawAnnotation>> {
        self.pages
            .get(&page)
            .map(|p| p.annotations.clone())
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            })
    }
}

impl TextLayoutSource for LoadedDocument {
    fn atoms_on_page(&self, page: u32) -> Result<Vec<TextAtom>> {
        self.pages
            .get(&page)
            .map(|p| p.atoms.clone())
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            })
    }
}

fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

fn extract_metadata(document: &PdfDocument) -> DocumentMetadata {
    let meta = document.metadata();
    DocumentMetadata {
        title: meta
            .get(PdfDocumentMetadataTagType::Title)
            .map(|t| t.value().to_string()),
        author: meta
            .get(PdfDocumentMetadataTagType::Author)
            .map(|t| t.value().to_string()),
        subject: meta
            .get(PdfDocumentMetadataTagType::Subject)
            .map(|t| t.value().to_string()),
        creator: meta
            .get(PdfDocumentMetadataTagType::Creator)
            .map(|t| t.value().to_string()),
        producer: meta
            .get(PdfDocumentMetadataTagType::Producer)
            .map(|t| t.value().to_string()),
        creation_date: meta
            .get(PdfDocumentMetadataTagType::CreationDate)
            .map(|t| t.value().to_string()),
        modification_date: meta
            .get(PdfDocumentMetadataTagType::ModificationDate)
            .map(|t| t.value().to_string()),
    }
}

/// Collect the page's characters as boxes in top-left-origin coordinates.
fn collect_char_boxes(page: &PdfPage, page_height: f32) -> Vec<CharBox> {
    let text_obj = match page.text() {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };

    let mut chars = Vec::new();
    for segment in text_obj.segments().iter() {
        if let Ok(char_iter) = segment.chars() {
            for char_result in char_iter.iter() {
                if let Some(c) = char_result.unicode_char() {
                    if let Ok(bounds) = char_result.loose_bounds() {
                        // PDFium boxes are bottom-left origin.
                        chars.push(CharBox {
                            ch: c,
                            x0: bounds.left().value,
                            y0: page_height - bounds.top().value,
                            x1: bounds.right().value,
                            y1: page_height - bounds.bottom().value,
                        });
                    }
                }
            }
        }
    }
    chars
}

/// Tolerances derived from the page's font size distribution: line grouping
/// uses ~40% of the median character height, word splitting ~30%.
fn word_thresholds(chars: &[CharBox]) -> (f32, f32) {
    let mut heights: Vec<f32> = chars
        .iter()
        .map(CharBox::height)
        .filter(|h| *h > 0.0)
        .collect();

    if heights.is_empty() {
        return (5.0, 10.0);
    }

    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_height = heights[heights.len() / 2];

    let y_tolerance = (median_height * 0.4).max(2.0);
    let space_threshold = (median_height * 0.3).max(3.0);
    (y_tolerance, space_threshold)
}

/// Group the page's characters into word atoms. Characters are clustered
/// into lines by vertical proximity, then each line splits into words at
/// whitespace characters and at horizontal gaps above the space threshold.
fn collect_text_atoms(page: &PdfPage, page_height: f32) -> Vec<TextAtom> {
    let mut chars = collect_char_boxes(page, page_height);
    if chars.is_empty() {
        return Vec::new();
    }

    let (y_tolerance, space_threshold) = word_thresholds(&chars);

    chars.sort_by(|a, b| {
        let y_cmp = a.y0.partial_cmp(&b.y0).unwrap_or(std::cmp::Ordering::Equal);
        if y_cmp == std::cmp::Ordering::Equal {
            a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            y_cmp
        }
    });

    let mut lines: Vec<Vec<CharBox>> = Vec::new();
    let mut current: Vec<CharBox> = Vec::new();
    let mut current_y: Option<f32> = None;

    for ch in chars {
        match current_y {
            Some(y) if (y - ch.y0).abs() <= y_tolerance => current.push(ch),
            _ => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current_y = Some(ch.y0);
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let mut atoms = Vec::new();
    for mut line in lines {
        line.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

        let mut word = String::new();
        let mut word_box: Option<BoundingBox> = None;
        let mut prev_x1: Option<f32> = None;

        for ch in line {
            let gap_break = prev_x1.is_some_and(|px| ch.x0 - px > space_threshold);
            if (ch.ch.is_whitespace() || gap_break) && !word.is_empty() {
                if let Some(bbox) = word_box.take() {
                    atoms.push(TextAtom::new(std::mem::take(&mut word), bbox));
                }
            }

            if !ch.ch.is_whitespace() {
                word.push(ch.ch);
                let ch_box = BoundingBox::new(ch.x0, ch.y0, ch.x1, ch.y1);
                word_box = Some(match word_box {
                    Some(b) => b.union(&ch_box),
                    None => ch_box,
                });
            }
            prev_x1 = Some(ch.x1);
        }

        if !word.is_empty() {
            if let Some(bbox) = word_box {
                atoms.push(TextAtom::new(word, bbox));
            }
        }
    }

    atoms
}

/// Read quad points from a text markup annotation, flattened to
/// `[x1, y1, x2, y2, x3, y3, x4, y4]` per quad, in top-left-origin
/// coordinates. Non-markup annotations carry no attachment points.
fn collect_quad_points(annotation: &PdfPageAnnotation, page_height: f32) -> Option<Vec<f32>> {
    let points = match annotation {
        PdfPageAnnotation::Highlight(a) => a.attachment_points(),
        PdfPageAnnotation::Underline(a) => a.attachment_points(),
        PdfPageAnnotation::Squiggly(a) => a.attachment_points(),
        PdfPageAnnotation::Strikeout(a) => a.attachment_points(),
        _ => return None,
    };

    let mut flat = Vec::new();
    for quad in points.iter() {
        flat.extend_from_slice(&[
            quad.x1.value,
            page_height - quad.y1.value,
            quad.x2.value,
            page_height - quad.y2.value,
            quad.x3.value,
            page_height - quad.y3.value,
            quad.x4.value,
            page_height - quad.y4.value,
        ]);
    }

    if flat.is_empty() {
        None
    } else {
        Some(flat)
    }
}

fn annotation_kind(ann_type: PdfPageAnnotationType) -> AnnotationKind {
    match ann_type {
        PdfPageAnnotationType::Highlight => AnnotationKind::Highlight,
        PdfPageAnnotationType::Text => AnnotationKind::Text,
        PdfPageAnnotationType::FreeText => AnnotationKind::Note,
        PdfPageAnnotationType::Link => AnnotationKind::Link,
        PdfPageAnnotationType::Popup => AnnotationKind::Popup,
        other => AnnotationKind::from_name(&format!("{:?}", other)),
    }
}

fn collect_annotations(page: &PdfPage, page_num: u32, page_height: f32) -> Vec<RawAnnotation> {
    let mut annotations = Vec::new();

    for annotation in page.annotations().iter() {
        let ann_type = annotation.annotation_type();

        // Popup annotations only mirror the contents of their parent.
        if ann_type == PdfPageAnnotationType::Popup {
            continue;
        }

        let kind = annotation_kind(ann_type);

        let rect = match annotation.bounds() {
            Ok(b) => BoundingBox::new(
                b.left().value,
                page_height - b.top().value,
                b.right().value,
                page_height - b.bottom().value,
            ),
            Err(e) => {
                tracing::debug!(page = page_num, error = %e, "annotation without bounds skipped");
                continue;
            }
        };

        annotations.push(RawAnnotation {
            page: page_num,
            kind,
            author: annotation.creator().filter(|s| !s.is_empty()),
            contents: annotation.contents().filter(|s| !s.is_empty()),
            rect,
            quad_points: collect_quad_points(&annotation, page_height),
            created: annotation.creation_date().map(|dt| dt.to_string()),
            modified: annotation.modification_date().map(|dt| dt.to_string()),
        });
    }

    annotations
}
