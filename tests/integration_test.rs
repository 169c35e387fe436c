//! Integration tests for the PDF Annotator MCP Server
//!
//! The mapping engine is exercised through the same trait seams the PDFium
//! adapter implements, with synthetic in-memory pages.

use pdf_annotator_mcp::annot::{
    extract_region_text, map_annotation_text, resolve_regions, unify_pages, AnnotationKind,
    AnnotationSource, BoundingBox, ExtractionOutcome, PageTextLayout, RawAnnotation,
    ResolvedRegions, TextAtom, TextLayoutSource, UnifyOptions,
};
use pdf_annotator_mcp::pdf::resolve_page_range;
use pdf_annotator_mcp::source::{find_pdf, list_pdfs, ListQuery, Sandbox, DEFAULT_MAX_FILE_SIZE};
use pdf_annotator_mcp::Result;

// ============================================================================
// Synthetic document
// ============================================================================

struct TestDocument {
    pages: Vec<(Vec<RawAnnotation>, Vec<TextAtom>)>,
}

impl AnnotationSource for TestDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn annotations_on_page(&self, page: u32) -> Result<Vec<RawAnnotation>> {
        Ok(self.pages[(page - 1) as usize].0.clone())
    }
}

impl TextLayoutSource for TestDocument {
    fn atoms_on_page(&self, page: u32) -> Result<Vec<TextAtom>> {
        Ok(self.pages[(page - 1) as usize].1.clone())
    }
}

fn atom(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextAtom {
    TextAtom::new(text, BoundingBox::new(x0, y0, x1, y1))
}

/// Two lines of prose laid out like a real page: 10pt-high words with a
/// 14pt line pitch.
fn prose_atoms() -> Vec<TextAtom> {
    vec![
        atom("The", 10.0, 20.0, 30.0, 30.0),
        atom("quick", 34.0, 20.0, 64.0, 30.0),
        atom("brown", 68.0, 20.0, 100.0, 30.0),
        atom("fox", 104.0, 20.0, 122.0, 30.0),
        atom("jumps", 10.0, 34.0, 44.0, 44.0),
        atom("over", 48.0, 34.0, 72.0, 44.0),
        atom("lazy", 76.0, 34.0, 98.0, 44.0),
        atom("dogs", 102.0, 34.0, 126.0, 44.0),
    ]
}

fn highlight(page: u32, rect: BoundingBox, quads: Option<Vec<f32>>) -> RawAnnotation {
    RawAnnotation {
        page,
        kind: AnnotationKind::Highlight,
        author: Some("tester".to_string()),
        contents: None,
        rect,
        quad_points: quads,
        created: None,
        modified: None,
    }
}

// ============================================================================
// Annotation-to-text mapping
// ============================================================================

#[test]
fn test_highlight_quads_map_to_covered_words() {
    let layout = PageTextLayout::new(prose_atoms());

    // One quad per highlighted word on the first line.
    let ann = highlight(
        1,
        BoundingBox::new(34.0, 19.0, 100.0, 31.0),
        Some(vec![
            34.0, 19.0, 64.0, 19.0, 34.0, 31.0, 64.0, 31.0, // "quick"
            68.0, 19.0, 100.0, 19.0, 68.0, 31.0, 100.0, 31.0, // "brown"
        ]),
    );

    assert_eq!(
        map_annotation_text(&ann, &layout).as_deref(),
        Some("quick brown")
    );
}

#[test]
fn test_malformed_quads_fall_back_to_rect() {
    let layout = PageTextLayout::new(prose_atoms());

    // 6 floats is not a multiple of 8, so the rect takes over.
    let ann = highlight(
        1,
        BoundingBox::new(10.0, 19.0, 122.0, 31.0),
        Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
    );

    match resolve_regions(&ann.rect, ann.quad_points.as_deref()) {
        ResolvedRegions::FellBackToRect(_) => {}
        other => panic!("expected rect fallback, got {:?}", other),
    }

    assert_eq!(
        map_annotation_text(&ann, &layout).as_deref(),
        Some("The quick brown fox")
    );
}

#[test]
fn test_sliver_highlight_recovered_by_clustering() {
    let layout = PageTextLayout::new(prose_atoms());

    // A box too thin to contain any atom center still overlaps the first
    // line, so the clustering strategy picks up the overlapped words.
    let region = BoundingBox::new(36.0, 24.0, 45.0, 26.0);
    match extract_region_text(&layout, &region) {
        ExtractionOutcome::ExtractedViaClustering(text) => assert_eq!(text, "quick"),
        other => panic!("expected clustering extraction, got {:?}", other),
    }
}

#[test]
fn test_region_over_empty_space_finds_nothing() {
    let layout = PageTextLayout::new(prose_atoms());

    let region = BoundingBox::new(300.0, 300.0, 340.0, 320.0);
    assert!(matches!(
        extract_region_text(&layout, &region),
        ExtractionOutcome::NoTextFound
    ));
}

#[test]
fn test_multi_line_highlight_joins_lines() {
    let layout = PageTextLayout::new(prose_atoms());

    let ann = highlight(
        1,
        BoundingBox::new(60.0, 19.0, 126.0, 45.0),
        Some(vec![
            68.0, 19.0, 122.0, 19.0, 68.0, 31.0, 122.0, 31.0, // "brown fox"
            76.0, 33.0, 126.0, 33.0, 76.0, 45.0, 126.0, 45.0, // "lazy dogs"
        ]),
    );

    assert_eq!(
        map_annotation_text(&ann, &layout).as_deref(),
        Some("brown fox lazy dogs")
    );
}

// ============================================================================
// End-to-end unification
// ============================================================================

#[test]
fn test_unify_mixed_annotations() {
    let doc = TestDocument {
        pages: vec![
            (
                vec![
                    highlight(
                        1,
                        BoundingBox::new(34.0, 19.0, 100.0, 31.0),
                        Some(vec![34.0, 19.0, 100.0, 19.0, 34.0, 31.0, 100.0, 31.0]),
                    ),
                    RawAnnotation {
                        page: 1,
                        kind: AnnotationKind::Text,
                        author: Some("reviewer".to_string()),
                        contents: Some("needs citation".to_string()),
                        rect: BoundingBox::new(200.0, 20.0, 220.0, 40.0),
                        quad_points: None,
                        created: None,
                        modified: None,
                    },
                    RawAnnotation {
                        page: 1,
                        kind: AnnotationKind::Link,
                        author: None,
                        contents: None,
                        rect: BoundingBox::new(10.0, 20.0, 30.0, 30.0),
                        quad_points: None,
                        created: None,
                        modified: None,
                    },
                ],
                prose_atoms(),
            ),
            // A scanned page: annotations but no text layer.
            (
                vec![RawAnnotation {
                    contents: Some("margin note".to_string()),
                    ..highlight(2, BoundingBox::new(10.0, 10.0, 50.0, 20.0), None)
                }],
                vec![],
            ),
        ],
    };

    let report = unify_pages(&doc, &doc, &[1, 2], &UnifyOptions::default());

    assert!(report.skipped_pages.is_empty());
    assert_eq!(report.annotations.len(), 3);

    assert_eq!(report.annotations[0].page, 1);
    assert_eq!(report.annotations[0].kind, "highlight");
    assert_eq!(
        report.annotations[0].highlighted_text.as_deref(),
        Some("quick brown")
    );

    assert_eq!(report.annotations[1].kind, "text");
    assert_eq!(
        report.annotations[1].note.as_deref(),
        Some("needs citation")
    );

    // The scanned-page highlight keeps its note, text stays absent.
    assert_eq!(report.annotations[2].page, 2);
    assert_eq!(report.annotations[2].highlighted_text, None);
    assert_eq!(report.annotations[2].note.as_deref(), Some("margin note"));
}

#[test]
fn test_unify_with_page_range() {
    let page = (
        vec![highlight(
            1,
            BoundingBox::new(34.0, 19.0, 100.0, 31.0),
            None,
        )],
        prose_atoms(),
    );
    let mut doc = TestDocument {
        pages: vec![page.clone(), page.clone(), page],
    };
    for (i, (anns, _)) in doc.pages.iter_mut().enumerate() {
        for a in anns {
            a.page = i as u32 + 1;
        }
    }

    let pages = resolve_page_range(Some("2-3"), doc.page_count()).unwrap();
    let options = UnifyOptions::with_types(&["highlight".to_string()], true);
    let report = unify_pages(&doc, &doc, &pages, &options);

    let seen: Vec<u32> = report.annotations.iter().map(|a| a.page).collect();
    assert_eq!(seen, vec![2, 3]);
}

#[test]
fn test_unified_annotation_json_shape() {
    let doc = TestDocument {
        pages: vec![(
            vec![highlight(
                1,
                BoundingBox::new(34.0, 19.0, 100.0, 31.0),
                None,
            )],
            prose_atoms(),
        )],
    };

    let report = unify_pages(&doc, &doc, &[1], &UnifyOptions::default());
    let json = serde_json::to_value(&report.annotations).unwrap();

    let first = &json[0];
    assert_eq!(first["type"], "highlight");
    assert_eq!(first["page"], 1);
    assert!(first["position"]["x0"].is_number());
    assert!(first.get("note").is_none());
}

// ============================================================================
// Sandbox and discovery
// ============================================================================

#[test]
fn test_sandbox_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("paper.pdf"), b"%PDF-1.7").unwrap();
    std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
    std::fs::write(dir.path().join("a/b/deep.pdf"), b"%PDF-1.7").unwrap();

    let sandbox = Sandbox::new(&[dir.path()], DEFAULT_MAX_FILE_SIZE).unwrap();

    let files = list_pdfs(
        &sandbox,
        &ListQuery {
            depth: 3,
            limit: 50,
            ..ListQuery::default()
        },
    )
    .unwrap();
    assert_eq!(files.len(), 2);

    let found = find_pdf(&sandbox, "deep").unwrap();
    assert!(found.ends_with("deep.pdf"));

    // Escaping the sandbox by path is refused even for real files.
    let outside = tempfile::TempDir::new().unwrap();
    std::fs::write(outside.path().join("evil.pdf"), b"%PDF-1.7").unwrap();
    assert!(sandbox
        .resolve(outside.path().join("evil.pdf"))
        .is_err());
}
