//! PDF document access via PDFium

pub mod document;
pub mod page_range;

pub use document::{DocumentMetadata, LoadedDocument};
pub use page_range::resolve_page_range;
