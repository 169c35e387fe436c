//! Sandboxed document location

pub mod locate;
pub mod sandbox;

pub use locate::{find_pdf, list_pdfs, ListQuery, PdfFileInfo};
pub use sandbox::{Sandbox, DEFAULT_MAX_FILE_SIZE};
