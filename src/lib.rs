//! PDF Annotator MCP Server Library
//!
//! This crate provides MCP tools for reading PDF annotations:
//! - `extract_annotations`: Extract annotations with the text they cover
//! - `extract_highlights`: Extract highlights with their covered text
//! - `read_pdf_text`: Read page text in reading order
//! - `list_pdfs`: List PDFs in the allowed directories
//! - `show_config`: Show the allowed directories

pub mod annot;
pub mod error;
pub mod pdf;
pub mod server;
pub mod source;

pub use error::{Error, Result};
pub use server::{run_server_with_config, AnnotatorServer, ServerConfig};
