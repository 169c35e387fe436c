//! MCP Server implementation using rmcp

use crate::annot::{unify_pages, PageDiagnostic, PageTextLayout, TextLayoutSource, UnifiedAnnotation, UnifyOptions};
use crate::error::Error;
use crate::pdf::{resolve_page_range, LoadedDocument};
use crate::source::{find_pdf, list_pdfs, ListQuery, PdfFileInfo, Sandbox, DEFAULT_MAX_FILE_SIZE};
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, service::RequestContext, tool, tool_handler, tool_router, RoleServer,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories clients may read PDFs from
    pub allowed_dirs: Vec<String>,
    /// Maximum PDF file size in bytes (default: 100MB)
    pub max_file_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_dirs: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// PDF annotation MCP server
#[derive(Clone)]
pub struct AnnotatorServer {
    sandbox: Arc<Sandbox>,
    tool_router: ToolRouter<Self>,
}

fn default_true() -> bool {
    true
}

fn default_depth() -> u32 {
    2
}

fn default_limit() -> usize {
    50
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractAnnotationsParams {
    /// PDF file name or path. Bare names are searched in the allowed
    /// directories.
    pub pdf: String,
    /// Page selection: "all" (default), "first", "last", a page number, or
    /// a span like "2-7", "4-", "-5"
    #[serde(default)]
    pub pages: Option<String>,
    /// Annotation types to include (default: highlight and text)
    #[serde(default)]
    pub include_types: Vec<String>,
    /// Drop annotations that carry neither highlighted text nor a note
    /// (default: true)
    #[serde(default = "default_true")]
    pub drop_empty: bool,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ExtractAnnotationsResult {
    /// Resolved path of the PDF that was read
    pub source: String,
    pub annotations: Vec<UnifiedAnnotation>,
    pub total_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_pages: Vec<PageDiagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractHighlightsParams {
    /// PDF file name or path
    pub pdf: String,
    /// Page selection (see extract_annotations)
    #[serde(default)]
    pub pages: Option<String>,
    /// Drop highlights whose covered text came out empty (default: false)
    #[serde(default)]
    pub drop_empty: bool,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadPdfTextParams {
    /// PDF file name or path
    pub pdf: String,
    /// Page selection (see extract_annotations)
    #[serde(default)]
    pub pages: Option<String>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PageText {
    pub page: u32,
    pub text: String,
    pub char_count: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReadPdfTextResult {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    pub page_count: u32,
    pub pages: Vec<PageText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPdfsParams {
    /// Restrict the listing to one directory inside the allowed directories
    #[serde(default)]
    pub directory: Option<String>,
    /// Case-insensitive glob pattern matched against file names
    /// (e.g. "report*.pdf")
    #[serde(default)]
    pub pattern: Option<String>,
    /// Case-insensitive filename substring to filter by
    #[serde(default)]
    pub name_filter: Option<String>,
    /// Subdirectory depth to search (0-5, default: 2)
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Maximum number of files to return (1-200, default: 50)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ListPdfsResult {
    pub files: Vec<PdfFileInfo>,
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ShowConfigResult {
    /// Directories the server is allowed to read from
    pub allowed_directories: Vec<String>,
    pub max_file_size_bytes: u64,
    /// File extensions the server will open
    pub allowed_extensions: Vec<String>,
}

#[tool_router]
impl AnnotatorServer {
    /// Create a server from configuration. Fails when an allowed directory
    /// does not exist.
    pub fn with_config(config: ServerConfig) -> crate::error::Result<Self> {
        let sandbox = Sandbox::new(&config.allowed_dirs, config.max_file_size)?;
        Ok(Self {
            sandbox: Arc::new(sandbox),
            tool_router: Self::tool_router(),
        })
    }

    #[tool(
        description = "Extract annotations (highlights with their covered text, sticky notes, comments) from a PDF. Accepts a file name or path inside the allowed directories."
    )]
    async fn extract_annotations(
        &self,
        Parameters(params): Parameters<ExtractAnnotationsParams>,
    ) -> String {
        let options = UnifyOptions::with_types(&params.include_types, params.drop_empty);
        let result = self
            .process_extract(&params.pdf, params.pages.as_deref(), params.password, options)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_annotations failed");
                ExtractAnnotationsResult {
                    source: params.pdf.clone(),
                    annotations: vec![],
                    total_count: 0,
                    skipped_pages: vec![],
                    error: Some(e.client_message()),
                }
            });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    #[tool(
        description = "Extract highlight annotations from a PDF together with the exact text each highlight covers. Accepts a file name or path inside the allowed directories."
    )]
    async fn extract_highlights(
        &self,
        Parameters(params): Parameters<ExtractHighlightsParams>,
    ) -> String {
        let options = UnifyOptions::with_types(&["highlight".to_string()], params.drop_empty);
        let result = self
            .process_extract(&params.pdf, params.pages.as_deref(), params.password, options)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_highlights failed");
                ExtractAnnotationsResult {
                    source: params.pdf.clone(),
                    annotations: vec![],
                    total_count: 0,
                    skipped_pages: vec![],
                    error: Some(e.client_message()),
                }
            });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    #[tool(
        description = "Read the plain text of a PDF in reading order, optionally restricted to a page range."
    )]
    async fn read_pdf_text(&self, Parameters(params): Parameters<ReadPdfTextParams>) -> String {
        let result = self
            .process_read_text(&params.pdf, params.pages.as_deref(), params.password)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "read_pdf_text failed");
                ReadPdfTextResult {
                    source: params.pdf.clone(),
                    title: None,
                    author: None,
                    subject: None,
                    creator: None,
                    creation_date: None,
                    page_count: 0,
                    pages: vec![],
                    error: Some(e.client_message()),
                }
            });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    #[tool(
        description = "List PDF files in the allowed directories, most recently modified first."
    )]
    async fn list_pdfs(&self, Parameters(params): Parameters<ListPdfsParams>) -> String {
        let sandbox = Arc::clone(&self.sandbox);
        let query = ListQuery {
            directory: params.directory,
            pattern: params.pattern,
            name_filter: params.name_filter,
            depth: params.depth,
            limit: params.limit,
        };
        let listed = tokio::task::spawn_blocking(move || list_pdfs(&sandbox, &query))
            .await
            .map_err(|e| Error::Pdfium {
                reason: format!("Task join error: {}", e),
            })
            .and_then(|r| r);

        let result = match listed {
            Ok(files) => ListPdfsResult {
                total_count: files.len() as u32,
                files,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "list_pdfs failed");
                ListPdfsResult {
                    files: vec![],
                    total_count: 0,
                    error: Some(e.client_message()),
                }
            }
        };
        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    #[tool(description = "Show the directories this server is allowed to read PDFs from.")]
    async fn show_config(&self) -> String {
        let result = ShowConfigResult {
            allowed_directories: self
                .sandbox
                .roots()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            max_file_size_bytes: self.sandbox.max_file_size(),
            allowed_extensions: vec![".pdf".to_string()],
        };
        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    async fn process_extract(
        &self,
        pdf: &str,
        pages: Option<&str>,
        password: Option<String>,
        options: UnifyOptions,
    ) -> crate::error::Result<ExtractAnnotationsResult> {
        let sandbox = Arc::clone(&self.sandbox);
        let pdf = pdf.to_string();
        let pages = pages.map(str::to_string);

        // All PDFium work stays on one blocking task.
        let (source, report) = tokio::task::spawn_blocking(move || {
            let path = find_pdf(&sandbox, &pdf)?;
            let document = LoadedDocument::open(&path, password.as_deref())?;
            let page_set = resolve_page_range(pages.as_deref(), document.page_count())?;
            let report = unify_pages(&document, &document, &page_set, &options);
            Ok::<_, Error>((path.display().to_string(), report))
        })
        .await
        .map_err(|e| Error::Pdfium {
            reason: format!("Task join error: {}", e),
        })??;

        Ok(ExtractAnnotationsResult {
            source,
            total_count: report.annotations.len() as u32,
            annotations: report.annotations,
            skipped_pages: report.skipped_pages,
            error: None,
        })
    }

    async fn process_read_text(
        &self,
        pdf: &str,
        pages: Option<&str>,
        password: Option<String>,
    ) -> crate::error::Result<ReadPdfTextResult> {
        let sandbox = Arc::clone(&self.sandbox);
        let pdf = pdf.to_string();
        let pages = pages.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            let path = find_pdf(&sandbox, &pdf)?;
            let document = LoadedDocument::open(&path, password.as_deref())?;
            let page_set = resolve_page_range(pages.as_deref(), document.page_count())?;

            let mut page_texts = Vec::with_capacity(page_set.len());
            for page in page_set {
                let atoms = document.atoms_on_page(page)?;
                let layout = PageTextLayout::new(atoms);
                let text = layout.page_text();
                page_texts.push(PageText {
                    page,
                    char_count: text.chars().count(),
                    text,
                });
            }

            let metadata = document.metadata();
            Ok(ReadPdfTextResult {
                source: path.display().to_string(),
                title: metadata.title.clone(),
                author: metadata.author.clone(),
                subject: metadata.subject.clone(),
                creator: metadata.creator.clone(),
                creation_date: metadata.creation_date.clone(),
                page_count: document.page_count(),
                pages: page_texts,
                error: None,
            })
        })
        .await
        .map_err(|e| Error::Pdfium {
            reason: format!("Task join error: {}", e),
        })?
    }
}

#[tool_handler]
impl ServerHandler for AnnotatorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF annotation server: extracts highlights with the text they cover, sticky \
                 notes, and other annotations from PDFs in the allowed directories. PDFs in \
                 those directories are also exposed as resources."
                    .into(),
            ),
        }
    }

    /// Expose sandboxed PDFs as resources.
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let sandbox = Arc::clone(&self.sandbox);
        let query = ListQuery {
            depth: 5,
            limit: 200,
            ..ListQuery::default()
        };
        let files = tokio::task::spawn_blocking(move || list_pdfs(&sandbox, &query))
            .await
            .map_err(|e| ErrorData::internal_error(format!("Task join error: {}", e), None))?
            .map_err(|e| {
                tracing::warn!(error = %e, "listing resources failed");
                ErrorData::internal_error(e.client_message(), None)
            })?;

        let resources = files
            .into_iter()
            .map(|file| {
                let name = std::path::Path::new(&file.path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.path.clone());
                let mut resource = RawResource::new(format!("file://{}", file.path), name);
                resource.mime_type = Some("application/pdf".to_string());
                resource.description = Some(format!(
                    "PDF file ({} bytes), modified: {}",
                    file.size_bytes, file.modified
                ));
                resource.size = Some(file.size_bytes as u32);
                Annotated {
                    raw: resource,
                    annotations: None,
                }
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: Default::default(),
        })
    }

    /// Read a PDF resource: returns its unified annotations as JSON.
    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = &request.uri;

        let path = uri.strip_prefix("file://").ok_or_else(|| {
            ErrorData::invalid_params("Only file:// URIs are supported", None)
        })?;

        match self
            .process_extract(path, None, None, UnifyOptions::default())
            .await
        {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::TextResourceContents {
                        uri: uri.clone(),
                        mime_type: Some("application/json".to_string()),
                        text,
                        meta: Default::default(),
                    }],
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "read_resource failed");
                Err(ErrorData::internal_error(e.client_message(), None))
            }
        }
    }
}

/// Run the MCP server over stdio with the given configuration.
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = AnnotatorServer::with_config(config)?;

    tracing::info!("PDF annotation server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
