//! Finding and listing documents inside the sandbox

use crate::error::{Error, Result};
use crate::source::sandbox::Sandbox;
use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

const MAX_SEARCH_DEPTH: u32 = 5;
const MAX_LIST_LIMIT: usize = 200;

/// A document found inside the sandbox.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PdfFileInfo {
    pub path: String,
    pub size_bytes: u64,
    /// Last modification time, RFC 3339 in local time.
    pub modified: String,
}

struct FoundFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Query for [`list_pdfs`]. All filters optional; `depth` and `limit` are
/// clamped to sane bounds.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Restrict the search to one directory inside the sandbox.
    pub directory: Option<String>,
    /// Glob pattern matched case-insensitively against file names
    /// (e.g. "report*.pdf").
    pub pattern: Option<String>,
    /// Case-insensitive file name substring.
    pub name_filter: Option<String>,
    /// Subdirectory depth to search, 0 meaning the roots themselves.
    pub depth: u32,
    pub limit: usize,
}

/// Collect `.pdf` files under each root up to `depth` directory levels
/// below it. Depth 0 means the root itself.
fn walk_roots(roots: &[PathBuf], depth: u32) -> Vec<FoundFile> {
    let depth = depth.min(MAX_SEARCH_DEPTH);
    let mut found = Vec::new();

    for root in roots {
        for level in 0..=depth {
            let mut pattern = root.display().to_string();
            for _ in 0..level {
                pattern.push_str("/*");
            }
            pattern.push_str("/*.[pP][dD][fF]");

            let entries = match glob::glob(&pattern) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(pattern, error = %e, "skipping unreadable glob pattern");
                    continue;
                }
            };

            for entry in entries.flatten() {
                if let Ok(meta) = std::fs::metadata(&entry) {
                    if meta.is_file() {
                        found.push(FoundFile {
                            path: entry,
                            size: meta.len(),
                            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                        });
                    }
                }
            }
        }
    }

    // Most recently modified first.
    found.sort_by(|a, b| b.modified.cmp(&a.modified));
    found
}

fn to_info(file: &FoundFile) -> PdfFileInfo {
    let modified: DateTime<Local> = file.modified.into();
    PdfFileInfo {
        path: file.path.display().to_string(),
        size_bytes: file.size,
        modified: modified.to_rfc3339(),
    }
}

/// List documents in the sandbox matching the query, most recently
/// modified first.
pub fn list_pdfs(sandbox: &Sandbox, query: &ListQuery) -> Result<Vec<PdfFileInfo>> {
    let limit = query.limit.clamp(1, MAX_LIST_LIMIT);

    // A directory restriction must itself lie inside the sandbox.
    let roots: Vec<PathBuf> = match &query.directory {
        Some(dir) => {
            let canonical =
                std::fs::canonicalize(dir).map_err(|_| Error::PathAccessDenied {
                    path: dir.clone(),
                })?;
            if !canonical.is_dir()
                || !sandbox.roots().iter().any(|r| canonical.starts_with(r))
            {
                return Err(Error::PathAccessDenied { path: dir.clone() });
            }
            vec![canonical]
        }
        None => sandbox.roots().to_vec(),
    };

    let pattern = query
        .pattern
        .as_deref()
        .map(|p| {
            glob::Pattern::new(p).map_err(|_| Error::InvalidPattern {
                pattern: p.to_string(),
            })
        })
        .transpose()?;
    let match_options = glob::MatchOptions {
        case_sensitive: false,
        ..glob::MatchOptions::new()
    };
    let filter = query.name_filter.as_deref().map(str::to_lowercase);

    Ok(walk_roots(&roots, query.depth)
        .iter()
        .filter(|f| {
            let name = match f.path.file_name() {
                Some(n) => n.to_string_lossy(),
                None => return false,
            };
            if let Some(pattern) = &pattern {
                if !pattern.matches_with(&name, match_options) {
                    return false;
                }
            }
            match &filter {
                Some(needle) => name.to_lowercase().contains(needle),
                None => true,
            }
        })
        .take(limit)
        .map(to_info)
        .collect())
}

/// Locate one document by path or by name.
///
/// A reference that resolves directly inside the sandbox wins. Otherwise the
/// roots are searched for an exact filename match (`.pdf` appended when
/// missing), then for a filename containing the reference as a substring.
/// Ties go to the most recently modified file.
pub fn find_pdf(sandbox: &Sandbox, reference: &str) -> Result<PathBuf> {
    if let Ok(path) = sandbox.resolve(reference) {
        return Ok(path);
    }

    let reference_lower = reference.to_lowercase();
    let exact_name = if reference_lower.ends_with(".pdf") {
        reference_lower.clone()
    } else {
        format!("{}.pdf", reference_lower)
    };

    let candidates = walk_roots(sandbox.roots(), MAX_SEARCH_DEPTH);

    let matched = candidates
        .iter()
        .find(|f| {
            f.path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase() == exact_name)
                .unwrap_or(false)
        })
        .or_else(|| {
            candidates.iter().find(|f| {
                f.path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().contains(&reference_lower))
                    .unwrap_or(false)
            })
        });

    match matched {
        Some(found) => sandbox.resolve(&found.path),
        None => Err(Error::PdfNotFound {
            path: reference.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::sandbox::DEFAULT_MAX_FILE_SIZE;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.7").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/notes.pdf"), b"%PDF-1.7").unwrap();
        std::fs::write(dir.path().join("other.txt"), b"ignored").unwrap();

        let sandbox = Sandbox::new(&[dir.path()], DEFAULT_MAX_FILE_SIZE).unwrap();
        (dir, sandbox)
    }

    fn query(depth: u32, limit: usize) -> ListQuery {
        ListQuery {
            depth,
            limit,
            ..ListQuery::default()
        }
    }

    #[test]
    fn test_list_finds_nested_pdfs() {
        let (_dir, sandbox) = setup();
        let files = list_pdfs(&sandbox, &query(3, 50)).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.path.ends_with(".pdf")));
    }

    #[test]
    fn test_list_depth_zero_skips_nested() {
        let (_dir, sandbox) = setup();
        let files = list_pdfs(&sandbox, &query(0, 50)).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("report.pdf"));
    }

    #[test]
    fn test_list_name_filter() {
        let (_dir, sandbox) = setup();
        let files = list_pdfs(
            &sandbox,
            &ListQuery {
                name_filter: Some("NOTES".to_string()),
                ..query(3, 50)
            },
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("notes.pdf"));
    }

    #[test]
    fn test_list_glob_pattern() {
        let (_dir, sandbox) = setup();
        let files = list_pdfs(
            &sandbox,
            &ListQuery {
                pattern: Some("Rep*.pdf".to_string()),
                ..query(3, 50)
            },
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("report.pdf"));
    }

    #[test]
    fn test_list_invalid_pattern_rejected() {
        let (_dir, sandbox) = setup();
        let result = list_pdfs(
            &sandbox,
            &ListQuery {
                pattern: Some("[".to_string()),
                ..query(3, 50)
            },
        );
        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_list_restricted_to_subdirectory() {
        let (dir, sandbox) = setup();
        let files = list_pdfs(
            &sandbox,
            &ListQuery {
                directory: Some(dir.path().join("nested").display().to_string()),
                ..query(3, 50)
            },
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("notes.pdf"));
    }

    #[test]
    fn test_list_directory_outside_sandbox_denied() {
        let (_dir, sandbox) = setup();
        let outside = TempDir::new().unwrap();
        let result = list_pdfs(
            &sandbox,
            &ListQuery {
                directory: Some(outside.path().display().to_string()),
                ..query(3, 50)
            },
        );
        assert!(matches!(result, Err(Error::PathAccessDenied { .. })));
    }

    #[test]
    fn test_list_limit_clamped() {
        let (_dir, sandbox) = setup();
        let files = list_pdfs(&sandbox, &query(3, 0)).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_find_by_bare_name() {
        let (_dir, sandbox) = setup();
        let path = find_pdf(&sandbox, "report").unwrap();
        assert!(path.ends_with("report.pdf"));
    }

    #[test]
    fn test_find_nested_by_name() {
        let (_dir, sandbox) = setup();
        let path = find_pdf(&sandbox, "notes.pdf").unwrap();
        assert!(path.ends_with("notes.pdf"));
    }

    #[test]
    fn test_find_by_substring() {
        let (_dir, sandbox) = setup();
        let path = find_pdf(&sandbox, "repo").unwrap();
        assert!(path.ends_with("report.pdf"));
    }

    #[test]
    fn test_find_missing() {
        let (_dir, sandbox) = setup();
        assert!(matches!(
            find_pdf(&sandbox, "absent"),
            Err(Error::PdfNotFound { .. })
        ));
    }
}
