//! Filesystem sandbox for document access
//!
//! Every path a client supplies is resolved against a fixed set of allowed
//! directories. Canonicalization happens before the prefix check, so
//! symlinks cannot escape the sandbox.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Default maximum file size (100 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// The set of directories clients may read documents from.
#[derive(Debug, Clone)]
pub struct Sandbox {
    roots: Vec<PathBuf>,
    max_file_size: u64,
}

impl Sandbox {
    /// Build a sandbox from the configured directories. Directories that do
    /// not exist are rejected up front rather than silently ignored.
    pub fn new<P: AsRef<Path>>(dirs: &[P], max_file_size: u64) -> Result<Self> {
        let mut roots = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let canonical =
                std::fs::canonicalize(dir.as_ref()).map_err(|_| Error::PathAccessDenied {
                    path: dir.as_ref().display().to_string(),
                })?;
            if !canonical.is_dir() {
                return Err(Error::PathAccessDenied {
                    path: dir.as_ref().display().to_string(),
                });
            }
            roots.push(canonical);
        }

        Ok(Self {
            roots,
            max_file_size,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Resolve a client-supplied path to a canonical path inside the
    /// sandbox, enforcing the `.pdf` extension and the size limit.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = std::fs::canonicalize(path).map_err(|_| Error::PathAccessDenied {
            path: path.display().to_string(),
        })?;

        if !self.roots.iter().any(|root| canonical.starts_with(root)) {
            return Err(Error::PathAccessDenied {
                path: path.display().to_string(),
            });
        }

        let is_pdf = canonical
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(Error::InvalidPdf {
                reason: "Not a .pdf file".to_string(),
            });
        }

        let size = std::fs::metadata(&canonical)?.len();
        if size > self.max_file_size {
            return Err(Error::FileTooLarge {
                size,
                max_size: self.max_file_size,
            });
        }

        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox_in(dir: &TempDir) -> Sandbox {
        Sandbox::new(&[dir.path()], DEFAULT_MAX_FILE_SIZE).unwrap()
    }

    #[test]
    fn test_resolve_inside_sandbox() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"%PDF-1.7").unwrap();

        let sandbox = sandbox_in(&dir);
        assert!(sandbox.resolve(&file).is_ok());
    }

    #[test]
    fn test_resolve_outside_sandbox_denied() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let file = other.path().join("doc.pdf");
        std::fs::write(&file, b"%PDF-1.7").unwrap();

        let sandbox = sandbox_in(&dir);
        assert!(matches!(
            sandbox.resolve(&file),
            Err(Error::PathAccessDenied { .. })
        ));
    }

    #[test]
    fn test_non_pdf_extension_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.txt");
        std::fs::write(&file, b"hello").unwrap();

        let sandbox = sandbox_in(&dir);
        assert!(matches!(
            sandbox.resolve(&file),
            Err(Error::InvalidPdf { .. })
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"%PDF-1.7 and some more bytes").unwrap();

        let sandbox = Sandbox::new(&[dir.path()], 4).unwrap();
        assert!(matches!(
            sandbox.resolve(&file),
            Err(Error::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_missing_directory_rejected() {
        let result = Sandbox::new(&["/nonexistent/dir"], DEFAULT_MAX_FILE_SIZE);
        assert!(matches!(result, Err(Error::PathAccessDenied { .. })));
    }
}
