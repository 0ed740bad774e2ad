//! Directory-backed file listing for the preview UI.
//!
//! Lists every file under a root directory and reads content by relative
//! path. Paths that would escape the root are rejected.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::traits::SourceArtifact;

/// A listed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Path relative to the root, `/`-separated
    pub path: String,

    /// Final path component
    pub filename: String,
}

/// Errors that can occur while listing or reading sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Invalid source path: {0}")]
    InvalidPath(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
}

/// A root directory of generated component files.
#[derive(Debug, Clone)]
pub struct SourceDirectory {
    root: PathBuf,
}

impl SourceDirectory {
    /// Create a source directory rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all files under the root, sorted by path.
    pub fn list(&self) -> Result<Vec<SourceEntry>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::DirectoryNotFound(
                self.root.display().to_string(),
            ));
        }

        let mut entries: Vec<SourceEntry> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_or_vendored(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.relative(e.path()))
            .map(|path| SourceEntry {
                filename: path.rsplit('/').next().unwrap_or(&path).to_string(),
                path,
            })
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(entries)
    }

    /// Read a file by its relative path.
    pub fn read(&self, path: &str) -> Result<SourceArtifact, SourceError> {
        let full = self.resolve(path)?;

        let text = fs::read_to_string(&full).map_err(|e| SourceError::Read {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(SourceArtifact::new(text, path))
    }

    /// Map a relative path onto the filesystem, refusing anything outside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(path);

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if path.is_empty() || escapes {
            return Err(SourceError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(relative))
    }

    /// Relative `/`-separated path of a file under the root.
    pub fn relative(&self, full: &Path) -> Option<String> {
        let relative = full.strip_prefix(&self.root).ok()?;

        let parts: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

fn is_hidden_or_vendored(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name == "node_modules")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        let task = temp.path().join("task_1");
        fs::create_dir_all(&task).unwrap();
        fs::create_dir_all(temp.path().join(".cache")).unwrap();

        fs::write(task.join("Card.jsx"), "const Card = () => <div />;").unwrap();
        fs::write(task.join("card.css"), "body { color: red; }").unwrap();
        fs::write(temp.path().join("README.md"), "# generated").unwrap();
        fs::write(temp.path().join(".cache").join("x.jsx"), "ignored").unwrap();

        temp
    }

    #[test]
    fn lists_files_sorted() {
        let temp = fixture();
        let entries = SourceDirectory::new(temp.path()).list().unwrap();

        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "task_1/Card.jsx", "task_1/card.css"]);
        assert_eq!(entries[1].filename, "Card.jsx");
    }

    #[test]
    fn reads_content_by_path() {
        let temp = fixture();
        let artifact = SourceDirectory::new(temp.path())
            .read("task_1/Card.jsx")
            .unwrap();

        assert_eq!(artifact.text, "const Card = () => <div />;");
        assert_eq!(artifact.filename, "task_1/Card.jsx");
    }

    #[test]
    fn rejects_paths_outside_root() {
        let temp = fixture();
        let dir = SourceDirectory::new(temp.path());

        assert!(matches!(dir.read("../etc/passwd"), Err(SourceError::InvalidPath(_))));
        assert!(matches!(dir.read("/etc/passwd"), Err(SourceError::InvalidPath(_))));
        assert!(matches!(dir.read(""), Err(SourceError::InvalidPath(_))));
    }

    #[test]
    fn reports_missing_files_and_root() {
        let temp = fixture();

        assert!(matches!(
            SourceDirectory::new(temp.path()).read("task_1/Nope.jsx"),
            Err(SourceError::Read { .. })
        ));
        assert!(matches!(
            SourceDirectory::new(temp.path().join("missing")).list(),
            Err(SourceError::DirectoryNotFound(_))
        ));
    }
}
