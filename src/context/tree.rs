use super::FileTreeSource;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File listing taken from a local working copy instead of the API.
pub struct LocalCheckout {
    root: PathBuf,
}

impl LocalCheckout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List regular files breadth-first, siblings in name order.
    ///
    /// Only the `.git` directory is skipped; there is no ignore-file support.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut found: Vec<(usize, String)> = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"))
        {
            let entry = entry
                .with_context(|| format!("Failed to walk {}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_slash_path(&self.root, entry.path()) {
                found.push((entry.depth(), rel));
            }
        }

        // A name-sorted depth-first walk, stably regrouped by depth, is exactly
        // the breadth-first order.
        found.sort_by_key(|(depth, _)| *depth);
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }
}

impl FileTreeSource for LocalCheckout {
    async fn file_tree(&self) -> Result<Vec<String>> {
        self.list()
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
