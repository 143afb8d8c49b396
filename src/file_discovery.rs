use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tokio::fs;
use tracing::{trace, warn};

use crate::artifact::DocumentType;
use crate::error::{DeriveError, Result};

/// A file selected for derivation, with the document type its extension maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDocument {
    pub path: PathBuf,
    pub document_type: DocumentType,
}

/// Async directory walk selecting documents by extension and glob patterns.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Extension (lowercase, no dot) to document type
    type_mappings: BTreeMap<String, DocumentType>,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
    /// Maximum directory depth below the root (None = unlimited)
    max_depth: Option<usize>,
    follow_symlinks: bool,
}

impl FileDiscovery {
    /// Discovery of `.xsd`, `.wsdl` and `.xml` (as policy) documents.
    pub fn new() -> Self {
        Self {
            type_mappings: default_type_mappings(),
            include_set: None,
            exclude_set: None,
            max_depth: None,
            follow_symlinks: false,
        }
    }

    /// Replace the extension → document type table.
    pub fn with_type_mappings(mut self, mappings: BTreeMap<String, DocumentType>) -> Self {
        self.type_mappings = mappings
            .into_iter()
            .map(|(ext, document_type)| (ext.to_lowercase(), document_type))
            .collect();
        self
    }

    /// Restrict discovery to `extensions`, dropping every other mapping.
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        let wanted: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
        self.type_mappings.retain(|ext, _| wanted.contains(ext));
        self
    }

    pub fn with_include_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.include_set = build_glob_set(patterns, "include")?;
        Ok(self)
    }

    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude_set = build_glob_set(patterns, "exclude")?;
        Ok(self)
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Documents under `path` (a file or a directory), sorted by path.
    ///
    /// A single file given explicitly is still subject to the extension and
    /// pattern filters. Unreadable entries below the root are skipped with a
    /// warning.
    pub async fn discover(&self, path: &Path) -> Result<Vec<DiscoveredDocument>> {
        Ok(self.walk(path).await?.0)
    }

    pub async fn discover_with_stats(
        &self,
        path: &Path,
    ) -> Result<(Vec<DiscoveredDocument>, DiscoveryStats)> {
        self.walk(path).await
    }

    async fn walk(&self, root: &Path) -> Result<(Vec<DiscoveredDocument>, DiscoveryStats)> {
        let metadata = fs::metadata(root).await?;
        let mut stats = DiscoveryStats::default();
        let mut found = Vec::new();

        if metadata.is_file() {
            stats.files_seen = 1;
            found.extend(self.classify(root));
        } else {
            let mut pending = vec![(root.to_path_buf(), 0usize)];
            while let Some((dir, depth)) = pending.pop() {
                if let Err(err) = self
                    .read_directory(&dir, depth, &mut pending, &mut found, &mut stats)
                    .await
                {
                    warn!(path = %dir.display(), error = %err, "skipping unreadable directory");
                    stats.errors += 1;
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        stats.documents_found = found.len();
        trace!(root = %root.display(), ?stats, "discovery finished");
        Ok((found, stats))
    }

    async fn read_directory(
        &self,
        dir: &Path,
        depth: usize,
        pending: &mut Vec<(PathBuf, usize)>,
        found: &mut Vec<DiscoveredDocument>,
        stats: &mut DiscoveryStats,
    ) -> Result<()> {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !self.follow_symlinks && entry.file_type().await?.is_symlink() {
                continue;
            }

            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping entry");
                    stats.errors += 1;
                    continue;
                }
            };

            if metadata.is_dir() {
                if self.max_depth.is_none_or(|max| depth < max) {
                    pending.push((path, depth + 1));
                }
            } else if metadata.is_file() {
                stats.files_seen += 1;
                found.extend(self.classify(&path));
            }
        }
        Ok(())
    }

    /// Document type for `path`, if it passes the extension and pattern filters.
    pub fn classify(&self, path: &Path) -> Option<DiscoveredDocument> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        let document_type = self.type_mappings.get(&extension)?;

        if self.exclude_set.as_ref().is_some_and(|set| set.is_match(path)) {
            return None;
        }
        if self.include_set.as_ref().is_some_and(|set| !set.is_match(path)) {
            return None;
        }

        Some(DiscoveredDocument {
            path: path.to_path_buf(),
            document_type: document_type.clone(),
        })
    }

    pub fn should_process(&self, path: &Path) -> bool {
        self.classify(path).is_some()
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_type_mappings() -> BTreeMap<String, DocumentType> {
    BTreeMap::from([
        ("xsd".to_string(), DocumentType::XsdDocument),
        ("wsdl".to_string(), DocumentType::WsdlDocument),
        ("xml".to_string(), DocumentType::PolicyDocument),
    ])
}

fn build_glob_set(patterns: &[String], kind: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                DeriveError::Config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| DeriveError::Config(format!("Failed to build {} glob set: {}", kind, e)))
}

/// Counters from one discovery walk.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub files_seen: usize,
    pub documents_found: usize,
    pub errors: usize,
}
