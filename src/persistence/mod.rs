//! Persistence layer for precomputed tool vectors.
//!
//! Vectors are produced offline by the `build-vectors` binary and loaded
//! read-only at serve time. Loading never fails: a missing or corrupt asset
//! yields an empty index, and tools simply score zero on similarity.

use crate::error::{AppError, Result};
use crate::embedding::Embedding;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Tool identifier to precomputed embedding.
pub type ToolVectorIndex = HashMap<String, Embedding>;

/// Load-once holder for the tool vector asset.
///
/// The first `load` reads the file; every later call returns the same index
/// without I/O, even if the file changes or two requests race on first access.
pub struct VectorStore {
    path: PathBuf,
    vectors: OnceLock<ToolVectorIndex>,
}

impl VectorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            vectors: OnceLock::new(),
        }
    }

    /// Store that is already populated. No file is ever read.
    pub fn preloaded(vectors: ToolVectorIndex) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(vectors);
        Self {
            path: PathBuf::new(),
            vectors: cell,
        }
    }

    pub fn load(&self) -> &ToolVectorIndex {
        self.vectors.get_or_init(|| read_vectors(&self.path))
    }

    pub fn is_loaded(&self) -> bool {
        self.vectors.get().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_vectors(path: &Path) -> ToolVectorIndex {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Tool vectors unavailable, similarity scoring disabled"
            );
            return ToolVectorIndex::new();
        }
    };

    match serde_json::from_str::<ToolVectorIndex>(&raw) {
        Ok(vectors) => {
            tracing::info!(
                path = %path.display(),
                num_tools = vectors.len(),
                embedding_dim = vectors.values().next().map(Vec::len).unwrap_or(0),
                "Tool vectors loaded"
            );
            vectors
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Tool vectors file is corrupt, similarity scoring disabled"
            );
            ToolVectorIndex::new()
        }
    }
}

/// Write vectors as pretty JSON, keys sorted for stable diffs.
pub fn save_vectors(path: &Path, vectors: &ToolVectorIndex) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::StorageError(format!("Failed to create vectors directory: {}", e))
        })?;
    }

    let sorted: BTreeMap<&String, &Embedding> = vectors.iter().collect();
    let mut json = serde_json::to_string_pretty(&sorted).map_err(|e| {
        AppError::StorageError(format!("Failed to serialize tool vectors: {}", e))
    })?;
    json.push('\n');

    fs::write(path, json).map_err(|e| {
        AppError::StorageError(format!("Failed to write tool vectors: {}", e))
    })?;

    tracing::info!(
        path = %path.display(),
        num_tools = vectors.len(),
        "Tool vectors saved"
    );

    Ok(())
}
