//! Annotation persistence.
//!
//! Annotations are the one player-authored data set in the twin, saved
//! as human-readable JSON under the per-install data directory. Loading
//! a just-saved store reproduces an equivalent set of records: same ids,
//! positions, text, categories, and stamps.

use crate::annotations::Annotation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
const SAVE_VERSION: u32 = 1;

/// A saved annotation set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAnnotations {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created (Unix seconds).
    pub saved_at: String,

    /// All annotation records, ordered by creation stamp.
    pub annotations: Vec<Annotation>,

    /// Metadata about the save.
    pub metadata: SaveMetadata,
}

/// Metadata about a save file, cheap to read without the full record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// Number of annotations in the save.
    pub count: usize,

    /// Distinct categories present, sorted.
    pub categories: Vec<String>,

    /// When the save was created (duplicated from parent for peek access).
    #[serde(default)]
    pub saved_at: String,
}

impl SavedAnnotations {
    /// Create a save from exported records.
    pub fn new(annotations: Vec<Annotation>) -> Self {
        let saved_at = timestamp_now();

        let mut categories: Vec<String> = annotations
            .iter()
            .filter_map(|a| a.category.clone())
            .collect();
        categories.sort();
        categories.dedup();

        let metadata = SaveMetadata {
            count: annotations.len(),
            categories,
            saved_at: saved_at.clone(),
        };

        Self {
            version: SAVE_VERSION,
            saved_at,
            annotations,
            metadata,
        }
    }

    /// Save to a JSON file, creating parent directories as needed.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Get a save's metadata without parsing the full record set.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SaveMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}

/// Information about a save file on disk.
#[derive(Debug, Clone)]
pub struct SaveInfo {
    /// Path to the save file.
    pub path: String,

    /// Save metadata.
    pub metadata: SaveMetadata,
}

/// List all annotation save files in a directory, creating it if absent.
pub async fn list_saves(dir: impl AsRef<Path>) -> Result<Vec<SaveInfo>, PersistError> {
    let mut saves = Vec::new();

    let dir_path = dir.as_ref();
    if !dir_path.exists() {
        fs::create_dir_all(dir_path).await?;
        return Ok(saves);
    }

    let mut entries = fs::read_dir(dir_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            if let Ok(metadata) = SavedAnnotations::peek_metadata(&path).await {
                saves.push(SaveInfo {
                    path: path.to_string_lossy().to_string(),
                    metadata,
                });
            }
        }
    }

    saves.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(saves)
}

/// Default per-install save directory for an application name.
pub fn default_save_dir(app_name: &str) -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(sanitize(app_name)).join("saved")
}

/// Canonical annotation store path under a save directory.
pub fn annotations_path(save_dir: impl AsRef<Path>) -> PathBuf {
    save_dir.as_ref().join("annotations").join("annotations.json")
}

/// Timestamped manual save path under a save directory.
pub fn manual_save_path(save_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    save_dir
        .as_ref()
        .join("annotations")
        .join(format!("{}_{}.json", sanitize(name), timestamp_now()))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Get current timestamp as Unix seconds.
fn timestamp_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", now.as_secs())
}
