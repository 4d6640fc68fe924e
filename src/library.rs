use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::SaveError;

/// Opaque reference returned immediately by an asset creation request,
/// resolved to a concrete [`Asset`] afterward.
#[derive(Debug, Clone)]
pub struct AssetPlaceholder {
    pub local_identifier: String,
}

/// A stored library item.
#[derive(Debug, Clone)]
pub struct Asset {
    pub local_identifier: String,
    pub created: DateTime<Utc>,
}

/// The photo-library collaborator the save workflow talks to.
///
/// The core pipeline never touches the library; it produces bytes and the
/// orchestration layer hands them over through this seam. Implement it to
/// bridge to a platform photo store.
#[async_trait::async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Check that the caller may write to the library. Called once before
    /// any save attempt; on denial the pipeline is never entered.
    async fn authorize(&self) -> Result<(), SaveError>;

    /// Create an asset from a file already written to disk.
    async fn create_asset(&self, file: &Path) -> Result<AssetPlaceholder, SaveError>;

    /// Resolve a placeholder identifier to the stored asset, if present.
    async fn fetch_asset(&self, local_identifier: &str) -> Result<Option<Asset>, SaveError>;
}

/// A photo library backed by a plain directory: assets are files, the local
/// identifier is the file name.
pub struct FolderLibrary {
    root: PathBuf,
}

impl FolderLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl PhotoLibrary for FolderLibrary {
    async fn authorize(&self) -> Result<(), SaveError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            log::warn!("library directory missing: {}", self.root.display());
            Err(SaveError::PermissionDenied)
        }
    }

    async fn create_asset(&self, file: &Path) -> Result<AssetPlaceholder, SaveError> {
        let name = file
            .file_name()
            .ok_or_else(|| SaveError::AssetCreation("source has no file name".into()))?;
        let target = self.root.join(name);
        tokio::fs::copy(file, &target)
            .await
            .map_err(|e| SaveError::AssetCreation(e.to_string()))?;
        Ok(AssetPlaceholder {
            local_identifier: name.to_string_lossy().into_owned(),
        })
    }

    async fn fetch_asset(&self, local_identifier: &str) -> Result<Option<Asset>, SaveError> {
        let path = self.root.join(local_identifier);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                let created = meta
                    .created()
                    .or_else(|_| meta.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                Ok(Some(Asset {
                    local_identifier: local_identifier.to_string(),
                    created,
                }))
            }
            Err(_) => Ok(None),
        }
    }
}
