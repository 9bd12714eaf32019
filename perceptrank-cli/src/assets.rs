/// Image folder as the item universe.
use anyhow::{Context, Result};
use perceptrank_core::{AssetResolver, ItemId};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Items are image file names relative to `dir`.
pub struct DirectoryAssets {
    dir: PathBuf,
}

impl DirectoryAssets {
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Image folder {} does not exist", dir.display());
        }
        Ok(DirectoryAssets { dir: dir.to_path_buf() })
    }

    pub fn path_of(&self, item: &str) -> PathBuf {
        self.dir.join(item)
    }

    fn scan(&self) -> Result<Vec<ItemId>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;
        let mut items = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    items.push(name.to_string());
                }
            }
        }
        items.sort();
        Ok(items)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl AssetResolver for DirectoryAssets {
    fn exists(&self, item: &str) -> bool {
        self.path_of(item).is_file()
    }

    fn list_all(&self) -> Vec<ItemId> {
        match self.scan() {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "failed to list images");
                Vec::new()
            }
        }
    }
}
