// src/core/fs_ops.rs
//! File system helpers shared by storage, image generation and posting

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::info;

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF_SIGNATURE: &[u8] = b"GIF8";

pub struct FsOps;

impl FsOps {
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    /// Write bytes, creating the parent directory first
    pub async fn write_bytes_safe(path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        info!("Written file: {}", path.display());
        Ok(())
    }

    /// Keep alphanumerics, spaces, dashes and underscores; spaces become underscores
    pub fn sanitize_file_name(name: &str) -> String {
        name.chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .trim()
            .replace(' ', "_")
    }

    /// Check that a file is a non-empty PNG, JPEG or GIF by its signature
    pub async fn validate_image(path: &Path) -> Result<()> {
        let header = fs::read(path)
            .await
            .with_context(|| format!("Cannot read image file: {}", path.display()))?;

        if header.is_empty() {
            anyhow::bail!("Image file is empty: {}", path.display());
        }

        if header.starts_with(PNG_SIGNATURE)
            || header.starts_with(JPEG_SIGNATURE)
            || header.starts_with(GIF_SIGNATURE)
        {
            Ok(())
        } else {
            anyhow::bail!(
                "Unsupported image format for {} - use PNG, JPEG or GIF",
                path.display()
            )
        }
    }

    /// Delete files with the given extension older than `max_age`; returns how many
    pub async fn remove_files_older_than(
        dir: &Path,
        extension: &str,
        max_age: Duration,
    ) -> Result<usize> {
        let mut count = 0;
        if !dir.exists() {
            return Ok(count);
        }

        let now = SystemTime::now();
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if !matches_ext || !path.is_file() {
                continue;
            }

            let modified = entry.metadata().await?.modified()?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age >= max_age {
                fs::remove_file(&path)
                    .await
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                count += 1;
                info!("Cleaned up old file: {}", path.display());
            }
        }
        Ok(count)
    }
}
