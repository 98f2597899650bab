// src/images.rs
//! Promotional job images from the generative API

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::captions::ImageGenerator;
use crate::core::config_manager::ImageGenerationConfig;
use crate::core::FsOps;
use crate::jobs::Job;

pub struct ImageService {
    generator: Arc<dyn ImageGenerator>,
    output_dir: PathBuf,
    max_age: Duration,
}

impl ImageService {
    pub fn new(generator: Arc<dyn ImageGenerator>, config: &ImageGenerationConfig) -> Self {
        Self {
            generator,
            output_dir: config.output_dir.clone(),
            max_age: Duration::from_secs(config.max_age_hours * 3600),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn build_prompt(job: &Job) -> String {
        let skills = if job.skills.is_empty() {
            "technology".to_string()
        } else {
            job.skills
                .iter()
                .take(5)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Create a professional, modern image for a job posting with the following specifications:

Company: {}
Job Title: {}
Location: {}
Skills: {}

Style Requirements:
- Professional and corporate aesthetic
- Clean, minimalist design
- Job title clearly visible
- Modern typography and layout
- Professional color scheme (blues, grays, whites)
- Include visual elements representing the job role
- High contrast for readability
- Suitable for social media platforms (LinkedIn, X)

The image should look like a professional job posting card that would attract top talent.",
            job.company, job.title, job.location, skills
        )
    }

    /// Generate and save an image for the job; `None` when the model returned no image
    pub async fn generate_for_job(&self, job: &Job, job_id: &str) -> Result<Option<PathBuf>> {
        let Some(image) = self.generator.generate_image(&Self::build_prompt(job)).await? else {
            warn!("No image returned for {} at {}", job.title, job.company);
            return Ok(None);
        };

        let extension = extension_for(&image.mime_type);
        let stem = FsOps::sanitize_file_name(&format!("{}_{}_{}", job.company, job.title, job_id));
        let path = self.output_dir.join(format!("{}.{}", stem, extension));

        FsOps::write_bytes_safe(&path, &image.bytes).await?;
        info!("Generated image for {} at {}: {}", job.title, job.company, path.display());
        Ok(Some(path))
    }

    /// Remove generated images older than the configured age
    pub async fn cleanup_old_images(&self) -> Result<usize> {
        let mut removed = 0;
        for extension in IMAGE_EXTENSIONS {
            removed +=
                FsOps::remove_files_older_than(&self.output_dir, extension, self.max_age).await?;
        }
        if removed > 0 {
            info!("Cleaned up {} old images", removed);
        }
        Ok(removed)
    }
}

// Every extension `extension_for` can return
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "gif"];

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::GeneratedImage;
    use crate::jobs::model::sample_job;
    use async_trait::async_trait;

    struct FixedImage(Option<GeneratedImage>);

    #[async_trait]
    impl ImageGenerator for FixedImage {
        async fn generate_image(&self, _prompt: &str) -> Result<Option<GeneratedImage>> {
            Ok(self.0.clone())
        }
    }

    fn service(image: Option<GeneratedImage>, dir: &Path, max_age_hours: u64) -> ImageService {
        let config = ImageGenerationConfig {
            enabled: true,
            output_dir: dir.to_path_buf(),
            max_age_hours,
            ..Default::default()
        };
        ImageService::new(Arc::new(FixedImage(image)), &config)
    }

    #[test]
    fn test_prompt_uses_top_five_skills() {
        let mut job = sample_job("ML Engineer", "Acme", "Pune");
        job.skills = ["a", "b", "c", "d", "e", "f"].map(String::from).to_vec();
        let prompt = ImageService::build_prompt(&job);
        assert!(prompt.contains("Skills: a, b, c, d, e\n"));
        assert!(prompt.contains("Company: Acme"));
    }

    #[tokio::test]
    async fn test_image_is_saved_with_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage {
            mime_type: "image/png".to_string(),
            bytes: b"\x89PNG\r\n\x1a\ndata".to_vec(),
        };
        let path = service(Some(image), dir.path(), 24)
            .generate_for_job(&sample_job("ML/AI Engineer", "Acme, Inc.", "Pune"), "42")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path, dir.path().join("Acme_Inc_MLAI_Engineer_42.png"));
        assert!(FsOps::validate_image(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_image_returns_none_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(None, dir.path(), 0);
        let result = service
            .generate_for_job(&sample_job("Analyst", "Acme", "Pune"), "1")
            .await
            .unwrap();
        assert!(result.is_none());

        FsOps::write_bytes_safe(&dir.path().join("old.png"), b"x").await.unwrap();
        assert_eq!(service.cleanup_old_images().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_removes_every_generated_format() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage {
            mime_type: "image/jpeg".to_string(),
            bytes: b"\xff\xd8\xffdata".to_vec(),
        };
        let service = service(Some(image), dir.path(), 0);
        let path = service
            .generate_for_job(&sample_job("Analyst", "Acme", "Pune"), "id1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        FsOps::write_bytes_safe(&dir.path().join("old.gif"), b"GIF89a").await.unwrap();
        FsOps::write_bytes_safe(&dir.path().join("notes.txt"), b"x").await.unwrap();

        assert_eq!(service.cleanup_old_images().await.unwrap(), 2);
        assert!(!path.exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
