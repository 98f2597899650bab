// src/captions/mod.rs
//! Caption and image generation through the Gemini API

pub mod gemini_client;
pub mod generator;
pub(crate) mod types;

pub use gemini_client::GeminiClient;
pub use generator::{clean_caption, CaptionGenerator};

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// `None` when the model answered without an image
    async fn generate_image(&self, prompt: &str) -> Result<Option<GeneratedImage>>;
}
