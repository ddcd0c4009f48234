//! AI caption generation - Gemini API
//!
//! This module provides:
//! - The `CaptionGenerator` seam used by the post service
//! - A Gemini `generateContent` client that returns normalized captions

mod client;
mod types;

pub use client::{GeminiClient, GeminiClientBuilder};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part, UsageMetadata,
};

use async_trait::async_trait;

use crate::caption::{Language, Vibe};
use crate::error::Result;
use crate::media::ImageUpload;

/// Per-request caption options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionOptions {
    pub vibe: Vibe,
    pub language: Language,
    pub extra_prompt: Option<String>,
}

impl CaptionOptions {
    pub fn new(vibe: Vibe) -> Self {
        Self {
            vibe,
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_extra_prompt(mut self, extra: impl Into<String>) -> Self {
        self.extra_prompt = Some(extra.into());
        self
    }
}

/// Produces a normalized caption for an image
#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    async fn generate_caption(&self, image: &ImageUpload, opts: &CaptionOptions)
    -> Result<String>;
}
