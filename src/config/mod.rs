//! Configuration module for vidrag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, KnowledgeBaseSettings, PromptSettings, RagSettings,
    SegmenterSettings, ServerSettings, Settings, TranscriptSettings,
};
