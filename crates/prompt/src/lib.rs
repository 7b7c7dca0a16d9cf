//! Grounding prompts for Legal Insight.
//!
//! This crate provides:
//! - The built-in "expert Indian lawyer" grounding template
//! - Handlebars rendering of the `context` and `question` slots
//! - YAML-based custom template definitions

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, GroundingTemplate, DEFAULT_TEMPLATE, DEFAULT_TEMPLATE_ID};
pub use loader::{list_prompts, load_prompt, load_prompt_file, load_template};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
