//! Prompt types for the grounding template system.

use serde::{Deserialize, Serialize};

/// A grounding template definition loaded from YAML.
///
/// The template must reference both the `{{context}}` and `{{question}}`
/// slots; nothing else is substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Optional system message sent alongside the rendered template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

fn default_api_version() -> String {
    "1.0".to_string()
}

/// A fully assembled grounding prompt ready for the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// Rendered prompt text
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source template ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Number of retrieved passages placed in the context slot
    #[serde(rename = "contextPassages")]
    pub context_passages: usize,

    /// Length of the context slot in characters
    #[serde(rename = "contextChars")]
    pub context_chars: usize,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        context_passages: usize,
        context_chars: usize,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                context_passages,
                context_chars,
            },
        }
    }
}
