//! Grounding prompt assembly.
//!
//! Retrieved passages go into the `context` slot in retrieval order, the
//! question goes verbatim into the `question` slot. Nothing is truncated.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use insight_core::{AppError, AppResult};
use std::collections::HashMap;

/// Identifier of the built-in template.
pub const DEFAULT_TEMPLATE_ID: &str = "legal.default";

/// Separator placed between passages in the context slot.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Built-in grounding template for Indian statute lookups.
pub const DEFAULT_TEMPLATE: &str = r#"Use the following pieces of information to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.

IMPORTANT: You are an expert Indian Lawyer.
1. You MUST cite the specific "Section" numbers (e.g., Section 302 IPC, Section 376) if they are mentioned in the context.
2. Do not give generic advice. Stick strictly to the provided legal text.

Context: {{context}}
Question: {{question}}

Only return the helpful answer below and nothing else.
Helpful answer:
"#;

const TEMPLATE_NAME: &str = "grounding";

/// A validated grounding template.
#[derive(Debug, Clone)]
pub struct GroundingTemplate {
    id: String,
    system: Option<String>,
    template: String,
}

impl GroundingTemplate {
    /// Create a template after checking that it compiles and references
    /// both slots.
    pub fn new(id: impl Into<String>, template: impl Into<String>) -> AppResult<Self> {
        let id = id.into();
        let template = template.into();

        for slot in ["context", "question"] {
            if !references_slot(&template, slot) {
                return Err(AppError::Prompt(format!(
                    "Template '{}' does not reference the {{{{{}}}}} slot",
                    id, slot
                )));
            }
        }

        registry(&template)?;

        Ok(Self {
            id,
            system: None,
            template,
        })
    }

    /// Attach a system message sent alongside the rendered prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Build a template from a loaded YAML definition.
    pub fn from_definition(definition: &PromptDefinition) -> AppResult<Self> {
        let template = Self::new(definition.id.clone(), definition.template.clone())?;
        Ok(match &definition.system {
            Some(system) => template.with_system(system.clone()),
            None => template,
        })
    }

    /// Template identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw template source.
    pub fn source(&self) -> &str {
        &self.template
    }
}

impl Default for GroundingTemplate {
    fn default() -> Self {
        Self {
            id: DEFAULT_TEMPLATE_ID.to_string(),
            system: None,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Assemble the grounding prompt for `question` from retrieved passages.
///
/// # Example
/// ```
/// use insight_prompt::{build_prompt, GroundingTemplate};
///
/// let template = GroundingTemplate::default();
/// let built = build_prompt(
///     &template,
///     "What is the punishment for murder?",
///     &["Section 302: punishment for murder"],
/// )
/// .unwrap();
/// assert!(built.user.contains("Section 302"));
/// ```
pub fn build_prompt<S: AsRef<str>>(
    template: &GroundingTemplate,
    question: &str,
    passages: &[S],
) -> AppResult<BuiltPrompt> {
    let context = passages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR);

    tracing::debug!(
        template = %template.id,
        passages = passages.len(),
        context_chars = context.chars().count(),
        "Assembling grounding prompt"
    );

    let mut variables = HashMap::new();
    variables.insert("context", context.as_str());
    variables.insert("question", question);

    let user = registry(&template.template)?
        .render(TEMPLATE_NAME, &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(BuiltPrompt::new(
        template.system.clone(),
        user,
        template.id.clone(),
        passages.len(),
        context.chars().count(),
    ))
}

/// Compile a template into a strict, non-escaping registry.
fn registry(template: &str) -> AppResult<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string(TEMPLATE_NAME, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    Ok(handlebars)
}

/// True if `template` contains a `{{slot}}` expression, allowing
/// whitespace, triple-stash and whitespace-control markers.
fn references_slot(template: &str, slot: &str) -> bool {
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return false;
        };
        let expr = after[..close]
            .trim_start_matches(['{', '~'])
            .trim_end_matches(['}', '~'])
            .trim();
        if expr == slot {
            return true;
        }
        rest = &after[close + 2..];
    }
    false
}
