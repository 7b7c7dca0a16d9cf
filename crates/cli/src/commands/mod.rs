//! Command handlers for the Legal Insight CLI.
//!
//! This module organizes all CLI commands into separate submodules and
//! holds the wiring they share: resolving the index location and
//! assembling a query engine from configuration.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod inspect;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use inspect::InspectCommand;

use insight_core::{config::AppConfig, AppError, AppResult};
use insight_knowledge::{
    create_provider, EmbeddingConfig, QueryContext, QueryEngine, QuerySettings, VectorIndex,
};
use insight_prompt::{load_prompt, load_template, GroundingTemplate};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Index directory from `--index`, falling back to the configured one.
pub(crate) fn index_location(config: &AppConfig, index: Option<&Path>) -> PathBuf {
    match index {
        Some(path) => config.resolve(path),
        None => config.index_location(),
    }
}

/// Per-query tunables derived from configuration.
///
/// The completion bound covers every attempt of the retry policy.
pub(crate) fn query_settings(config: &AppConfig, top_k: Option<usize>) -> QuerySettings {
    QuerySettings {
        top_k: top_k.unwrap_or(config.retrieval.top_k),
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        embedding_timeout: config.embedding_timeout(),
        completion_timeout: config.completion_timeout() * (config.llm.completion_retries + 1),
    }
}

/// How a command picks its grounding template.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TemplateChoice<'a> {
    /// YAML file path (`--template`)
    pub path: Option<&'a Path>,

    /// Template ID under `.insight/prompts` (`--template-id`)
    pub id: Option<&'a str>,
}

/// Grounding template from `--template`, `--template-id`, the configured
/// file, or the built-in one, in that order.
pub(crate) fn grounding_template(
    config: &AppConfig,
    choice: TemplateChoice<'_>,
) -> AppResult<GroundingTemplate> {
    if let Some(id) = choice.id.filter(|_| choice.path.is_none()) {
        tracing::debug!("Using grounding template '{}' from the workspace", id);
        let definition = load_prompt(&config.workspace, id)?;
        return GroundingTemplate::from_definition(&definition);
    }

    let path = choice
        .path
        .map(Path::to_path_buf)
        .or_else(|| config.retrieval.template_file.clone());

    match path {
        Some(path) => {
            let path = config.resolve(&path);
            tracing::debug!("Using grounding template from {:?}", path);
            load_template(&path)
        }
        None => Ok(GroundingTemplate::default()),
    }
}

/// Load the index and wire up a query engine around it.
pub(crate) fn open_engine(
    config: &AppConfig,
    index: Option<&Path>,
    top_k: Option<usize>,
    template: TemplateChoice<'_>,
) -> AppResult<QueryEngine> {
    if top_k == Some(0) {
        return Err(AppError::InvalidQuery("k must be at least 1".to_string()));
    }

    let location = index_location(config, index);
    let index = Arc::new(VectorIndex::load(&location)?);
    tracing::info!(
        "Loaded index at {:?} ({} entries, {})",
        location,
        index.len(),
        index.metadata().embedder
    );

    let embedder = create_provider(&EmbeddingConfig::from(&config.embedding))?;
    let llm = insight_llm::client_from_settings(&config.llm)?;

    let context = QueryContext::new(
        embedder,
        index,
        llm,
        grounding_template(config, template)?,
        query_settings(config, top_k),
    )?;

    Ok(QueryEngine::new(context))
}

/// Print an error and its hint to stderr.
pub(crate) fn report_error(err: &AppError) {
    eprintln!("Error: {}", err);
    if let Some(hint) = err.hint() {
        eprintln!("Hint: {}", hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            workspace: dir.to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_index_location_override_resolves_against_workspace() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());

        assert_eq!(
            index_location(&config, None),
            temp.path().join("vectorstore").join("db_index")
        );
        assert_eq!(
            index_location(&config, Some(Path::new("store/bns"))),
            temp.path().join("store/bns")
        );
    }

    #[test]
    fn test_completion_timeout_covers_retries() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(temp.path());
        config.llm.timeout_secs = 10;
        config.llm.completion_retries = 2;

        let settings = query_settings(&config, Some(5));
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.completion_timeout, Duration::from_secs(30));
        assert_eq!(settings.model, "llama3");
    }

    #[test]
    fn test_default_template_when_none_configured() {
        let temp = TempDir::new().unwrap();
        let template =
            grounding_template(&config_in(temp.path()), TemplateChoice::default()).unwrap();
        assert_eq!(template.id(), insight_prompt::DEFAULT_TEMPLATE_ID);
    }

    #[test]
    fn test_template_file_is_loaded() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("terse.yaml"),
            "id: legal.terse\ntitle: Terse\ntemplate: \"{{context}} / {{question}}\"\n",
        )
        .unwrap();

        let choice = TemplateChoice {
            path: Some(Path::new("terse.yaml")),
            id: None,
        };
        let template = grounding_template(&config_in(temp.path()), choice).unwrap();
        assert_eq!(template.id(), "legal.terse");
    }

    #[test]
    fn test_template_id_is_loaded_from_workspace_prompts() {
        let temp = TempDir::new().unwrap();
        let prompts = temp.path().join(".insight").join("prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(
            prompts.join("ipc.strict.yml"),
            "id: ipc.strict\ntitle: Strict IPC\ntemplate: \"Only use: {{context}}\\nQ: {{question}}\"\n",
        )
        .unwrap();

        let choice = TemplateChoice {
            path: None,
            id: Some("ipc.strict"),
        };
        let template = grounding_template(&config_in(temp.path()), choice).unwrap();
        assert_eq!(template.id(), "ipc.strict");
    }

    #[test]
    fn test_unknown_template_id_fails() {
        let temp = TempDir::new().unwrap();
        let choice = TemplateChoice {
            path: None,
            id: Some("missing"),
        };
        assert!(grounding_template(&config_in(temp.path()), choice).is_err());
    }

    #[test]
    fn test_missing_index_reported_before_services_are_built() {
        let temp = TempDir::new().unwrap();
        let err = open_engine(&config_in(temp.path()), None, None, TemplateChoice::default())
            .err()
            .unwrap();
        assert!(matches!(err, AppError::IndexNotFound(_)));
        assert!(err.hint().unwrap().contains("insight ingest"));
    }
}
