//! Query orchestration: embed the question, retrieve, assemble, complete.
//!
//! A [`QueryEngine`] runs one question at a time through
//! `Idle -> Embedding -> Retrieving -> Assembling -> Completing -> Done`,
//! dropping to `Failed` from whichever step goes wrong. The states visited
//! by the last run are kept for inspection.

use crate::embeddings::EmbeddingProvider;
use crate::types::Answer;
use crate::vector_index::VectorIndex;
use insight_core::{AppError, AppResult};
use insight_llm::{LlmClient, LlmRequest};
use insight_prompt::{build_prompt, GroundingTemplate};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Step of the query pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryState {
    Idle,
    Embedding,
    Retrieving,
    Assembling,
    Completing,
    Done,
    Failed,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Assembling => "assembling",
            Self::Completing => "completing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tunables for a query run.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    /// Number of chunks retrieved per question
    pub top_k: usize,

    /// Completion model identifier
    pub model: String,

    pub temperature: Option<f32>,

    /// Bound on the question embedding call
    pub embedding_timeout: Duration,

    /// Bound on the whole completion call, retries included
    pub completion_timeout: Duration,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            top_k: 2,
            model: "llama3".to_string(),
            temperature: None,
            embedding_timeout: Duration::from_secs(30),
            completion_timeout: Duration::from_secs(120),
        }
    }
}

/// Everything a query needs, passed explicitly.
pub struct QueryContext {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<VectorIndex>,
    pub llm: Arc<dyn LlmClient>,
    pub template: GroundingTemplate,
    pub settings: QuerySettings,
}

impl QueryContext {
    /// Bundle the collaborators, refusing an index built by another embedder.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        llm: Arc<dyn LlmClient>,
        template: GroundingTemplate,
        settings: QuerySettings,
    ) -> AppResult<Self> {
        index.ensure_compatible(&embedder.fingerprint())?;

        Ok(Self {
            embedder,
            index,
            llm,
            template,
            settings,
        })
    }
}

/// Runs questions through the retrieval-augmented pipeline.
pub struct QueryEngine {
    context: QueryContext,
    trail: Vec<QueryState>,
}

impl QueryEngine {
    pub fn new(context: QueryContext) -> Self {
        Self {
            context,
            trail: vec![QueryState::Idle],
        }
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// State reached by the last run.
    pub fn state(&self) -> QueryState {
        self.trail.last().copied().unwrap_or(QueryState::Idle)
    }

    /// States visited by the last run, starting with `Idle`.
    pub fn trail(&self) -> &[QueryState] {
        &self.trail
    }

    /// Answer `question` from the index.
    ///
    /// Blank questions are rejected before the embedder is called. Every
    /// other failure leaves the engine in [`QueryState::Failed`] with the
    /// underlying error returned.
    pub async fn ask(&mut self, question: &str) -> AppResult<Answer> {
        self.trail.clear();
        self.trail.push(QueryState::Idle);

        match self.run(question).await {
            Ok(answer) => {
                self.transition(QueryState::Done);
                Ok(answer)
            }
            Err(err) => {
                tracing::warn!(state = %self.state(), "Query failed: {}", err);
                self.transition(QueryState::Failed);
                Err(err)
            }
        }
    }

    async fn run(&mut self, question: &str) -> AppResult<Answer> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidQuery("question is empty".to_string()));
        }

        let embedder = Arc::clone(&self.context.embedder);
        let index = Arc::clone(&self.context.index);
        let llm = Arc::clone(&self.context.llm);
        let settings = self.context.settings.clone();

        self.transition(QueryState::Embedding);
        let query_vector = with_timeout(settings.embedding_timeout, embedder.embed(question))
            .await
            .map_err(|elapsed| {
                AppError::Embedding(format!("question embedding timed out after {}", elapsed))
            })??;

        self.transition(QueryState::Retrieving);
        let hits = index.search(&query_vector, settings.top_k)?;
        tracing::info!(
            "Retrieved {} chunk(s) (closest distance: {:.3})",
            hits.len(),
            hits.first().map(|h| h.distance).unwrap_or(1.0)
        );

        self.transition(QueryState::Assembling);
        let passages: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        let prompt = build_prompt(&self.context.template, question, &passages)?;

        self.transition(QueryState::Completing);
        let mut request = LlmRequest::new(prompt.user, settings.model.as_str());
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = settings.temperature {
            request = request.with_temperature(temperature);
        }

        let response = with_timeout(settings.completion_timeout, llm.complete(&request))
            .await
            .map_err(|elapsed| {
                AppError::Completion(format!("completion timed out after {}", elapsed))
            })??;

        if response.content.trim().is_empty() {
            return Err(AppError::Completion(
                "completion service returned an empty response".to_string(),
            ));
        }

        tracing::debug!(
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Completion received"
        );

        Ok(Answer {
            text: response.content,
            sources: hits,
        })
    }

    fn transition(&mut self, next: QueryState) {
        tracing::debug!(from = %self.state(), to = %next, "Query state transition");
        self.trail.push(next);
    }
}

/// Await `future` for at most `limit`; the error carries a readable duration.
async fn with_timeout<F: Future>(limit: Duration, future: F) -> Result<F::Output, String> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| format!("{:.1}s", limit.as_secs_f64()))
}
