//! End-to-end retrieval tests: ingest a document, then ask questions of it.

use insight_core::{AppError, AppResult};
use insight_knowledge::embeddings::providers::TrigramProvider;
use insight_knowledge::{
    ingest, EmbeddingProvider, IngestOptions, ProgressReporter, QueryContext, QueryEngine,
    QuerySettings, QueryState, VectorIndex,
};
use insight_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use insight_prompt::GroundingTemplate;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PAGE_ONE: &str = "Section 299: culpable homicide. Whoever causes death by doing an act \
with the intention of causing death commits the offence of culpable homicide.";
const PAGE_TWO: &str = "Section 302: punishment for murder. Whoever commits murder shall be \
punished with death, or imprisonment for life, and shall also be liable to fine.";
const PAGE_THREE: &str = "Section 378: theft. Whoever, intending to take dishonestly any movable \
property out of the possession of any person without that person's consent, moves that \
property, is said to commit theft.";

/// Answers from the prompt: cites Section 302 only when the context holds it.
struct ContextCitingLlm {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LlmClient for ContextCitingLlm {
    fn provider_name(&self) -> &str {
        "context-citing"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = if request.prompt.contains("Section 302") {
            "Under Section 302 IPC, murder is punished with death or imprisonment for life, and a fine."
        } else {
            "I don't know."
        };
        Ok(LlmResponse {
            content: content.to_string(),
            model: request.model.clone(),
            usage: LlmUsage::new(100, 20),
        })
    }
}

/// Counts calls and delegates to the trigram provider.
#[derive(Debug)]
struct CountingEmbedder {
    inner: TrigramProvider,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

fn write_code_book(dir: &Path) -> PathBuf {
    let path = dir.join("ipc.txt");
    let text = format!("{}\u{c}{}\u{c}{}\u{c}", PAGE_ONE, PAGE_TWO, PAGE_THREE);
    std::fs::write(&path, text).unwrap();
    path
}

fn options(source: PathBuf, location: PathBuf) -> IngestOptions {
    IngestOptions {
        source,
        location,
        chunk_size: 1000,
        chunk_overlap: 200,
        batch_size: 2,
    }
}

struct Harness {
    engine: QueryEngine,
    embedder: Arc<CountingEmbedder>,
    llm: Arc<ContextCitingLlm>,
}

async fn ingest_and_open(temp: &TempDir) -> Harness {
    let source = write_code_book(temp.path());
    let location = temp.path().join("vectorstore/db_index");
    let embedder = Arc::new(CountingEmbedder {
        inner: TrigramProvider::new(384),
        calls: AtomicUsize::new(0),
    });

    let stats = ingest(
        &options(source, location.clone()),
        embedder.as_ref(),
        &ProgressReporter::noop(),
    )
    .await
    .unwrap();
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.chunks, 3);
    embedder.calls.store(0, Ordering::SeqCst);

    let index = Arc::new(VectorIndex::load(&location).unwrap());
    let llm = Arc::new(ContextCitingLlm {
        calls: AtomicUsize::new(0),
    });
    let context = QueryContext::new(
        embedder.clone(),
        index,
        llm.clone(),
        GroundingTemplate::default(),
        QuerySettings::default(),
    )
    .unwrap();

    Harness {
        engine: QueryEngine::new(context),
        embedder,
        llm,
    }
}

#[tokio::test]
async fn murder_question_retrieves_section_302() {
    let temp = TempDir::new().unwrap();
    let mut harness = ingest_and_open(&temp).await;

    let answer = harness
        .engine
        .ask("What is the punishment for murder?")
        .await
        .unwrap();

    let top = &answer.sources[0];
    assert_eq!(top.chunk.page, 2);
    assert!(top.chunk.text.contains("Section 302: punishment for murder"));
    assert!(answer.text.contains("Section 302"));
    assert!(answer
        .sources
        .windows(2)
        .all(|pair| pair[0].distance <= pair[1].distance));
    assert_eq!(harness.engine.state(), QueryState::Done);
}

#[tokio::test]
async fn blank_question_is_rejected_without_embedding() {
    let temp = TempDir::new().unwrap();
    let mut harness = ingest_and_open(&temp).await;

    let err = harness.engine.ask("   ").await.unwrap_err();

    assert!(matches!(err, AppError::InvalidQuery(_)));
    assert_eq!(harness.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reloaded_index_answers_identically() {
    let temp = TempDir::new().unwrap();
    let mut first = ingest_and_open(&temp).await;
    let location = temp.path().join("vectorstore/db_index");

    let reloaded = Arc::new(VectorIndex::load(&location).unwrap());
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(384));
    let query = embedder.embed("dishonestly moving property").await.unwrap();

    let before = first.engine.context().index.search(&query, 3).unwrap();
    let after = reloaded.search(&query, 3).unwrap();
    assert_eq!(before, after);
    assert_eq!(after[0].chunk.page, 3);

    assert!(first.engine.ask("What is theft?").await.is_ok());
}

#[tokio::test]
async fn querying_before_ingestion_points_at_ingest() {
    let temp = TempDir::new().unwrap();

    let err = VectorIndex::load(&temp.path().join("vectorstore/db_index")).unwrap_err();

    assert!(matches!(err, AppError::IndexNotFound(_)));
    assert!(err.hint().unwrap().contains("insight ingest"));
}

#[tokio::test]
async fn index_from_other_embedder_fails_loudly() {
    let temp = TempDir::new().unwrap();
    let _ = ingest_and_open(&temp).await;
    let index = Arc::new(VectorIndex::load(&temp.path().join("vectorstore/db_index")).unwrap());

    let result = QueryContext::new(
        Arc::new(TrigramProvider::new(128)),
        index,
        Arc::new(ContextCitingLlm {
            calls: AtomicUsize::new(0),
        }),
        GroundingTemplate::default(),
        QuerySettings::default(),
    );

    assert!(matches!(
        result,
        Err(AppError::DimensionMismatch {
            expected: 384,
            actual: 128
        })
    ));
}
