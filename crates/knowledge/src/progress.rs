//! Structured progress reporting for ingestion.
//!
//! Emits one event per stage transition plus incremental events while
//! embedding, so the CLI can show numbered progress lines.

use insight_core::IngestStage;
use std::sync::Arc;
use std::time::Instant;

/// Number of ingestion stages.
pub const STAGE_COUNT: usize = 5;

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Stage the event belongs to
    pub stage: IngestStage,

    /// Current progress (pages loaded, chunks embedded, ...)
    pub current: u64,

    /// Total expected work (if known)
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    /// Human-readable message
    pub message: String,

    /// Elapsed time since the run started
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        stage: IngestStage,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage =
            total.map(|t| if t > 0 { (current as f64 / t as f64) * 100.0 } else { 0.0 });

        Self {
            stage,
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a numbered user-facing line, e.g. `[3/5] embedding 32/120 (27%) - model=all-minilm`.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!(" {}/{}", self.current, total),
            None if self.current > 0 => format!(" {}", self.current),
            None => String::new(),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!(
            "[{}/{}] {}{}{} - {}",
            stage_number(self.stage),
            STAGE_COUNT,
            self.stage,
            progress,
            pct,
            self.message
        )
    }
}

fn stage_number(stage: IngestStage) -> usize {
    match stage {
        IngestStage::Loading => 1,
        IngestStage::Splitting => 2,
        IngestStage::Embedding => 3,
        IngestStage::Building => 4,
        IngestStage::Persisting => 5,
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress reporter that emits events through a callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Create a no-op reporter (no events emitted).
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let event = event.with_elapsed(elapsed);

        tracing::debug!(
            stage = %event.stage,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = elapsed,
            "Progress event"
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn loading(&self, source: &str) {
        self.emit(ProgressEvent::new(
            IngestStage::Loading,
            0,
            None,
            format!("reading {}", source),
        ));
    }

    pub fn splitting(&self, pages: usize) {
        self.emit(ProgressEvent::new(
            IngestStage::Splitting,
            pages as u64,
            None,
            format!("{} page(s) loaded", pages),
        ));
    }

    pub fn embedding(&self, done: usize, total: usize, model: &str) {
        self.emit(ProgressEvent::new(
            IngestStage::Embedding,
            done as u64,
            Some(total as u64),
            format!("model={}", model),
        ));
    }

    pub fn building(&self, entries: usize) {
        self.emit(ProgressEvent::new(
            IngestStage::Building,
            entries as u64,
            None,
            "pairing chunks with vectors",
        ));
    }

    pub fn persisting(&self, location: &str) {
        self.emit(ProgressEvent::new(
            IngestStage::Persisting,
            0,
            None,
            format!("writing {}", location),
        ));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}
