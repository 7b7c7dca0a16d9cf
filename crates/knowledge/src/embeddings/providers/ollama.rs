//! Ollama embedding provider.
//!
//! Calls a local Ollama runtime (`POST /api/embeddings`). The default model,
//! `all-minilm`, is the Ollama packaging of MiniLM-L6-v2 and yields
//! 384-dimensional vectors.

use crate::embeddings::provider::{ensure_not_empty, EmbeddingProvider};
use crate::embeddings::EmbeddingConfig;
use async_trait::async_trait;
use insight_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local HTTP API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider. No request is made until the first embedding.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let timeout = config.timeout();
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            timeout,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        ensure_not_empty(text)?;

        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(self.describe_send_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Embedding(self.describe_send_error(&e))
            } else {
                AppError::Embedding(format!("Failed to parse Ollama response: {}", e))
            }
        })?;

        if body.embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(body.embedding)
    }

    fn describe_send_error(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!(
                "Ollama embedding request timed out after {}s",
                self.timeout.as_secs_f64()
            )
        } else if err.is_connect() {
            format!(
                "Could not connect to Ollama at {}. Ensure it is running and run: ollama pull {}",
                self.base_url, self.model
            )
        } else {
            format!("Failed to send request to Ollama: {}", err)
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed_single(text).await
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts", texts.len());

        // The embeddings endpoint takes one prompt per request
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_single(text).await?);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `count` canned HTTP responses on an ephemeral port.
    async fn serve(status: &'static str, body: String, count: usize, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for _ in 0..count {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    fn config(endpoint: String, dimensions: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions,
            endpoint,
            batch_size: 8,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_embed_success() {
        let url = serve("200 OK", r#"{"embedding":[0.1,0.2,0.3]}"#.to_string(), 1, Duration::ZERO).await;
        let provider = OllamaProvider::new(&config(url, 3)).unwrap();

        let embedding = provider.embed("Section 302").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order_and_count() {
        let url = serve("200 OK", r#"{"embedding":[1.0,0.0]}"#.to_string(), 3, Duration::ZERO).await;
        let provider = OllamaProvider::new(&config(url, 2)).unwrap();

        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
    }

    #[tokio::test]
    async fn test_wrong_dimensions_rejected() {
        let url = serve("200 OK", r#"{"embedding":[0.1,0.2]}"#.to_string(), 1, Duration::ZERO).await;
        let provider = OllamaProvider::new(&config(url, 384)).unwrap();

        let err = provider.embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
        assert!(err.to_string().contains("returned 2 dimensions, expected 384"));
    }

    #[tokio::test]
    async fn test_upstream_error_surfaced() {
        let url = serve(
            "404 Not Found",
            r#"{"error":"model \"all-minilm\" not found, try pulling it first"}"#.to_string(),
            1,
            Duration::ZERO,
        )
        .await;
        let provider = OllamaProvider::new(&config(url, 384)).unwrap();

        let err = provider.embed("text").await.unwrap_err();
        assert!(err.to_string().contains("try pulling it first"));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_request() {
        let provider = OllamaProvider::new(&config("http://127.0.0.1:9".to_string(), 384)).unwrap();
        let err = provider.embed("").await.unwrap_err();
        assert!(err.to_string().contains("empty text"));
    }

    #[tokio::test]
    async fn test_timeout_is_embedding_error() {
        let url = serve("200 OK", r#"{"embedding":[0.1]}"#.to_string(), 1, Duration::from_secs(5)).await;
        let cfg = config(url, 1);
        let provider = OllamaProvider {
            timeout: Duration::from_millis(200),
            client: Client::builder()
                .timeout(Duration::from_millis(200))
                .build()
                .unwrap(),
            ..OllamaProvider::new(&cfg).unwrap()
        };

        let err = provider.embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_retryable());
    }
}
