//! Completion service integration for Legal Insight.
//!
//! A provider-agnostic abstraction over text-completion services. The
//! query pipeline only ever sees [`LlmClient`], so tests substitute
//! deterministic stand-ins for the real model.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use insight_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What does Section 302 IPC say?", "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{client_from_settings, create_client};
pub use providers::OllamaClient;
pub use retry::RetryingClient;
