//! Completion client factory.
//!
//! Builds the completion client described by the application
//! configuration, including the optional retry hardening.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::retry::{describe_policy, RetryingClient};
use insight_core::config::LlmSettings;
use insight_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a completion client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier (currently only "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout` - Per-request timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL);
            let client = OllamaClient::with_timeout(base_url, timeout);
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!(
            "Unknown provider: {}. Supported: ollama",
            provider
        ))),
    }
}

/// Create the completion client described by `settings`, wrapped in a
/// retry policy when `completion_retries` is non-zero.
pub fn client_from_settings(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    let client = create_client(
        &settings.provider,
        Some(&settings.endpoint),
        Duration::from_secs(settings.timeout_secs),
    )?;

    tracing::debug!(
        provider = %settings.provider,
        endpoint = %settings.endpoint,
        "Completion client ready ({})",
        describe_policy(settings.completion_retries)
    );

    if settings.completion_retries == 0 {
        Ok(client)
    } else {
        Ok(Arc::new(RetryingClient::new(
            client,
            settings.completion_retries,
        )))
    }
}
