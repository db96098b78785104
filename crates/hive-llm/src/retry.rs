use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use hive_core::config::{ModelConfig, RetryConfig};
use hive_core::error::{HiveError, Result};
use hive_core::traits::LlmClient;
use hive_core::types::*;

/// An LLM client that retries transient failures with exponential backoff.
pub struct RetryingClient {
    inner: Arc<dyn LlmClient>,
    retry_config: RetryConfig,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn LlmClient>, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

pub fn is_retryable(e: &HiveError) -> bool {
    match e {
        HiveError::LlmRequest(msg) => {
            msg.contains("429")
                || msg.contains("500")
                || msg.contains("502")
                || msg.contains("503")
                || msg.contains("504")
                || msg.contains("timeout")
                || msg.contains("connection")
        }
        _ => false,
    }
}

fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = config
        .initial_backoff_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_backoff_ms);
    // Jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl LlmClient for RetryingClient {
    fn chat(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<ChatResponse>> {
        let config = config.clone();
        let tools = tools.to_vec();

        Box::pin(async move {
            let max_retries = self.retry_config.max_retries;
            let mut attempt = 0;

            loop {
                match self.inner.chat(&config, messages.clone(), &tools).await {
                    Ok(resp) => return Ok(resp),
                    Err(e) if is_retryable(&e) && attempt < max_retries => {
                        let backoff = calculate_backoff(attempt, &self.retry_config);
                        warn!(
                            attempt = attempt + 1,
                            max_retries,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            "Retrying LLM request"
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::Provider;
    use hive_test_utils::MockLlmClient;

    fn model() -> ModelConfig {
        ModelConfig {
            provider: Provider::OpenAi,
            model_id: "gpt-test".into(),
            api_key: None,
            base_url: None,
            max_tokens: 128,
            temperature: None,
            top_p: None,
        }
    }

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 10,
            max_backoff_ms: 100,
        }
    }

    #[test]
    fn classifies_errors() {
        assert!(is_retryable(&HiveError::LlmRequest("HTTP 429 Too Many Requests: slow down".into())));
        assert!(is_retryable(&HiveError::LlmRequest("timeout: deadline".into())));
        assert!(!is_retryable(&HiveError::LlmRequest("HTTP 401 Unauthorized: bad key".into())));
        assert!(!is_retryable(&HiveError::LlmParse("HTTP 500".into())));
    }

    #[test]
    fn backoff_is_capped_with_jitter() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        };
        let first = calculate_backoff(0, &config).as_millis();
        assert!((800..=1200).contains(&first));
        let late = calculate_backoff(20, &config).as_millis();
        assert!((24_000..=36_000).contains(&late));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error(HiveError::LlmRequest("HTTP 503 Service Unavailable".into()));
        mock.push_error(HiveError::LlmRequest("connection reset".into()));
        mock.push_text("finally");

        let client = RetryingClient::new(mock.clone(), fast_retries(3));
        let resp = client.chat(&model(), vec![ChatMessage::user("hi")], &[]).await.unwrap();
        assert_eq!(resp.message.text(), "finally");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let mock = Arc::new(MockLlmClient::new());
        for _ in 0..3 {
            mock.push_error(HiveError::LlmRequest("HTTP 500 Internal Server Error".into()));
        }

        let client = RetryingClient::new(mock.clone(), fast_retries(2));
        let err = client.chat(&model(), vec![], &[]).await.unwrap_err();
        assert!(matches!(err, HiveError::LlmRequest(_)));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_fatal_errors() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error(HiveError::LlmRequest("HTTP 400 Bad Request".into()));

        let client = RetryingClient::new(mock.clone(), fast_retries(3));
        assert!(client.chat(&model(), vec![], &[]).await.is_err());
        assert_eq!(mock.call_count(), 1);
    }
}
