pub mod anthropic;
pub mod openai;
pub mod presets;

use hive_core::HiveError;

/// Map a transport failure onto a request error the retry layer can classify.
pub(crate) fn request_error(e: reqwest::Error) -> HiveError {
    if e.is_timeout() {
        HiveError::LlmRequest(format!("timeout: {}", e))
    } else if e.is_connect() {
        HiveError::LlmRequest(format!("connection failed: {}", e))
    } else {
        HiveError::LlmRequest(e.to_string())
    }
}

/// Turn a non-success HTTP response into an error carrying status and body.
pub(crate) async fn status_error(response: reqwest::Response) -> HiveError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    HiveError::LlmRequest(format!("HTTP {}: {}", status, body))
}
