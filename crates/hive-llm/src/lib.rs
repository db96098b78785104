//! Generation capability: provider chat clients, retries, and the tool loop.

pub mod generator;
pub mod providers;
pub mod retry;

use std::sync::Arc;

use hive_core::descriptor::Provider;
use hive_core::traits::LlmClient;

pub use generator::ChatGenerator;
pub use providers::anthropic::AnthropicClient;
pub use providers::openai::OpenAiClient;
pub use retry::RetryingClient;

use providers::presets::{get_preset, WireFormat};

/// Create the raw chat client for a provider.
pub fn create_client(provider: Provider) -> Arc<dyn LlmClient> {
    match get_preset(provider).wire_format {
        WireFormat::Anthropic => Arc::new(AnthropicClient::new()),
        WireFormat::OpenAiCompatible => Arc::new(OpenAiClient::new()),
    }
}
