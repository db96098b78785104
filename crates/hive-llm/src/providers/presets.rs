use hive_core::Provider;

/// Request/response dialect spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `/v1/chat/completions` style.
    OpenAiCompatible,
    /// Anthropic Messages API.
    Anthropic,
}

/// Built-in endpoint and dialect for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPreset {
    pub default_base_url: &'static str,
    pub wire_format: WireFormat,
}

/// Look up the preset for a provider.
pub fn get_preset(provider: Provider) -> ProviderPreset {
    match provider {
        Provider::OpenAi => ProviderPreset {
            default_base_url: "https://api.openai.com/v1/chat/completions",
            wire_format: WireFormat::OpenAiCompatible,
        },
        Provider::Mistral => ProviderPreset {
            default_base_url: "https://api.mistral.ai/v1/chat/completions",
            wire_format: WireFormat::OpenAiCompatible,
        },
        Provider::Claude => ProviderPreset {
            default_base_url: "https://api.anthropic.com/v1/messages",
            wire_format: WireFormat::Anthropic,
        },
    }
}
