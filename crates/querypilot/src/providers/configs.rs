pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
pub const ANTHROPIC_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl AnthropicProviderConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            host: ANTHROPIC_HOST.to_string(),
            api_key,
            model: ANTHROPIC_MODEL.to_string(),
            max_tokens: ANTHROPIC_MAX_TOKENS,
            temperature: None,
        }
    }
}
