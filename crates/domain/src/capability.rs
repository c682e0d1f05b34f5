/// Advertised capabilities of a provider/model combination.
#[derive(Debug, Clone)]
pub struct LlmCapabilities {
    pub supports_tools: bool,
    pub supports_streaming: bool,
    pub context_window_tokens: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for LlmCapabilities {
    fn default() -> Self {
        Self {
            supports_tools: true,
            supports_streaming: true,
            context_window_tokens: None,
            max_output_tokens: None,
        }
    }
}
