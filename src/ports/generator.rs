//! Narrative text generation port

use async_trait::async_trait;

/// 生成请求：系统角色提示与用户提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generator is not configured")]
    NotConfigured,

    #[error("generation transport error: {0}")]
    Transport(String),

    #[error("generation returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}
