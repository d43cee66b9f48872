//! Severity classification port

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier is not configured")]
    NotConfigured,

    #[error("classifier transport error: {0}")]
    Transport(String),

    #[error("classifier returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// 将日志文本映射为严重级别标签
///
/// 返回原始标签，由调用方负责归一化；失败时调用方降级为 normal。
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<String, ClassifierError>;
}
