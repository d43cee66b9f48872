//! 外部能力端口
//!
//! 分类、文本生成与通知三类能力均以 trait 对象注入服务层，
//! 具体实现位于 `clients` 模块，测试使用桩实现。

pub mod classifier;
pub mod generator;
pub mod notifier;

pub use classifier::{Classifier, ClassifierError};
pub use generator::{GenerationError, Prompt, TextGenerator};
pub use notifier::{colors, Destination, Embed, EmbedField, NotifyError, NotifyMessage, Notifier};
