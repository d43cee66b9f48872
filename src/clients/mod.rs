//! 外部服务客户端（reqwest）

pub mod discord;
pub mod openai;

pub use discord::DiscordNotifier;
pub use openai::OpenAiClient;
