//! Authentication module
//!
//! 两类凭据：系统令牌（x-api-key，推送日志）与主密钥（x-master-key，管理接口）。

pub mod api_key;
pub mod middleware;

pub use api_key::SystemTokenGenerator;
pub use middleware::{extract_api_key, master_key_middleware, verify_master_key};
