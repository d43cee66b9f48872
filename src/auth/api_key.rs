//! System token generation
//!
//! 系统 ID 同时作为日志推送时 `x-api-key` 头里的令牌。

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

const TOKEN_PREFIX: &str = "pbpm-";
const TOKEN_RANDOM_LEN: usize = 64;

/// System token generator
pub struct SystemTokenGenerator;

impl SystemTokenGenerator {
    /// Generate a new system token
    /// Format: pbpm-<64-char-alphanumeric>
    pub fn generate() -> String {
        let random: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_RANDOM_LEN)
            .map(char::from)
            .collect();

        format!("{}{}", TOKEN_PREFIX, random)
    }

    /// 格式检查：格式不符的令牌无需查库
    pub fn is_well_formed(token: &str) -> bool {
        token
            .strip_prefix(TOKEN_PREFIX)
            .is_some_and(|rest| {
                rest.len() == TOKEN_RANDOM_LEN && rest.chars().all(|c| c.is_ascii_alphanumeric())
            })
    }
}
