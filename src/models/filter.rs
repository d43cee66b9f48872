//! Log filter rule models

use chrono::{DateTime, Utc};
use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use validator::Validate;

const REGEX_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// 按模式缓存已编译的正则，接入路径上不重复编译
static REGEX_CACHE: Lazy<Mutex<LruCache<String, Regex>>> =
    Lazy::new(|| Mutex::new(LruCache::new(REGEX_CACHE_CAPACITY)));

/// 取出（或编译并缓存）模式对应的正则；无法编译时返回 None 且不缓存
fn cached_regex(pattern: &str) -> Option<Regex> {
    let mut cache = REGEX_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(re) = cache.get(pattern) {
        return Some(re.clone());
    }
    let re = Regex::new(pattern).ok()?;
    cache.put(pattern.to_string(), re.clone());
    Some(re)
}

/// 匹配方式：默认纯子串包含（区分大小写），正则需显式选择
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "filter_match_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    #[default]
    Substring,
    Regex,
}

/// 过滤规则，命中的日志在分类与入库之前被丢弃
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FilterRule {
    pub id: i64,
    pub system_id: String,
    pub pattern: String,
    pub match_kind: MatchKind,
    pub created_at: DateTime<Utc>,
}

impl FilterRule {
    /// 判断日志文本是否命中本规则
    pub fn matches(&self, text: &str) -> bool {
        match self.match_kind {
            MatchKind::Substring => text.contains(self.pattern.as_str()),
            // 无法编译的正则不命中任何日志（创建时已校验）
            MatchKind::Regex => cached_regex(&self.pattern).is_some_and(|re| re.is_match(text)),
        }
    }
}

/// Create filter request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFilterRequest {
    #[validate(length(min = 1, max = 1000, message = "pattern must not be empty"))]
    pub pattern: String,
    #[serde(default)]
    pub match_kind: MatchKind,
}

/// Cleanup request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CleanupRequest {
    #[validate(length(min = 1, message = "pattern must not be empty"))]
    pub pattern: String,
}

/// 清理结果
#[derive(Debug, Clone, Serialize)]
pub struct CleanupSummary {
    pub system_id: String,
    pub pattern: String,
    pub cleaned_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, match_kind: MatchKind) -> FilterRule {
        FilterRule {
            id: 1,
            system_id: "pbpm-test".to_string(),
            pattern: pattern.to_string(),
            match_kind,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_substring_is_case_sensitive() {
        let heartbeat = rule("heartbeat", MatchKind::Substring);
        assert!(heartbeat.matches("heartbeat ok"));
        assert!(heartbeat.matches("worker-3 heartbeat"));
        assert!(!heartbeat.matches("Heartbeat ok"));
    }

    #[test]
    fn test_substring_treats_regex_metacharacters_literally() {
        let rule = rule("GET /health.*", MatchKind::Substring);
        assert!(!rule.matches("GET /healthz"));
        assert!(rule.matches("GET /health.* 200"));
    }

    #[test]
    fn test_regex_match_kind() {
        let rule = rule(r"^GET /health\S* 200$", MatchKind::Regex);
        assert!(rule.matches("GET /healthz 200"));
        assert!(!rule.matches("POST /healthz 200"));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let rule = rule("([unclosed", MatchKind::Regex);
        assert!(!rule.matches("([unclosed"));
        assert!(!REGEX_CACHE.lock().unwrap().contains("([unclosed"));
    }

    #[test]
    fn test_regex_compiled_once_and_reused() {
        let pattern = r"^worker-\d+ heartbeat$";
        let rule = rule(pattern, MatchKind::Regex);

        assert!(rule.matches("worker-7 heartbeat"));
        assert!(REGEX_CACHE.lock().unwrap().contains(pattern));

        // 缓存命中后结果不变
        assert!(rule.matches("worker-12 heartbeat"));
        assert!(!rule.matches("worker-x heartbeat"));
    }
}
