//! Log event domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 日志严重级别（入库时由分类器给出，之后不可变更）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_severity", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 常规、心跳、信息
    Normal,
    /// 警告、缓慢、可疑
    Attention,
    /// 失败、崩溃、异常
    Error,
    /// 成功、完成
    Success,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Normal,
        Severity::Attention,
        Severity::Error,
        Severity::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Attention => "attention",
            Severity::Error => "error",
            Severity::Success => "success",
        }
    }

    /// 按固定集合做成员判断，集合外的标签返回 None
    ///
    /// 兼容早期客户端使用的葡萄牙语标签（atenção/erro/sucesso）。
    pub fn from_label(label: &str) -> Option<Severity> {
        let cleaned = label
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        match cleaned.as_str() {
            "normal" | "info" => Some(Severity::Normal),
            "attention" | "warning" | "atenção" | "atencao" => Some(Severity::Attention),
            "error" | "erro" => Some(Severity::Error),
            "success" | "sucesso" => Some(Severity::Success),
            _ => None,
        }
    }

    /// 归一化分类器输出，集合外一律视为 normal
    pub fn normalize(label: &str) -> Severity {
        Severity::from_label(label).unwrap_or(Severity::Normal)
    }

    /// 是否需要触发告警与诊断报告
    pub fn triggers_report(&self) -> bool {
        matches!(self, Severity::Error | Severity::Attention)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 日志负载：纯文本或结构化对象
///
/// 结构化对象只在存储边界序列化为 JSON 文本，不做任何解释。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogPayload {
    Text(String),
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl LogPayload {
    /// 规范化为存储与过滤使用的文本
    pub fn canonical_text(&self) -> String {
        match self {
            LogPayload::Text(text) => text.clone(),
            LogPayload::Structured(map) => {
                serde_json::Value::Object(map.clone()).to_string()
            }
        }
    }

    /// 从存储文本还原：JSON 对象还原为结构化负载，其余视为文本
    pub fn from_stored(text: &str) -> LogPayload {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(map)) => LogPayload::Structured(map),
            _ => LogPayload::Text(text.to_string()),
        }
    }
}

/// 已入库的日志事件
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogEvent {
    pub id: i64,
    pub system_id: String,
    pub message: String,
    pub container: Option<String>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a classified event
#[derive(Debug, Clone)]
pub struct NewLogEvent {
    pub system_id: String,
    pub message: String,
    pub container: Option<String>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Ingestion request body
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub message: LogPayload,
    pub container: Option<String>,
    /// 客户端时间戳，缺省时使用入库时间
    pub created_at: Option<DateTime<Utc>>,
}

/// Event response with the payload restored to its original shape
#[derive(Debug, Serialize)]
pub struct LogEventResponse {
    pub id: i64,
    pub system_id: String,
    pub message: LogPayload,
    pub container: Option<String>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl From<LogEvent> for LogEventResponse {
    fn from(event: LogEvent) -> Self {
        Self {
            message: LogPayload::from_stored(&event.message),
            id: event.id,
            system_id: event.system_id,
            container: event.container,
            severity: event.severity,
            created_at: event.created_at,
        }
    }
}

/// Event list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListFilters {
    pub system_id: Option<String>,
    pub severity: Option<Severity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_membership() {
        assert_eq!(Severity::from_label("error"), Some(Severity::Error));
        assert_eq!(Severity::from_label("  Attention.\n"), Some(Severity::Attention));
        assert_eq!(Severity::from_label("erro"), Some(Severity::Error));
        assert_eq!(Severity::from_label("atenção"), Some(Severity::Attention));
        assert_eq!(Severity::from_label("sucesso"), Some(Severity::Success));
        assert_eq!(Severity::from_label("'normal'"), Some(Severity::Normal));
        assert_eq!(Severity::from_label("catastrophic"), None);
        assert_eq!(Severity::from_label("this is an error"), None);
    }

    #[test]
    fn test_severity_normalize_defaults_to_normal() {
        assert_eq!(Severity::normalize(""), Severity::Normal);
        assert_eq!(Severity::normalize("I think it is bad"), Severity::Normal);
        assert_eq!(Severity::normalize("SUCCESS"), Severity::Success);
    }

    #[test]
    fn test_triggers_report() {
        let triggering: Vec<_> = Severity::ALL
            .iter()
            .filter(|s| s.triggers_report())
            .collect();
        assert_eq!(triggering, vec![&Severity::Attention, &Severity::Error]);
    }

    #[test]
    fn test_payload_deserialize_text_and_structured() {
        let text: LogPayload = serde_json::from_value(json!("disk full")).unwrap();
        assert_eq!(text, LogPayload::Text("disk full".to_string()));

        let structured: LogPayload =
            serde_json::from_value(json!({"code": 500, "path": "/api"})).unwrap();
        assert!(matches!(structured, LogPayload::Structured(_)));

        assert!(serde_json::from_value::<LogPayload>(json!(42)).is_err());
    }

    #[test]
    fn test_payload_canonical_text() {
        let structured: LogPayload = serde_json::from_value(json!({"status": 500})).unwrap();
        assert_eq!(structured.canonical_text(), r#"{"status":500}"#);

        let text = LogPayload::Text("   ".to_string());
        assert_eq!(text.canonical_text(), "   ");
    }

    #[test]
    fn test_payload_from_stored() {
        assert!(matches!(
            LogPayload::from_stored(r#"{"status":500}"#),
            LogPayload::Structured(_)
        ));
        assert_eq!(
            LogPayload::from_stored("[1,2]"),
            LogPayload::Text("[1,2]".to_string())
        );
        assert_eq!(
            LogPayload::from_stored("plain"),
            LogPayload::Text("plain".to_string())
        );
    }
}
