//! Report generation progress

use serde::{Deserialize, Serialize};

/// 报告生成进度，仅作为轮询提示，不代表报告是否存在
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Analyzing,
    Completed,
}
