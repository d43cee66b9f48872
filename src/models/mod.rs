//! 数据模型模块
//! 被监控系统、日志事件、过滤规则、诊断报告与分析进度

pub mod analysis;
pub mod event;
pub mod filter;
pub mod report;
pub mod system;
