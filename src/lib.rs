//! 日志哨兵服务库
//! 日志接入、严重级别分类、噪声过滤、告警与诊断报告

pub mod auth;
pub mod clients;
pub mod concurrency;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod ports;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
