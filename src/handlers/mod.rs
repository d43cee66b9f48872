//! HTTP 处理器模块

pub mod events;
pub mod health;
pub mod reports;
pub mod systems;
pub mod webhook;
