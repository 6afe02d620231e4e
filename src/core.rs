//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Shard Runner,
//! including data models, configuration, test discovery, command
//! planning and the container build orchestration logic.
//!
//! 此模块包含 Shard Runner 的核心功能，
//! 包括数据模型、配置、测试发现、命令规划和容器构建编排逻辑。

pub mod config;
pub mod discovery;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod source;

// Re-exports
pub use config::BuildDescriptor;
pub use models::RunReport;
pub use orchestrator::BuildOrchestrator;
