//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Shard Runner,
//! including process execution, the container engine client, executable
//! lookup, file system operations, live log mirroring and i18n support.
//!
//! 此模块为 Shard Runner 提供基础设施服务，
//! 包括进程执行、容器引擎客户端、可执行文件查找、
//! 文件系统操作、实时日志镜像和国际化支持。

pub mod container;
pub mod fs;
pub mod logger;
pub mod lookup;
pub mod process;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
