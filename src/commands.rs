//! # Commands Module / 命令模块
//!
//! This module contains the implementations of the CLI subcommands,
//! including the container run pipeline and the plan initialization wizard.
//!
//! 此模块包含 CLI 子命令的实现，
//! 包括容器运行流水线和计划初始化向导。

pub mod init;
pub mod run;
