//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for file system operations,
//! such as creating the per-run build directory and sanitizing
//! user-supplied names for container and image identifiers.
//!
//! 此模块提供文件系统操作的实用功能，
//! 如创建每次运行的构建目录，以及清理用户提供的名称
//! 以用于容器和镜像标识符。

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::infra::t;

/// Creates the per-run build directory under the current working directory.
/// The generated recipe and any other build inputs land here before the
/// image build starts. The returned guard deletes the tree on drop.
///
/// 在当前工作目录下创建每次运行的构建目录。
/// 生成的配方和任何其他构建输入在镜像构建开始之前写入此处。
/// 返回的 guard 在 drop 时删除该目录树。
pub fn create_build_dir(label: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("{}-build-", label))
        .tempdir_in(".")
        .with_context(|| t!("fs.create_build_dir_failed").to_string())
}

/// Creates `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| t!("fs.create_dir_failed", path = dir.display()).to_string())
}

/// Replaces every character outside `[A-Za-z0-9_.-]` with an underscore.
/// Container and image names only accept this charset, so module paths
/// like `itests/qtest` become `itests_qtest`.
///
/// 将 `[A-Za-z0-9_.-]` 之外的每个字符替换为下划线。
/// 容器和镜像名称只接受此字符集，
/// 因此像 `itests/qtest` 这样的模块路径会变成 `itests_qtest`。
pub fn sanitize_token(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
