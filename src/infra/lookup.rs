//! # Executable Lookup Module / 可执行文件查找模块
//!
//! Resolves tool names (the container engine binary, typically) to absolute
//! paths by walking the `PATH` environment variable, caching each hit so the
//! search happens once per process.
//!
//! 通过遍历 `PATH` 环境变量将工具名称（通常是容器引擎二进制文件）
//! 解析为绝对路径，并缓存每次命中，因此每个进程只搜索一次。

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::infra::t;

/// PATH-based executable resolver with an internal cache.
/// 基于 PATH 的可执行文件解析器，带有内部缓存。
pub struct ExecutableLookup {
    cache: Mutex<HashMap<String, PathBuf>>,
}

impl ExecutableLookup {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves `name` to an absolute path.
    ///
    /// A name containing a path separator is checked as-is rather than
    /// searched, so settings may point at a binary outside `PATH`.
    ///
    /// 将 `name` 解析为绝对路径。
    /// 包含路径分隔符的名称将按原样检查而不是搜索，
    /// 因此设置可以指向 `PATH` 之外的二进制文件。
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if let Some(found) = self
            .cache
            .lock()
            .expect("lookup cache lock poisoned")
            .get(name)
        {
            return Ok(found.clone());
        }

        // Explicit paths bypass the PATH walk.
        if Path::new(name).components().count() > 1 {
            let direct = PathBuf::from(name);
            if direct.is_file() {
                return Ok(self.remember(name, direct));
            }
            bail!(t!("lookup.not_found", name = name));
        }

        let path_var = env::var_os("PATH").unwrap_or_default();
        for dir in env::split_paths(&path_var) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(self.remember(name, candidate));
            }
        }

        bail!(t!("lookup.not_found", name = name))
    }

    fn remember(&self, name: &str, path: PathBuf) -> PathBuf {
        self.cache
            .lock()
            .expect("lookup cache lock poisoned")
            .insert(name.to_string(), path.clone());
        path
    }
}

impl Default for ExecutableLookup {
    fn default() -> Self {
        Self::new()
    }
}
