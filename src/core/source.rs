//! # Code Source Module / 代码源模块
//!
//! Abstracts where the project source comes from. Each source kind
//! contributes the packages it needs inside the image and the shell
//! commands that materialize the checkout, so the build recipe stays
//! ignorant of transport details.
//!
//! 抽象项目源码的来源。每种源类型提供它在镜像内需要的软件包
//! 以及实现检出的 shell 命令，因此构建配方对传输细节保持无感知。

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::config::SourceSpec;
use crate::core::models::RunnerError;
use crate::infra::t;

/// A way of materializing the project source inside the image. The
/// returned commands run as the unprivileged build user, with the image's
/// home directory as the working directory.
///
/// 在镜像内实现项目源码的一种方式。返回的命令以非特权构建用户身份运行，
/// 工作目录为镜像的主目录。
pub trait CodeSource: Send + Sync + std::fmt::Debug {
    /// Stable kind name, matching the descriptor's `source.kind`.
    /// 稳定的类型名称，与描述符的 `source.kind` 匹配。
    fn kind(&self) -> &'static str;

    /// Distribution packages this source needs inside the image.
    /// 此源在镜像内需要的发行版软件包。
    fn required_packages(&self) -> BTreeSet<String>;

    /// Shell commands that place the source at `./{project_dir}`.
    /// 将源码放置在 `./{project_dir}` 的 shell 命令。
    fn src_commands(&self, project_dir: &str) -> Vec<String>;
}

/// Clones the project from a git repository, optionally at a branch.
/// 从 git 仓库克隆项目，可选指定分支。
#[derive(Debug)]
pub struct GitSource {
    url: String,
    branch: Option<String>,
}

impl CodeSource for GitSource {
    fn kind(&self) -> &'static str {
        "git"
    }

    fn required_packages(&self) -> BTreeSet<String> {
        ["git"].iter().map(|s| s.to_string()).collect()
    }

    fn src_commands(&self, project_dir: &str) -> Vec<String> {
        let mut clone = String::from("git clone --depth 1");
        if let Some(branch) = &self.branch {
            clone.push_str(&format!(" --branch {}", branch));
        }
        clone.push_str(&format!(" {} {}", self.url, project_dir));
        vec![clone]
    }
}

/// Downloads and unpacks a gzipped tarball of the project.
/// 下载并解压项目的 gzip 压缩包。
#[derive(Debug)]
pub struct TarballSource {
    url: String,
    strip_components: u32,
}

impl CodeSource for TarballSource {
    fn kind(&self) -> &'static str {
        "tarball"
    }

    fn required_packages(&self) -> BTreeSet<String> {
        ["curl", "tar", "gzip"].iter().map(|s| s.to_string()).collect()
    }

    fn src_commands(&self, project_dir: &str) -> Vec<String> {
        vec![
            format!("mkdir -p {}", project_dir),
            format!(
                "curl -fsSL {} | tar -xz --strip-components={} -C {}",
                self.url, self.strip_components, project_dir
            ),
        ]
    }
}

/// The source kinds this build knows how to resolve.
/// 此构建知道如何解析的源类型。
pub fn known_kinds() -> &'static [&'static str] {
    &["git", "tarball"]
}

/// Resolves a descriptor's source spec into a concrete code source. An
/// unknown kind or a missing URL is a fatal configuration error.
///
/// 将描述符的源规格解析为具体的代码源。
/// 未知类型或缺少 URL 是致命的配置错误。
pub fn resolve(spec: &SourceSpec) -> Result<Arc<dyn CodeSource>> {
    if spec.url.is_empty() {
        return Err(
            RunnerError::Configuration(t!("source.missing_url", kind = spec.kind).to_string()).into(),
        );
    }
    match spec.kind.as_str() {
        "git" => Ok(Arc::new(GitSource {
            url: spec.url.clone(),
            branch: spec.branch.clone(),
        })),
        "tarball" => Ok(Arc::new(TarballSource {
            url: spec.url.clone(),
            strip_components: spec.strip_components.unwrap_or(1),
        })),
        other => Err(RunnerError::Configuration(
            t!(
                "source.unknown_kind",
                kind = other,
                known = known_kinds().join(", ")
            )
            .to_string(),
        )
        .into()),
    }
}
