//! # Container Engine Module / 容器引擎模块
//!
//! Talks to the container engine binary (docker-compatible) through the
//! process executor: renders the image build recipe, builds the run's
//! image, runs one container per planned command, fetches log files out
//! of finished containers, and removes containers and the image again.
//! Cleanup operations are best-effort and only ever warn.
//!
//! 通过进程执行器与容器引擎二进制文件（docker 兼容）交互：
//! 渲染镜像构建配方、构建运行镜像、为每个规划命令运行一个容器、
//! 从已完成的容器中抓取日志文件，并再次删除容器和镜像。
//! 清理操作是尽力而为的，最多只发出警告。

use anyhow::{anyhow, Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::config::{Settings, DEFAULT_BUILD_TIMEOUT, DEFAULT_RUN_TIMEOUT};
use crate::core::models::{BuildInfo, ContainerCommand, ContainerResult, RunnerError};
use crate::infra::fs;
use crate::infra::logger::LiveLog;
use crate::infra::lookup::ExecutableLookup;
use crate::infra::process;
use crate::infra::t;

/// Unprivileged user the source is checked out and built as.
/// 检出和构建源码所用的非特权用户。
pub const BUILD_USER: &str = "shardbuilder";

/// Log tag for image build and image removal output.
/// 镜像构建和镜像删除输出的日志标签。
pub const SETUP_TAG: &str = "setup";

const COPY_TIMEOUT: Duration = Duration::from_secs(120);
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the project checkout lives inside the image. Commands `cd` into
/// module directories relative to this root, and log paths start here.
///
/// 项目检出在镜像内的位置。命令相对于此根目录 `cd` 进入模块目录，
/// 日志路径也从这里开始。
pub fn container_project_root(project: &str) -> String {
    format!("/home/{}/{}", BUILD_USER, project)
}

/// The two package manager families the build recipe knows how to drive.
/// 构建配方知道如何驱动的两个包管理器系列。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFamily {
    /// yum-based images: centos, rhel, fedora, rocky, almalinux, ...
    Rpm,
    /// apt-based images: ubuntu, debian
    Apt,
}

impl PackageFamily {
    /// Detects the family from the base image name. Any image outside the
    /// two known families is a fatal configuration error.
    ///
    /// 从基础镜像名称检测系列。两个已知系列之外的任何镜像
    /// 都是致命的配置错误。
    pub fn detect(base_image: &str) -> Result<Self> {
        const RPM_IMAGES: &[&str] = &[
            "centos",
            "rhel",
            "fedora",
            "rocky",
            "almalinux",
            "oraclelinux",
            "amazonlinux",
        ];
        const APT_IMAGES: &[&str] = &["ubuntu", "debian"];

        let lowered = base_image.to_lowercase();
        if RPM_IMAGES.iter().any(|name| lowered.contains(name)) {
            return Ok(PackageFamily::Rpm);
        }
        if APT_IMAGES.iter().any(|name| lowered.contains(name)) {
            return Ok(PackageFamily::Apt);
        }
        Err(
            RunnerError::Configuration(t!("engine.unsupported_base_image", image = base_image).to_string())
                .into(),
        )
    }

    /// The shell line installing `packages` with this family's manager.
    /// 使用此系列的管理器安装 `packages` 的 shell 行。
    pub fn install_line(&self, packages: &str) -> String {
        match self {
            PackageFamily::Rpm => format!("yum install -y -q {}", packages),
            PackageFamily::Apt => format!(
                "apt-get update && DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
                packages
            ),
        }
    }
}

/// Renders the build recipe (Dockerfile) for one run: base image, package
/// installation, an unprivileged build user, the source checkout, and a
/// final working directory at the project root so planned commands can
/// `cd` into modules by relative path.
///
/// 渲染一次运行的构建配方（Dockerfile）：基础镜像、软件包安装、
/// 非特权构建用户、源码检出，以及位于项目根目录的最终工作目录，
/// 使规划的命令可以通过相对路径 `cd` 进入模块。
pub fn render_recipe(info: &BuildInfo) -> Result<String> {
    let project = &info.descriptor.project;
    let family = PackageFamily::detect(&project.base_image)?;

    let mut packages = project.required_packages.clone();
    packages.extend(info.source.required_packages());

    let mut recipe = format!("FROM {}\n", project.base_image);
    if !packages.is_empty() {
        let joined = packages.iter().cloned().collect::<Vec<_>>().join(" ");
        recipe.push_str(&format!("RUN {}\n", family.install_line(&joined)));
    }
    recipe.push_str(&format!("RUN useradd -m {}\n", BUILD_USER));
    recipe.push_str(&format!("USER {}\n", BUILD_USER));
    recipe.push_str(&format!("WORKDIR /home/{}\n", BUILD_USER));
    for command in info.source.src_commands(&project.name) {
        recipe.push_str(&format!("RUN {}\n", command));
    }
    recipe.push_str(&format!("WORKDIR {}\n", container_project_root(&project.name)));
    Ok(recipe)
}

/// The container engine operations one run needs. Removal operations are
/// best-effort by contract: they warn instead of failing, and callers gate
/// them on the run's cleanup flag.
///
/// 一次运行所需的容器引擎操作。删除操作按约定是尽力而为的：
/// 它们发出警告而不是失败，调用者根据运行的清理标志决定是否调用。
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// Builds the run's image from the rendered recipe. The build is only
    /// accepted on a zero exit whose output carries the success or cache
    /// marker; anything else is a fatal image build error.
    ///
    /// 从渲染的配方构建运行镜像。仅当以零退出且输出带有成功或
    /// 缓存标记时才接受构建；其他任何情况都是致命的镜像构建错误。
    async fn build_image(&self, info: &BuildInfo) -> Result<()>;

    /// Runs one command in a fresh container named `{label}_{suffix}`.
    /// A timeout is data on the returned result, not an error.
    ///
    /// 在名为 `{label}_{suffix}` 的全新容器中运行一个命令。
    /// 超时是返回结果上的数据，而不是错误。
    async fn run_container(&self, info: &BuildInfo, command: &ContainerCommand)
        -> Result<ContainerResult>;

    /// Fetches the command's log files into `target_dir`, returning how
    /// many were copied. Missing files only warn.
    ///
    /// 将命令的日志文件抓取到 `target_dir`，返回复制的数量。
    /// 缺失的文件只发出警告。
    async fn copy_log_files(&self, info: &BuildInfo, result: &ContainerResult, target_dir: &Path)
        -> usize;

    /// Force-removes the command's container.
    /// 强制删除该命令的容器。
    async fn remove_container(&self, info: &BuildInfo, command: &ContainerCommand);

    /// Force-removes the run's image.
    /// 强制删除运行镜像。
    async fn remove_image(&self, info: &BuildInfo);
}

/// Drives a docker-compatible engine binary resolved from the settings.
/// 驱动从设置中解析出的 docker 兼容引擎二进制文件。
pub struct EngineClient {
    engine: PathBuf,
    run_args: Vec<String>,
    build_timeout: Duration,
    run_timeout: Duration,
    success_marker: String,
    cache_marker: String,
    log: LiveLog,
}

impl EngineClient {
    pub fn new(settings: &Settings, lookup: &ExecutableLookup, log: LiveLog) -> Result<Self> {
        let binary = settings.str_or("engine.binary", "docker");
        let engine = lookup.resolve(&binary)?;
        let raw_run_args = settings.str_or("engine.run_args", "");
        let run_args = shlex::split(&raw_run_args).ok_or_else(|| {
            anyhow!(RunnerError::Configuration(
                t!("engine.bad_run_args", value = raw_run_args).to_string()
            ))
        })?;
        Ok(Self {
            engine,
            run_args,
            build_timeout: settings.duration_or("engine.build_timeout", DEFAULT_BUILD_TIMEOUT)?,
            run_timeout: settings.duration_or("run.timeout", DEFAULT_RUN_TIMEOUT)?,
            success_marker: settings.str_or("engine.success_marker", "Successfully built"),
            cache_marker: settings.str_or("engine.cache_marker", "Using cache"),
            log,
        })
    }

    fn argv(&self, args: Vec<String>) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.engine.to_string_lossy().into_owned());
        argv.extend(args);
        argv
    }
}

impl ContainerRuntime for EngineClient {
    async fn build_image(&self, info: &BuildInfo) -> Result<()> {
        let recipe = render_recipe(info)?;
        let recipe_path = info.build_dir.join("Dockerfile");
        std::fs::write(&recipe_path, &recipe)
            .with_context(|| t!("engine.write_recipe_failed", path = recipe_path.display()).to_string())?;

        println!("{}", t!("engine.building_image", tag = info.image_tag()).cyan());
        let argv = self.argv(vec![
            "build".to_string(),
            "-t".to_string(),
            info.image_tag().to_string(),
            info.build_dir.to_string_lossy().into_owned(),
        ]);
        let output = process::execute(&argv, self.build_timeout, SETUP_TAG, &self.log).await?;

        let marked = output.stdout.contains(&self.success_marker)
            || output.stderr.contains(&self.success_marker)
            || output.stdout.contains(&self.cache_marker)
            || output.stderr.contains(&self.cache_marker);
        if output.exit_code != Some(0) || !marked {
            return Err(RunnerError::ImageBuild {
                stderr: output.stderr,
            }
            .into());
        }
        println!("{}", t!("engine.image_ready", tag = info.image_tag()).green());
        Ok(())
    }

    async fn run_container(
        &self,
        info: &BuildInfo,
        command: &ContainerCommand,
    ) -> Result<ContainerResult> {
        let name = info.container_name(&command.suffix);
        let mut args = vec!["run".to_string(), "--name".to_string(), name];
        args.extend(self.run_args.iter().cloned());
        args.push(info.image_tag().to_string());
        args.push("/bin/bash".to_string());
        args.push("-c".to_string());
        args.push(command.command.clone());

        let output = process::execute(&self.argv(args), self.run_timeout, &command.suffix, &self.log)
            .await?;
        Ok(ContainerResult {
            command: command.clone(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            timed_out: output.timed_out,
            duration: output.duration,
        })
    }

    async fn copy_log_files(
        &self,
        info: &BuildInfo,
        result: &ContainerResult,
        target_dir: &Path,
    ) -> usize {
        if result.command.log_files.is_empty() {
            return 0;
        }
        if let Err(e) = fs::ensure_dir(target_dir) {
            eprintln!("{}", t!("engine.log_dir_failed", error = e).yellow());
            return 0;
        }

        let name = info.container_name(&result.command.suffix);
        let mut fetched = 0;
        for path in &result.command.log_files {
            let argv = self.argv(vec![
                "cp".to_string(),
                format!("{}:{}", name, path),
                target_dir.to_string_lossy().into_owned(),
            ]);
            match process::execute(&argv, COPY_TIMEOUT, &result.command.suffix, &self.log).await {
                Ok(output) if output.success() => fetched += 1,
                Ok(_) => eprintln!(
                    "{}",
                    t!("engine.log_fetch_missing", path = path, container = name).yellow()
                ),
                Err(e) => eprintln!("{}", t!("engine.log_fetch_failed", path = path, error = e).yellow()),
            }
        }
        fetched
    }

    async fn remove_container(&self, info: &BuildInfo, command: &ContainerCommand) {
        let name = info.container_name(&command.suffix);
        let argv = self.argv(vec!["rm".to_string(), "-f".to_string(), name.clone()]);
        match process::execute(&argv, CLEANUP_TIMEOUT, &command.suffix, &self.log).await {
            Ok(output) if output.success() => {}
            Ok(_) => eprintln!(
                "{}",
                t!("engine.remove_container_failed", container = name).yellow()
            ),
            Err(e) => eprintln!("{}", t!("engine.cleanup_error", error = e).yellow()),
        }
    }

    async fn remove_image(&self, info: &BuildInfo) {
        let argv = self.argv(vec![
            "rmi".to_string(),
            "-f".to_string(),
            info.image_tag().to_string(),
        ]);
        match process::execute(&argv, CLEANUP_TIMEOUT, SETUP_TAG, &self.log).await {
            Ok(output) if output.success() => {}
            Ok(_) => eprintln!(
                "{}",
                t!("engine.remove_image_failed", tag = info.image_tag()).yellow()
            ),
            Err(e) => eprintln!("{}", t!("engine.cleanup_error", error = e).yellow()),
        }
    }
}
