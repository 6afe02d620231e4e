//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the shard
//! runner: the planned container commands, the captured results of running
//! them, the per-run build information shared by every worker, and the
//! fatal error kinds.
//!
//! 此模块定义了整个分片运行器中使用的核心数据结构：
//! 规划的容器命令、运行它们捕获的结果、
//! 每个工作者共享的每次运行构建信息，以及致命错误类型。

use crate::core::config::BuildDescriptor;
use crate::core::source::CodeSource;
use crate::infra::fs::sanitize_token;
use crate::infra::t;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Enumerates the possible reasons for a container command failure.
/// This helps in categorizing errors for reporting and handling.
/// 枚举容器命令失败的可能原因。
/// 这有助于对错误进行分类，以便报告和处理。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FailureReason {
    /// The command ran to completion but exited non-zero.
    /// 命令运行完成但以非零退出。
    TestsFailed,
    /// The command exceeded its configured timeout and was killed.
    /// 命令超出了其配置的超时时间并被终止。
    Timeout,
    /// The container engine itself failed before a result could be read.
    /// 容器引擎本身在读取结果之前失败。
    Engine,
}

/// One schedulable unit of work: a shell invocation to run inside a fresh
/// container of the run's image, plus the identifiers derived from it.
///
/// 一个可调度的工作单元：在运行镜像的全新容器内执行的 shell 调用，
/// 以及由此派生的标识符。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCommand {
    /// The full shell text, e.g. `cd ql && mvn -B test -Dsurefire.timeout=3600 ...`.
    /// 完整的 shell 文本。
    pub command: String,
    /// Unique suffix naming this shard; the container is named
    /// `{label}_{suffix}` and logs land under a directory of this name.
    /// 命名此分片的唯一后缀；容器名为 `{label}_{suffix}`，
    /// 日志放在以此命名的目录下。
    pub suffix: String,
    /// Container paths whose contents are fetched after the run.
    /// 运行后要抓取内容的容器内路径。
    pub log_files: Vec<String>,
}

/// Everything a finished container command left behind. A timeout is data
/// here, not an error: the captured output is kept either way.
///
/// 一个已完成的容器命令留下的所有内容。
/// 超时在这里是数据而不是错误：无论如何都会保留捕获的输出。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerResult {
    /// The command that produced this result.
    /// 产生此结果的命令。
    pub command: ContainerCommand,
    /// Exit code if the container exited on its own; `None` after a kill.
    /// 容器自行退出时的退出码；被终止后为 `None`。
    pub exit_code: Option<i32>,
    /// Captured standard output / 捕获的标准输出
    pub stdout: String,
    /// Captured standard error / 捕获的标准错误
    pub stderr: String,
    /// `true` when the deadline expired and the container was killed.
    /// 截止时间到期且容器被终止时为 `true`。
    pub timed_out: bool,
    /// Wall-clock time of the container run.
    /// 容器运行的实际时间。
    pub duration: Duration,
}

impl ContainerResult {
    /// A clean zero exit within the deadline.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    /// A synthetic result for a command the engine could not run at all.
    /// The engine's error text stands in for the container's stderr.
    ///
    /// 引擎完全无法运行的命令的合成结果。
    /// 引擎的错误文本代替容器的标准错误。
    pub fn engine_failure(command: ContainerCommand, message: String) -> Self {
        Self {
            command,
            exit_code: None,
            stdout: String::new(),
            stderr: message,
            timed_out: false,
            duration: Duration::ZERO,
        }
    }
}

/// Represents the final outcome of a single container command.
/// 表示单个容器命令的最终结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// The command exited zero within its deadline.
    /// 命令在截止时间内以零退出。
    Passed {
        /// The captured result / 捕获的结果
        result: ContainerResult,
    },
    /// The command failed; `reason` says how.
    /// 命令失败；`reason` 说明原因。
    Failed {
        /// The captured result / 捕获的结果
        result: ContainerResult,
        /// The specific reason for the failure / 失败的具体原因
        reason: FailureReason,
    },
    /// The command was never started because the run was interrupted.
    /// 由于运行被中断，命令从未启动。
    Skipped {
        /// The command that was skipped / 被跳过的命令
        command: ContainerCommand,
    },
}

impl CommandOutcome {
    /// Classifies a captured result: a timeout beats the exit code, a zero
    /// exit passes, anything else is a test failure.
    ///
    /// 对捕获的结果进行分类：超时优先于退出码，
    /// 零退出为通过，其他情况均为测试失败。
    pub fn classify(result: ContainerResult) -> Self {
        if result.timed_out {
            CommandOutcome::Failed {
                result,
                reason: FailureReason::Timeout,
            }
        } else if result.exit_code == Some(0) {
            CommandOutcome::Passed { result }
        } else {
            CommandOutcome::Failed {
                result,
                reason: FailureReason::TestsFailed,
            }
        }
    }

    /// The suffix of the command behind this outcome.
    /// 此结果背后命令的后缀。
    pub fn suffix(&self) -> &str {
        match self {
            CommandOutcome::Passed { result } => &result.command.suffix,
            CommandOutcome::Failed { result, .. } => &result.command.suffix,
            CommandOutcome::Skipped { command } => &command.suffix,
        }
    }

    /// Checks if the outcome is any kind of failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, CommandOutcome::Failed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CommandOutcome::Failed {
                reason: FailureReason::Timeout,
                ..
            }
        )
    }

    /// Gets the appropriate CSS class for the outcome status.
    pub fn get_status_class(&self) -> &str {
        match self {
            CommandOutcome::Passed { .. } => "status-Passed",
            CommandOutcome::Failed { reason, .. } => match reason {
                FailureReason::Timeout => "status-Timeout",
                FailureReason::Engine => "status-Engine",
                FailureReason::TestsFailed => "status-Failed",
            },
            CommandOutcome::Skipped { .. } => "status-Skipped",
        }
    }

    /// Gets the status of the outcome as a string for display.
    /// 以字符串形式获取结果的状态以供显示。
    pub fn get_status_str(&self, locale: &str) -> String {
        match self {
            CommandOutcome::Passed { .. } => t!("report.status_passed", locale = locale).to_string(),
            CommandOutcome::Failed { reason, .. } => match reason {
                FailureReason::Timeout => t!("report.status_timeout", locale = locale).to_string(),
                FailureReason::Engine => t!("report.status_engine", locale = locale).to_string(),
                FailureReason::TestsFailed => t!("report.status_failed", locale = locale).to_string(),
            },
            CommandOutcome::Skipped { .. } => t!("report.status_skipped", locale = locale).to_string(),
        }
    }

    /// Both captured streams as one block, stderr last. Returns an empty
    /// string for skipped commands.
    /// 将两个捕获的流合并为一个块，标准错误在最后。
    /// 对于跳过的命令返回空字符串。
    pub fn combined_output(&self) -> String {
        let result = match self {
            CommandOutcome::Passed { result } => result,
            CommandOutcome::Failed { result, .. } => result,
            CommandOutcome::Skipped { .. } => return String::new(),
        };
        if result.stderr.is_empty() {
            result.stdout.clone()
        } else if result.stdout.is_empty() {
            result.stderr.clone()
        } else {
            format!("{}\n--- stderr ---\n{}", result.stdout, result.stderr)
        }
    }

    /// Gets the duration of the command. Returns None for skipped commands.
    /// 获取命令的持续时间。对于跳过的命令返回 None。
    pub fn get_duration(&self) -> Option<Duration> {
        match self {
            CommandOutcome::Passed { result } => Some(result.duration),
            CommandOutcome::Failed { result, .. } => Some(result.duration),
            CommandOutcome::Skipped { .. } => None,
        }
    }
}

/// The aggregated outcome of one whole run, ready for reporting.
/// Outcomes are kept sorted by suffix so reports are deterministic no
/// matter in which order the parallel commands finished.
///
/// 一次完整运行的聚合结果，可用于报告。
/// 结果按后缀排序，因此无论并行命令以何种顺序完成，
/// 报告都是确定性的。
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The run label the image and containers were named after.
    /// 镜像和容器命名所依据的运行标签。
    pub label: String,
    /// When aggregation happened.
    /// 聚合发生的时间。
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// One outcome per planned command, sorted by suffix.
    /// 每个规划命令一个结果，按后缀排序。
    pub outcomes: Vec<CommandOutcome>,
}

impl RunReport {
    pub fn new(label: String, mut outcomes: Vec<CommandOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.suffix().cmp(b.suffix()));
        Self {
            label,
            finished_at: chrono::Utc::now(),
            outcomes,
        }
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CommandOutcome::Passed { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CommandOutcome::Skipped { .. }))
            .count()
    }

    /// Iterates over the failed outcomes in suffix order.
    /// 按后缀顺序遍历失败的结果。
    pub fn failed(&self) -> impl Iterator<Item = &CommandOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// A run succeeds when nothing failed. Skipped commands do not count
    /// against success; an interrupted run reports them separately.
    /// 没有任何失败时运行成功。跳过的命令不影响成功；
    /// 被中断的运行会单独报告它们。
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Everything the engine needs to build the run's image and name its
/// containers, shared read-only by all workers.
///
/// 引擎构建运行镜像和命名其容器所需的一切，
/// 由所有工作者以只读方式共享。
pub struct BuildInfo {
    /// Run label, sanitized and lowercased; doubles as the image tag.
    /// 运行标签，经过清理并转为小写；同时用作镜像标签。
    pub label: String,
    /// The full build descriptor this run was planned from.
    /// 规划此次运行所依据的完整构建描述符。
    pub descriptor: BuildDescriptor,
    /// The code source whose commands the build recipe embeds.
    /// 构建配方嵌入其命令的代码源。
    pub source: Arc<dyn CodeSource>,
    /// Host directory the recipe is written to and built from.
    /// 配方写入并构建的宿主机目录。
    pub build_dir: PathBuf,
    /// Whether containers and the image are removed after the run.
    /// 运行后是否删除容器和镜像。
    pub cleanup: bool,
}

impl BuildInfo {
    pub fn new(
        label: &str,
        descriptor: BuildDescriptor,
        source: Arc<dyn CodeSource>,
        build_dir: PathBuf,
        cleanup: bool,
    ) -> Self {
        Self {
            label: sanitize_token(&label.to_lowercase()),
            descriptor,
            source,
            build_dir,
            cleanup,
        }
    }

    /// The default label for a run of `project`: the project name plus a
    /// timestamp, e.g. `hive-20260825143000`.
    /// `project` 的默认运行标签：项目名称加时间戳。
    pub fn default_label(project: &str) -> String {
        format!(
            "{}-{}",
            project,
            chrono::Local::now().format("%Y%m%d%H%M%S")
        )
    }

    /// The image tag this run builds and runs under.
    pub fn image_tag(&self) -> &str {
        &self.label
    }

    /// The container name for one command: `{label}_{suffix}`.
    /// 单个命令的容器名：`{label}_{suffix}`。
    pub fn container_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.label, suffix)
    }
}

impl fmt::Debug for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildInfo")
            .field("label", &self.label)
            .field("source", &self.source.kind())
            .field("build_dir", &self.build_dir)
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}

/// Fatal errors that abort a run before or during image preparation.
/// Per-command failures are never represented here; they flow through
/// [`CommandOutcome`] so one bad shard cannot sink its siblings.
///
/// 在镜像准备之前或期间中止运行的致命错误。
/// 每命令的失败从不在此表示；它们通过 [`CommandOutcome`] 流转，
/// 因此一个坏分片不会连累其兄弟分片。
#[derive(Debug)]
pub enum RunnerError {
    /// The descriptor or settings are structurally unusable.
    /// 描述符或设置在结构上不可用。
    Configuration(String),
    /// The image build was rejected; the engine's stderr is attached.
    /// 镜像构建被拒绝；附有引擎的标准错误。
    ImageBuild {
        /// Captured engine stderr / 捕获的引擎标准错误
        stderr: String,
    },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Configuration(message) => write!(f, "{}", message),
            RunnerError::ImageBuild { stderr } => {
                write!(f, "{}\n{}", t!("error.image_build_failed"), stderr)
            }
        }
    }
}

impl std::error::Error for RunnerError {}
