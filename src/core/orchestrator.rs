//! # Build Orchestrator Module / 构建编排模块
//!
//! Drives one whole run: build the image once, execute every planned
//! command in a bounded worker pool, fetch logs and clean up per
//! container, and aggregate everything into a run report. A failing
//! shard never sinks its siblings; only an image build failure aborts
//! the run.
//!
//! 驱动一次完整的运行：构建一次镜像，在有界工作池中执行每个
//! 规划的命令，按容器抓取日志并清理，并将所有内容聚合为运行报告。
//! 失败的分片绝不会连累其兄弟分片；只有镜像构建失败才会中止运行。

use anyhow::Result;
use colored::*;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::models::{
    BuildInfo, CommandOutcome, ContainerCommand, ContainerResult, FailureReason, RunReport,
};
use crate::infra::container::ContainerRuntime;
use crate::infra::t;

/// Lifecycle of one run as the orchestrator drives it.
/// 编排器驱动的一次运行的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Nothing has happened yet.
    NotStarted,
    /// The image build is in flight.
    ImageBuilding,
    /// The image was accepted; commands may start.
    ImageBuilt,
    /// The image build failed; the run is aborted.
    ImageFailed,
    /// The worker pool is executing commands.
    Running,
    /// All commands finished; outcomes are being collected.
    Aggregating,
    /// The report is ready.
    Done,
}

/// Runs planned commands against a container runtime with bounded
/// parallelism. The runtime is generic so tests can script one.
///
/// 以有界并行度针对容器运行时执行规划的命令。
/// 运行时是泛型的，因此测试可以编写脚本化的运行时。
pub struct BuildOrchestrator<R: ContainerRuntime> {
    info: Arc<BuildInfo>,
    runtime: R,
    jobs: usize,
    log_dir: PathBuf,
    state: BuildState,
}

impl<R: ContainerRuntime> BuildOrchestrator<R> {
    pub fn new(info: Arc<BuildInfo>, runtime: R, jobs: usize, log_dir: PathBuf) -> Self {
        Self {
            info,
            runtime,
            jobs,
            log_dir,
            state: BuildState::NotStarted,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Executes the whole run and returns its aggregated report.
    ///
    /// The image is built exactly once up front; a rejected build aborts
    /// before any container starts. Commands then run through a pool of at
    /// most `jobs` workers. Once `stop` is cancelled, commands that have
    /// not started yet are skipped while in-flight ones run to completion,
    /// so partial results still make it into the report.
    ///
    /// 执行整个运行并返回其聚合报告。
    /// 镜像预先只构建一次；被拒绝的构建在任何容器启动之前中止。
    /// 然后命令通过最多 `jobs` 个工作者的池运行。
    /// `stop` 被取消后，尚未启动的命令被跳过，而进行中的命令运行到完成，
    /// 因此部分结果仍会进入报告。
    pub async fn run(
        &mut self,
        commands: Vec<ContainerCommand>,
        stop: CancellationToken,
    ) -> Result<RunReport> {
        self.state = BuildState::ImageBuilding;
        if let Err(e) = self.runtime.build_image(&self.info).await {
            self.state = BuildState::ImageFailed;
            return Err(e);
        }
        self.state = BuildState::ImageBuilt;

        let jobs = self.jobs.max(1);
        println!(
            "{}",
            t!("run.starting_commands", count = commands.len(), jobs = jobs).cyan()
        );
        self.state = BuildState::Running;

        let runtime = &self.runtime;
        let info = &self.info;
        let log_dir = &self.log_dir;
        let outcomes: Vec<CommandOutcome> = stream::iter(commands.into_iter().map(|command| {
            let stop = stop.clone();
            async move { execute_command(runtime, info, log_dir, command, stop).await }
        }))
        .buffer_unordered(jobs)
        .collect()
        .await;

        if self.info.cleanup {
            self.runtime.remove_image(&self.info).await;
        }

        self.state = BuildState::Aggregating;
        let report = RunReport::new(self.info.label.clone(), outcomes);
        self.state = BuildState::Done;
        Ok(report)
    }
}

/// One worker slot: run the container, fetch its logs, remove it, and
/// classify what happened. Engine-level failures become `Engine` outcomes
/// instead of errors, so the pool always drains completely.
///
/// 一个工作者槽位：运行容器、抓取其日志、删除它并对结果分类。
/// 引擎级失败成为 `Engine` 结果而不是错误，因此池总是完全排空。
async fn execute_command<R: ContainerRuntime>(
    runtime: &R,
    info: &BuildInfo,
    log_dir: &Path,
    command: ContainerCommand,
    stop: CancellationToken,
) -> CommandOutcome {
    if stop.is_cancelled() {
        println!("{}", t!("run.shard_skipped", suffix = command.suffix).yellow());
        return CommandOutcome::Skipped { command };
    }

    println!("{}", t!("run.shard_started", suffix = command.suffix).blue());
    let (result, engine_error) = match runtime.run_container(info, &command).await {
        Ok(result) => (result, false),
        Err(e) => (ContainerResult::engine_failure(command, e.to_string()), true),
    };

    // Logs are fetched and the container removed regardless of pass/fail;
    // a red shard's surefire reports are the ones people actually read.
    // 无论通过与否都抓取日志并删除容器；
    // 失败分片的 surefire 报告才是人们真正要读的。
    let target = log_dir.join(&result.command.suffix);
    runtime.copy_log_files(info, &result, &target).await;
    if info.cleanup {
        runtime.remove_container(info, &result.command).await;
    }

    let outcome = if engine_error {
        CommandOutcome::Failed {
            result,
            reason: FailureReason::Engine,
        }
    } else {
        CommandOutcome::classify(result)
    };

    let duration = outcome.get_duration().unwrap_or_default().as_secs_f64();
    match &outcome {
        CommandOutcome::Passed { .. } => println!(
            "{}",
            t!(
                "run.shard_passed",
                suffix = outcome.suffix(),
                duration = format!("{:.1}", duration)
            )
            .green()
        ),
        CommandOutcome::Failed { reason, .. } => {
            let key = match reason {
                FailureReason::Timeout => "run.shard_timeout",
                FailureReason::Engine => "run.shard_engine_failed",
                FailureReason::TestsFailed => "run.shard_failed",
            };
            println!(
                "{}",
                t!(
                    key,
                    suffix = outcome.suffix(),
                    duration = format!("{:.1}", duration)
                )
                .red()
            );
        }
        CommandOutcome::Skipped { .. } => {}
    }
    outcome
}
