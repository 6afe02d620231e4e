//! # Process Execution Module / 进程执行模块
//!
//! This module runs external commands with a hard deadline while streaming
//! their output line by line into the live log. Both output streams are
//! captured in full, including everything written before a timeout kill.
//!
//! 此模块在硬性截止时间内运行外部命令，同时将其输出逐行
//! 流式传输到实时日志中。两个输出流都被完整捕获，
//! 包括超时终止之前写入的所有内容。

use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use crate::infra::logger::{LiveLog, StreamKind};
use crate::infra::t;

/// Everything a finished (or killed) process left behind.
/// 一个已完成（或被终止）的进程留下的所有内容。
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Captured standard output / 捕获的标准输出
    pub stdout: String,
    /// Captured standard error / 捕获的标准错误
    pub stderr: String,
    /// Exit code if the process exited on its own; `None` after a kill
    /// or when the platform reports no code.
    /// 进程自行退出时的退出码；被终止后或平台未报告退出码时为 `None`。
    pub exit_code: Option<i32>,
    /// `true` when the deadline expired and the process was killed.
    /// 截止时间到期且进程被终止时为 `true`。
    pub timed_out: bool,
    /// Wall-clock time from spawn to reap.
    /// 从派生到回收的实际时间。
    pub duration: Duration,
}

impl ExecOutput {
    /// A clean zero exit within the deadline.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Spawns `argv` and waits for it under `timeout`.
///
/// Each output line is appended to `log` under `tag` as it arrives, and also
/// accumulated into the returned buffers. When the deadline expires the child
/// is killed and reaped; the drain tasks are still awaited to EOF afterwards,
/// so nothing written before the kill is lost. A timeout is data on the
/// returned `ExecOutput`, not an `Err` — errors are reserved for spawn and
/// OS-level failures.
///
/// 派生 `argv` 并在 `timeout` 内等待它。
/// 每个输出行到达时都会以 `tag` 为标签追加到 `log`，
/// 同时累积到返回的缓冲区中。截止时间到期时子进程被终止并回收；
/// 之后仍会等待读取任务到 EOF，因此终止前写入的内容不会丢失。
/// 超时是返回的 `ExecOutput` 上的数据，而不是 `Err` ——
/// 错误保留给派生和操作系统级别的失败。
pub async fn execute(
    argv: &[String],
    timeout: Duration,
    tag: &str,
    log: &LiveLog,
) -> Result<ExecOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!(t!("process.empty_argv")))?;

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .with_context(|| t!("process.spawn_failed", program = program))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!(t!("process.capture_stdout_failed")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!(t!("process.capture_stderr_failed")))?;

    let stdout_buf = Arc::new(tokio::sync::Mutex::new(String::new()));
    let stderr_buf = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_handle = drain_lines(
        stdout,
        Arc::clone(&stdout_buf),
        log.clone(),
        tag.to_string(),
        StreamKind::Stdout,
    );
    let stderr_handle = drain_lines(
        stderr,
        Arc::clone(&stderr_buf),
        log.clone(),
        tag.to_string(),
        StreamKind::Stderr,
    );

    let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => {
            let status = status.with_context(|| t!("process.wait_failed"))?;
            (status.code(), false)
        }
        Err(_) => {
            // Deadline hit: kill the child so the pipes close and the drain
            // tasks below can reach EOF with everything captured so far.
            // 截止时间已到：终止子进程以关闭管道，
            // 使下面的读取任务能够在捕获所有内容后到达 EOF。
            if let Err(e) = child.start_kill() {
                eprintln!("{}", t!("process.kill_failed", error = e));
            }
            let _ = child.wait().await;
            (None, true)
        }
    };

    // Wait for the drain tasks to finish to ensure all output is captured.
    // 等待读取任务完成，以确保所有输出都被捕获。
    if let Err(e) = stdout_handle.await {
        eprintln!("Failed to join stdout task: {}", e);
    }
    if let Err(e) = stderr_handle.await {
        eprintln!("Failed to join stderr task: {}", e);
    }

    let stdout = stdout_buf.lock().await.clone();
    let stderr = stderr_buf.lock().await.clone();

    Ok(ExecOutput {
        stdout,
        stderr,
        exit_code,
        timed_out,
        duration: start.elapsed(),
    })
}

/// Reads one stream line by line into `buffer`, mirroring each line to `log`.
/// 将一个流逐行读入 `buffer`，同时将每行镜像到 `log`。
fn drain_lines<R>(
    reader: R,
    buffer: Arc<tokio::sync::Mutex<String>>,
    log: LiveLog,
    tag: String,
    stream: StreamKind,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log.append(&tag, stream, &line);
            let mut buffer = buffer.lock().await;
            buffer.push_str(&line);
            buffer.push('\n');
        }
    })
}
