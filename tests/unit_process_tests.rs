//! # Process Infrastructure Unit Tests / 进程基础设施单元测试
//!
//! This module contains unit tests for `process.rs`, `logger.rs` and
//! `lookup.rs`: deadline-bounded execution with full output capture, the
//! tagged live log, and PATH-based executable resolution.
//!
//! 此模块包含 `process.rs`、`logger.rs` 和 `lookup.rs` 的单元测试:
//! 带截止时间的执行与完整输出捕获、带标签的实时日志,
//! 以及基于 PATH 的可执行文件解析。

use shard_runner::infra::logger::{LiveLog, StreamKind};
use shard_runner::infra::lookup::ExecutableLookup;
use shard_runner::infra::process::{execute, ExecOutput};
use std::time::Duration;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod execute_tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_both_streams() {
        let log = LiveLog::memory();
        let output = execute(
            &argv(&["sh", "-c", "echo hello; echo oops >&2"]),
            Duration::from_secs(10),
            "ql_1",
            &log,
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert!(!output.timed_out);
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
        assert!(output.stderr.contains("oops"));

        let recorded = log.contents().unwrap();
        assert!(recorded.contains("[ql_1/out] hello"));
        assert!(recorded.contains("[ql_1/err] oops"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_data() {
        let log = LiveLog::memory();
        let output = execute(
            &argv(&["sh", "-c", "exit 3"]),
            Duration::from_secs(10),
            "cli",
            &log,
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    /// A timeout kills the child but keeps everything it wrote before the
    /// kill; the result reports the timeout instead of an exit code.
    ///
    /// 超时会终止子进程，但保留其在终止前写入的所有内容；
    /// 结果报告超时而不是退出码。
    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let log = LiveLog::memory();
        let output = execute(
            &argv(&["sh", "-c", "echo started; sleep 30"]),
            Duration::from_millis(500),
            "slow",
            &log,
        )
        .await
        .unwrap();

        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        assert!(!output.success());
        assert!(output.stdout.contains("started"));
        assert!(output.duration < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_empty_argv_is_an_error() {
        let log = LiveLog::memory();
        let err = execute(&[], Duration::from_secs(1), "none", &log)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Cannot execute an empty command line"));
    }

    #[tokio::test]
    async fn test_spawn_failure_names_the_program() {
        let log = LiveLog::memory();
        let err = execute(
            &argv(&["shard-runner-missing-binary-xyz"]),
            Duration::from_secs(1),
            "none",
            &log,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Failed to spawn"));
        assert!(err.to_string().contains("shard-runner-missing-binary-xyz"));
    }

    #[test]
    fn test_exec_output_success() {
        let output = ExecOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            timed_out: false,
            duration: Duration::from_secs(1),
        };
        assert!(output.success());

        let failed = ExecOutput {
            exit_code: Some(1),
            ..output.clone()
        };
        assert!(!failed.success());

        let killed = ExecOutput {
            exit_code: None,
            timed_out: true,
            ..output
        };
        assert!(!killed.success());
    }
}

#[cfg(test)]
mod live_log_tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_prefixed_lines() {
        let log = LiveLog::memory();
        log.append("ql_1", StreamKind::Stdout, "Running TestCliDriver");
        log.append("ql_1", StreamKind::Stderr, "log4j warning");

        assert_eq!(
            log.contents().unwrap(),
            "[ql_1/out] Running TestCliDriver\n[ql_1/err] log4j warning\n"
        );
    }

    #[test]
    fn test_clones_share_the_sink() {
        let log = LiveLog::memory();
        let clone = log.clone();
        clone.append("beeline", StreamKind::Stdout, "BUILD SUCCESS");

        assert!(log.contents().unwrap().contains("[beeline/out] BUILD SUCCESS"));
    }

    #[test]
    fn test_console_sink_has_no_contents() {
        assert_eq!(LiveLog::console().contents(), None);
    }
}

#[cfg(test)]
mod lookup_tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_resolves_from_path() {
        let lookup = ExecutableLookup::new();
        let resolved = lookup.resolve("sh").unwrap();

        assert!(resolved.is_file());
        assert_eq!(resolved.file_name().unwrap(), "sh");

        // Second resolution hits the cache and agrees with the first.
        // 第二次解析命中缓存并与第一次一致。
        assert_eq!(lookup.resolve("sh").unwrap(), resolved);
    }

    #[test]
    fn test_missing_tool_names_itself() {
        let lookup = ExecutableLookup::new();
        let err = lookup.resolve("definitely-missing-tool-xyz").unwrap_err();

        assert!(err.to_string().contains("definitely-missing-tool-xyz"));
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[test]
    fn test_explicit_path_bypasses_path_walk() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("engine");
        fs::write(&binary, "").unwrap();

        let lookup = ExecutableLookup::new();
        let resolved = lookup.resolve(binary.to_str().unwrap()).unwrap();
        assert_eq!(resolved, binary);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("bin/engine");

        let lookup = ExecutableLookup::new();
        let err = lookup.resolve(missing.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
    }
}
