//! # Console Reporting Module / 控制台报告模块
//!
//! This module handles the generation and display of run reports in the
//! console. It provides functionality for printing colorful, formatted
//! summaries with internationalization support.
//!
//! 此模块处理控制台中运行报告的生成和显示。
//! 它提供打印彩色格式化摘要的功能，支持国际化。

use crate::core::models::{CommandOutcome, FailureReason, RunReport};
use crate::infra::t;
use colored::*;

/// Prints a formatted summary of a run to the console.
/// Displays a table with shard status, suffix and duration, using color
/// coding to highlight different statuses, followed by a totals line.
///
/// 在控制台打印运行的格式化摘要。
/// 显示一个包含分片状态、后缀和持续时间的表格，
/// 使用颜色编码突出显示不同的状态，最后是总计行。
///
/// # Output Format / 输出格式
/// ```text
/// --- Run Summary ---
///   - Passed           | beeline                                  |      81.2s
///   - Failed           | ql_1                                     |     412.9s
///   - Timeout          | ql_TestCleaner2                          |    3600.0s
///   - Skipped          | standalone-metastore_2                   |        N/A
/// ```
pub fn print_summary(report: &RunReport, locale: &str) {
    println!(
        "\n{}",
        t!("report.summary_banner", locale = locale, label = report.label).bold()
    );

    for outcome in &report.outcomes {
        let status_str = outcome.get_status_str(locale);
        let duration_str = outcome
            .get_duration()
            .map(|d| format!("{:.1}s", d.as_secs_f64()))
            .unwrap_or_else(|| "N/A".to_string());

        let status_colored = match outcome {
            CommandOutcome::Passed { .. } => status_str.green(),
            CommandOutcome::Failed { .. } => status_str.red(),
            CommandOutcome::Skipped { .. } => status_str.dimmed(),
        };

        println!(
            "  - {:<18} | {:<40} | {:>10}",
            status_colored,
            outcome.suffix(),
            duration_str
        );
    }

    println!(
        "\n{}",
        t!(
            "report.totals",
            locale = locale,
            passed = report.passed_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count()
        )
    );
}

/// Prints detailed information about failed shards: the exact shell text
/// that ran and the full captured output, separated per shard. Skipped and
/// passed shards are never expanded here.
///
/// 打印失败分片的详细信息：运行的确切 shell 文本和完整的捕获输出，
/// 按分片分隔。跳过和通过的分片从不在此展开。
pub fn print_failure_details(report: &RunReport, locale: &str) {
    let failures: Vec<&CommandOutcome> = report.failed().collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, outcome) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report.header_failure", locale = locale).red(),
            outcome.suffix().cyan()
        );

        if let CommandOutcome::Failed { result, reason } = outcome {
            println!("  {}", result.command.command.dimmed());
            let log_header = match reason {
                FailureReason::Timeout => t!("report.timeout_log", locale = locale),
                FailureReason::Engine => t!("report.engine_log", locale = locale),
                FailureReason::TestsFailed => t!("report.test_log", locale = locale),
            };
            println!("\n--- {} ---\n", log_header.yellow());
            println!("{}", outcome.combined_output());
            println!("\n{}", "-".repeat(80));
        }
    }
}
