//! # HTML Reporting Module / HTML 报告模块
//!
//! This module handles the generation of HTML run reports.
//! It creates styled HTML files with run statistics, a detailed shard
//! table, and interactive features for viewing captured output.
//!
//! 此模块处理 HTML 运行报告的生成。
//! 它创建带有运行统计、详细分片表格和查看捕获输出的
//! 交互功能的样式化 HTML 文件。

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::core::models::RunReport;
use crate::infra::t;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const HTML_SCRIPT: &str = include_str!("assets/report.js");

/// Generates a comprehensive HTML report for one run.
/// Creates a styled HTML file with run statistics, a shard results table,
/// and expandable captured output for failed shards.
///
/// 为一次运行生成综合的 HTML 报告。
/// 创建一个样式化的 HTML 文件，包含运行统计、分片结果表格
/// 和失败分片的可展开捕获输出。
///
/// # Errors / 错误
/// This function will return an error if the output file cannot be
/// written to the specified path.
/// 如果无法将输出文件写入指定路径，此函数会返回错误。
pub fn generate_html_report(report: &RunReport, output_path: &Path, locale: &str) -> Result<()> {
    let mut html = String::new();
    html.push_str(&format!(
        "<!DOCTYPE html><html><head><title>{}</title>",
        t!("html_report.title", locale = locale)
    ));
    html.push_str("<style>");
    html.push_str(HTML_STYLE);
    html.push_str("</style>");
    html.push_str("</head><body>");
    html.push_str(&format!(
        "<h1>{}</h1>",
        t!("html_report.main_header", locale = locale, label = escape_html(&report.label))
    ));
    html.push_str(&format!(
        "<p class='finished-at'>{}</p>",
        t!(
            "html_report.finished_at",
            locale = locale,
            time = report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    ));

    // Add summary statistics
    let total = report.outcomes.len();
    let passed = report.passed_count();
    let failed = report.failed_count();
    let skipped = report.skipped_count();

    html.push_str("<div class='summary-container'>");
    html.push_str(&format!(
        "<div class='summary-item'><span class='count'>{}</span><span class='label'>{}</span></div>",
        total,
        t!("html_report.summary.total", locale = locale)
    ));
    html.push_str(&format!(
        "<div class='summary-item'><span class='count passed-text'>{}</span><span class='label'>{}</span></div>",
        passed,
        t!("html_report.summary.passed", locale = locale)
    ));
    html.push_str(&format!(
        "<div class='summary-item'><span class='count failed-text'>{}</span><span class='label'>{}</span></div>",
        failed,
        t!("html_report.summary.failed", locale = locale)
    ));
    html.push_str(&format!(
        "<div class='summary-item'><span class='count skipped-text'>{}</span><span class='label'>{}</span></div>",
        skipped,
        t!("html_report.summary.skipped", locale = locale)
    ));
    html.push_str("</div>");

    // Add results table
    html.push_str("<table><thead><tr>");
    html.push_str(&format!(
        "<th>{}</th>",
        t!("html_report.table.header.shard", locale = locale)
    ));
    html.push_str(&format!(
        "<th class='status-col'>{}</th>",
        t!("html_report.table.header.status", locale = locale)
    ));
    html.push_str(&format!(
        "<th class='duration-cell'>{}</th>",
        t!("html_report.table.header.duration", locale = locale)
    ));
    html.push_str(&format!(
        "<th class='exit-cell'>{}</th>",
        t!("html_report.table.header.exit_code", locale = locale)
    ));
    html.push_str("</tr></thead><tbody>");

    for (i, outcome) in report.outcomes.iter().enumerate() {
        let status_str = outcome.get_status_str(locale);
        let status_class = outcome.get_status_class();
        let duration_str = outcome
            .get_duration()
            .map(|d| format!("{:.1}s", d.as_secs_f64()))
            .unwrap_or_else(|| "N/A".to_string());

        let exit_str = match outcome {
            crate::core::models::CommandOutcome::Passed { result } => result
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_default(),
            crate::core::models::CommandOutcome::Failed { result, .. } => result
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            crate::core::models::CommandOutcome::Skipped { .. } => String::new(),
        };

        let output_id = format!("output-{}", i);
        let error_details = if outcome.is_failure() {
            let escaped_output = escape_html(&outcome.combined_output());
            format!(
                "<tr id='{}' style='display:none;'><td colspan='4'><pre class='output-content'>{}</pre></td></tr>",
                output_id, escaped_output
            )
        } else {
            String::new()
        };

        let output_toggle = if outcome.is_failure() {
            format!(
                "<div class='output-toggle' onclick=\"toggleOutput('{}')\">{}</div>",
                output_id,
                t!("html_report.toggle_output", locale = locale)
            )
        } else {
            String::new()
        };

        html.push_str("<tr>");
        html.push_str(&format!("<td>{}</td>", escape_html(outcome.suffix())));
        html.push_str(&format!(
            "<td class='status-col'><div class='status-cell {}'>{}</div>{}</td>",
            status_class, status_str, output_toggle
        ));
        html.push_str(&format!("<td class='duration-cell'>{}</td>", duration_str));
        html.push_str(&format!("<td class='exit-cell'>{}</td>", exit_str));
        html.push_str("</tr>");
        html.push_str(&error_details);
    }

    html.push_str("</tbody></table>");
    html.push_str("<script>");
    html.push_str(HTML_SCRIPT);
    html.push_str("</script></body></html>");

    fs::write(output_path, html)?;
    Ok(())
}

/// Simple HTML escape function to replace special characters with their HTML entities
/// 简单的 HTML 转义函数，用 HTML 实体替换特殊字符
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
