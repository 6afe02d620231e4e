//! # Run Command Module / 运行命令模块
//!
//! Implements the `run` subcommand: load and validate the build
//! descriptor, discover tests, plan the container commands, drive the
//! orchestrator against the container engine, and report the results.
//!
//! 实现 `run` 子命令：加载并验证构建描述符、发现测试、
//! 规划容器命令、针对容器引擎驱动编排器并报告结果。

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::core::config::{self, BuildDescriptor};
use crate::core::discovery::TestDiscovery;
use crate::core::models::{BuildInfo, RunReport};
use crate::core::orchestrator::BuildOrchestrator;
use crate::core::planner;
use crate::core::source;
use crate::infra::container::EngineClient;
use crate::infra::fs::{create_build_dir, ensure_dir, sanitize_token};
use crate::infra::logger::LiveLog;
use crate::infra::lookup::ExecutableLookup;
use crate::infra::t;
use crate::reporting::{generate_html_report, print_failure_details, print_summary};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    jobs: Option<usize>,
    config: PathBuf,
    label: Option<String>,
    keep: bool,
    build_dir: Option<PathBuf>,
    log_dir: PathBuf,
    html: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<()> {
    let (descriptor, config_path) = setup_and_parse_config(&config)?;
    let locale = descriptor.project.language.clone();
    rust_i18n::set_locale(&locale);

    println!(
        "{}",
        t!("loading_build_plan", locale = locale, path = config_path.display())
    );
    println!(
        "{}",
        t!(
            "testing_project",
            locale = locale,
            name = descriptor.project.name.yellow(),
            modules = descriptor.modules.len()
        )
    );

    let settings = descriptor.settings();
    let source = source::resolve(&descriptor.source)?;

    let label = sanitize_token(
        &label
            .unwrap_or_else(|| BuildInfo::default_label(&descriptor.project.name))
            .to_lowercase(),
    );
    println!("{}", t!("run_label", locale = locale, label = label.bold()));

    let (build_path, mut build_guard) = prepare_build_dir(&label, build_dir)?;
    let info = Arc::new(BuildInfo::new(
        &label,
        descriptor.clone(),
        source,
        build_path,
        !keep,
    ));
    if keep {
        if let Some(guard) = build_guard.take() {
            // Dropping the guard would delete the tree; --keep leaks it
            // instead so the recipe stays inspectable after the run.
            // 丢弃 guard 会删除该目录树；--keep 改为泄漏它，
            // 使构建配方在运行后仍可检查。
            println!(
                "{}",
                t!("build_dir_kept", locale = locale, path = info.build_dir.display()).yellow()
            );
            std::mem::forget(guard);
        }
    }

    let discovery = TestDiscovery::from_settings(&settings)?;
    let mut discovered = Vec::new();
    for module in &descriptor.modules {
        let tests = discovery.discover(module)?;
        if !module.runs_whole() {
            println!(
                "{}",
                t!(
                    "module_discovered",
                    locale = locale,
                    dir = module.dir,
                    batched = tests.batched.len(),
                    isolated = tests.isolated.len()
                )
                .cyan()
            );
        }
        discovered.push((module.clone(), tests));
    }

    let commands = planner::plan(&descriptor, &discovered, &settings)?;
    if commands.is_empty() {
        println!("{}", t!("no_commands_to_run", locale = locale).green());
        return Ok(());
    }
    println!(
        "{}",
        t!("planned_commands", locale = locale, count = commands.len()).bold()
    );

    let stop = setup_signal_handler(&locale)?;
    let lookup = ExecutableLookup::new();
    let engine = EngineClient::new(&settings, &lookup, LiveLog::console())?;

    let run_log_dir = log_dir.join(&info.label);
    let mut orchestrator = BuildOrchestrator::new(
        Arc::clone(&info),
        engine,
        jobs.unwrap_or(num_cpus::get() / 2 + 1),
        run_log_dir.clone(),
    );
    let report = orchestrator.run(commands, stop).await?;

    print_summary(&report, &locale);
    if report.failed_count() > 0 {
        print_failure_details(&report, &locale);
    }

    if let Some(report_path) = &html {
        println!("\nGenerating HTML report at: {}", report_path.display());
        if let Err(e) = generate_html_report(&report, report_path, &locale) {
            eprintln!("{} {}", "Failed to generate HTML report:".red(), e);
        }
    }
    if let Some(json_path) = &json {
        write_json_report(&report, json_path)?;
        println!(
            "{}",
            t!("json_report_written", locale = locale, path = json_path.display())
        );
    }

    println!(
        "{}",
        t!("logs_location", locale = locale, path = run_log_dir.display())
    );

    if !report.is_success() {
        anyhow::bail!("{} container command(s) failed.", report.failed_count());
    }
    println!("\n{}", t!("all_commands_passed", locale = locale).green().bold());
    Ok(())
}

fn setup_and_parse_config(config_path_arg: &Path) -> Result<(BuildDescriptor, PathBuf)> {
    // For config parsing, we don't have the locale yet. Use English as a default.
    let locale = "en";
    let config_path = fs::canonicalize(config_path_arg).with_context(|| {
        t!("config.read_failed", locale = locale, path = config_path_arg.display())
    })?;
    let descriptor = config::load_descriptor(&config_path)?;
    Ok((descriptor, config_path))
}

/// Resolves the build directory: a user-supplied path is created and
/// canonicalized, otherwise a temporary directory is created whose guard
/// deletes it when the run finishes.
///
/// 解析构建目录：用户提供的路径会被创建并规范化，
/// 否则创建一个临时目录，其 guard 在运行结束时删除它。
fn prepare_build_dir(
    label: &str,
    build_dir: Option<PathBuf>,
) -> Result<(PathBuf, Option<TempDir>)> {
    match build_dir {
        Some(dir) => {
            ensure_dir(&dir)?;
            let path = fs::canonicalize(&dir)
                .with_context(|| t!("build_dir_not_found", path = dir.display()))?;
            Ok((path, None))
        }
        None => {
            let guard = create_build_dir(label)?;
            let path = guard.path().to_path_buf();
            Ok((path, Some(guard)))
        }
    }
}

fn setup_signal_handler(locale: &str) -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl-C");
        println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
        token_clone.cancel();
    });

    Ok(token)
}

fn write_json_report(report: &RunReport, path: &Path) -> Result<()> {
    let payload = serde_json::to_string_pretty(report)
        .context(t!("json_serialize_failed"))?;
    fs::write(path, payload)
        .with_context(|| t!("json_write_failed", path = path.display()))?;
    Ok(())
}
