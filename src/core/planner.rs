//! # Container Command Planner Module / 容器命令规划模块
//!
//! Turns modules and their discovered tests into the ordered list of
//! container commands for one run: isolated tests first, one container
//! each, then batches bounded by the module's tests-per-container limit.
//! Command order follows descriptor order, so a plan is reproducible
//! from the descriptor and the discovery output alone.
//!
//! 将模块及其发现的测试转化为一次运行的有序容器命令列表：
//! 先是隔离测试，每个一个容器，然后是受模块每容器测试数限制的批次。
//! 命令顺序遵循描述符顺序，因此仅从描述符和发现输出即可重现计划。

use anyhow::Result;
use std::collections::HashSet;

use crate::core::config::{BuildDescriptor, ModuleDirectory, Settings, DEFAULT_RUN_TIMEOUT};
use crate::core::discovery::DiscoveredTests;
use crate::core::models::{ContainerCommand, RunnerError};
use crate::infra::container::container_project_root;
use crate::infra::fs::sanitize_token;
use crate::infra::t;

/// Plans the container commands for one run.
///
/// `discovered` pairs every module with its filtered discovery output, in
/// descriptor order. Unsplit modules ignore the discovery lists and take
/// their selection straight from the configuration: the single test when
/// one is named, otherwise an exclusion filter built from the skip set.
/// Any invariant violation or duplicate shard suffix aborts planning for
/// the whole run; no partial schedule is produced.
///
/// 为一次运行规划容器命令。
/// `discovered` 将每个模块与其过滤后的发现输出按描述符顺序配对。
/// 未拆分的模块忽略发现列表，直接从配置中获取其选择：
/// 指定了单个测试时为该测试，否则为由跳过集合构建的排除过滤器。
/// 任何不变量违反或重复的分片后缀都会中止整个运行的规划；
/// 不会产生部分调度。
pub fn plan(
    descriptor: &BuildDescriptor,
    discovered: &[(ModuleDirectory, DiscoveredTests)],
    settings: &Settings,
) -> Result<Vec<ContainerCommand>> {
    let run_timeout = settings.duration_or("run.timeout", DEFAULT_RUN_TIMEOUT)?;
    let build_command = settings.str_or("project.build_command", "mvn -B test");
    let project_root = container_project_root(&descriptor.project.name);

    let mut emitter = Emitter {
        build_command: &build_command,
        timeout_secs: run_timeout.as_secs(),
        project_root: &project_root,
        seen: HashSet::new(),
        commands: Vec::new(),
    };

    for (module, tests) in discovered {
        module.validate()?;

        if module.runs_whole() {
            let selection = whole_module_selection(module);
            emitter.emit(module, selection, module.dir.clone())?;
            continue;
        }

        // Isolated tests come first so the slowest known offenders start
        // as early as possible.
        // 隔离测试放在最前面，以便已知最慢的测试尽早启动。
        for test in &tests.isolated {
            let selection = selection_flag(module, std::slice::from_ref(test));
            emitter.emit(module, selection, format!("{}_{}", module.dir, test))?;
        }

        let batch_size = module.tests_per_container.max(1);
        for (index, chunk) in tests.batched.chunks(batch_size).enumerate() {
            let selection = selection_flag(module, chunk);
            emitter.emit(module, selection, format!("{}_{}", module.dir, index + 1))?;
        }
    }

    Ok(emitter.commands)
}

/// Accumulates commands while enforcing run-wide suffix uniqueness.
struct Emitter<'a> {
    build_command: &'a str,
    timeout_secs: u64,
    project_root: &'a str,
    seen: HashSet<String>,
    commands: Vec<ContainerCommand>,
}

impl Emitter<'_> {
    fn emit(&mut self, module: &ModuleDirectory, selection: String, raw_suffix: String) -> Result<()> {
        let suffix = sanitize_token(&raw_suffix);
        if !self.seen.insert(suffix.clone()) {
            return Err(
                RunnerError::Configuration(t!("planner.duplicate_suffix", suffix = suffix).to_string()).into(),
            );
        }

        let mut command = format!("cd {} && ", module.dir);
        for (key, value) in &module.env {
            command.push_str(&format!("{}={} ", key, value));
        }
        command.push_str(self.build_command);
        command.push_str(&format!(" -Dsurefire.timeout={}", self.timeout_secs));
        command.push_str(&selection);
        for (key, value) in &module.mvn_properties {
            command.push_str(&format!(" -D{}={}", key, value));
        }

        let log_files = vec![format!(
            "{}/{}/target/surefire-reports",
            self.project_root, module.dir
        )];

        self.commands.push(ContainerCommand {
            command,
            suffix,
            log_files,
        });
        Ok(())
    }
}

/// Selection for a module that runs as one command: the named single test,
/// an exclusion filter over the skip set, or nothing at all.
/// 作为单个命令运行的模块的选择：指定的单个测试、
/// 基于跳过集合的排除过滤器，或什么都没有。
fn whole_module_selection(module: &ModuleDirectory) -> String {
    if let Some(single) = &module.single_test {
        return format!(" -Dtest={}", single);
    }
    if module.skipped_tests.is_empty() {
        return String::new();
    }
    let exclusions: Vec<String> = module
        .skipped_tests
        .iter()
        .map(|name| format!("!{}", name))
        .collect();
    format!(" -Dtest={}", exclusions.join(","))
}

/// Selection for one shard of a split or file-selected module. File mode
/// hands the files to the module's single driver class.
/// 拆分或文件选择模块的一个分片的选择。
/// 文件模式将文件交给模块的单个驱动类。
fn selection_flag(module: &ModuleDirectory, identifiers: &[String]) -> String {
    let joined = identifiers.join(",");
    if module.is_file_mode() {
        let driver = module.single_test.as_deref().unwrap_or_default();
        format!(" -Dtest={} -Dqfile={}", driver, joined)
    } else {
        format!(" -Dtest={}", joined)
    }
}
