// Shared test fixtures: a hive-flavoured build plan and helpers derived from it
#![allow(dead_code)]

use shard_runner::config::BuildDescriptor;
use shard_runner::core::source;
use shard_runner::models::BuildInfo;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A complete plan covering every module shape: whole-module runs with and
/// without a skip filter, split modules with different batch sizes, and a
/// single-test module whose directory needs sanitizing.
///
/// 覆盖所有模块形态的完整计划：带与不带跳过过滤器的整模块运行、
/// 不同批次大小的拆分模块，以及目录需要清理的单测试模块。
pub fn sample_plan_toml() -> &'static str {
    r#"
[project]
name = "hive"
base_image = "ubuntu:22.04"
required_packages = ["git", "maven", "openjdk-17-jdk-headless"]
language = "en"

[source]
kind = "git"
url = "https://github.com/example/hive.git"
branch = "release-4.1"

[settings]
"run.timeout" = "3600"
"project.build_command" = "mvn -B test"

[[modules]]
dir = "beeline"

[[modules]]
dir = "cli"
skipped_tests = ["TestCliDriverMethods"]

[[modules]]
dir = "standalone-metastore"
needs_split = true
tests_per_container = 1

[[modules]]
dir = "ql"
needs_split = true
tests_per_container = 2
skipped_tests = ["TestWorker"]
isolated_tests = ["TestCleaner2"]

[[modules]]
dir = "itests/qtest"
single_test = "TestContribCliDriver"
"#
}

pub fn sample_descriptor() -> BuildDescriptor {
    toml::from_str(sample_plan_toml()).expect("Failed to parse sample plan")
}

pub fn sample_build_info(cleanup: bool) -> Arc<BuildInfo> {
    let descriptor = sample_descriptor();
    let source = source::resolve(&descriptor.source).expect("Failed to resolve sample source");
    Arc::new(BuildInfo::new(
        "Hive-Nightly",
        descriptor,
        source,
        PathBuf::from("build"),
        cleanup,
    ))
}

pub fn write_plan(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("ShardPlan.toml");
    fs::write(&path, content).expect("Failed to write plan file");
    path
}
