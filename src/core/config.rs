//! # Configuration Module / 配置模块
//!
//! Defines the build descriptor loaded from a TOML plan file: the project
//! being tested, where its source comes from, free-form runner settings,
//! and the per-module test selection rules that drive discovery and
//! planning.
//!
//! 定义从 TOML 计划文件加载的构建描述符：被测项目、
//! 其源码的来源、自由格式的运行器设置，
//! 以及驱动发现和规划的每模块测试选择规则。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::models::RunnerError;
use crate::infra::t;

/// Default wall-clock budget for one container command.
/// 单个容器命令的默认实际时间预算。
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default wall-clock budget for the image build.
/// 镜像构建的默认实际时间预算。
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(1800);

/// The project under test and the image it builds in.
/// 被测项目及其构建所在的镜像。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectSpec {
    /// Project name, used for the checkout directory inside the image and
    /// as the stem of the default run label.
    /// 项目名称，用于镜像内的检出目录，也作为默认运行标签的词干。
    pub name: String,
    /// Base image the build recipe starts from (e.g. "ubuntu:22.04").
    /// Only RPM- and APT-family images are supported.
    /// 构建配方的基础镜像（例如 "ubuntu:22.04"）。
    /// 仅支持 RPM 和 APT 系列镜像。
    pub base_image: String,
    /// Distribution packages installed into the image before the source
    /// checkout (build toolchain, JDK, and so on).
    /// 在源码检出之前安装到镜像中的发行版软件包（构建工具链、JDK 等）。
    #[serde(default)]
    pub required_packages: BTreeSet<String>,
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// Defaults to "en" if not specified.
    ///
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    /// 如果未指定，则默认为 "en"。
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// Where the project source comes from. The `kind` selects a code source
/// implementation; the remaining fields are interpreted by that kind.
///
/// 项目源码的来源。`kind` 选择一个代码源实现；
/// 其余字段由该实现解释。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceSpec {
    /// Source kind: "git" or "tarball".
    /// 源码类型："git" 或 "tarball"。
    pub kind: String,
    /// Clone or download URL.
    /// 克隆或下载 URL。
    #[serde(default)]
    pub url: String,
    /// Branch to clone (git only). The default branch when absent.
    /// 要克隆的分支（仅 git）。缺省时为默认分支。
    #[serde(default)]
    pub branch: Option<String>,
    /// Leading path components stripped during extraction (tarball only).
    /// 解压时剥离的前导路径组件数（仅 tarball）。
    #[serde(default)]
    pub strip_components: Option<u32>,
}

/// How one module's file selection is expressed. At most one of the three
/// file fields may be set on a module; this enum is the resolved view.
///
/// 单个模块文件选择的表达方式。一个模块上最多只能设置三个
/// 文件字段之一；此枚举是解析后的视图。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSelection<'a> {
    /// A literal list of test files, in the given order.
    /// 按给定顺序的测试文件字面列表。
    List(&'a [String]),
    /// A directory to scan for files with the configured suffix.
    /// 要扫描的目录，查找具有配置后缀的文件。
    Dir(&'a str),
    /// Named properties whose values are comma-separated file lists.
    /// 命名属性，其值为逗号分隔的文件列表。
    Properties(&'a [String]),
}

/// One module directory of the project and its test selection rules.
/// Every module produces zero or more container commands.
///
/// 项目的一个模块目录及其测试选择规则。
/// 每个模块产生零个或多个容器命令。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleDirectory {
    /// Path of the module relative to the project root, e.g. "ql" or
    /// "itests/qtest". Commands `cd` here before running the build tool.
    /// 模块相对于项目根目录的路径，例如 "ql" 或 "itests/qtest"。
    /// 命令在运行构建工具之前会 `cd` 到这里。
    pub dir: String,
    /// Run exactly this one test class. Mutually exclusive with
    /// `needs_split`; required when any file field is set, because file
    /// selections are handed to a single driver class.
    /// 只运行这一个测试类。与 `needs_split` 互斥；
    /// 设置任何文件字段时必需，因为文件选择会交给单个驱动类。
    #[serde(default)]
    pub single_test: Option<String>,
    /// Discover the module's test classes and shard them over several
    /// containers instead of running the module in one piece.
    /// 发现模块的测试类并将它们分片到多个容器中，
    /// 而不是整体运行该模块。
    #[serde(default)]
    pub needs_split: bool,
    /// Upper bound on tests per batch when splitting. Values below 1 are
    /// treated as 1.
    /// 拆分时每批测试数量的上限。小于 1 的值按 1 处理。
    #[serde(default = "default_tests_per_container")]
    pub tests_per_container: usize,
    /// Test classes dropped from the run entirely.
    /// 完全从运行中删除的测试类。
    #[serde(default)]
    pub skipped_tests: BTreeSet<String>,
    /// Test classes that each get a dedicated container.
    /// 每个都获得专用容器的测试类。
    #[serde(default)]
    pub isolated_tests: BTreeSet<String>,
    /// Extra `-Dkey=value` properties appended to every command of this
    /// module.
    /// 附加到此模块每个命令的额外 `-Dkey=value` 属性。
    #[serde(default)]
    pub mvn_properties: BTreeMap<String, String>,
    /// Environment assignments prefixed to every command of this module.
    /// 为此模块的每个命令添加的环境变量前缀。
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Literal test file list, preserved in order.
    /// 按顺序保留的测试文件字面列表。
    #[serde(default)]
    pub file_list: Option<Vec<String>>,
    /// Directory scanned for test files, relative to the source root.
    /// 扫描测试文件的目录，相对于源码根目录。
    #[serde(default)]
    pub file_list_dir: Option<String>,
    /// Property names read from the project properties file; each value is
    /// a comma-separated file list, concatenated in declaration order.
    /// 从项目属性文件读取的属性名；每个值都是逗号分隔的文件列表，
    /// 按声明顺序连接。
    #[serde(default)]
    pub file_list_properties: Option<Vec<String>>,
    /// Test files dropped from the run entirely (file selections only).
    /// 完全从运行中删除的测试文件（仅文件选择）。
    #[serde(default)]
    pub skipped_files: BTreeSet<String>,
    /// Test files that each get a dedicated container (file selections only).
    /// 每个都获得专用容器的测试文件（仅文件选择）。
    #[serde(default)]
    pub isolated_files: BTreeSet<String>,
}

fn default_tests_per_container() -> usize {
    1
}

impl Default for ModuleDirectory {
    fn default() -> Self {
        Self {
            dir: String::new(),
            single_test: None,
            needs_split: false,
            tests_per_container: 1,
            skipped_tests: BTreeSet::new(),
            isolated_tests: BTreeSet::new(),
            mvn_properties: BTreeMap::new(),
            env: BTreeMap::new(),
            file_list: None,
            file_list_dir: None,
            file_list_properties: None,
            skipped_files: BTreeSet::new(),
            isolated_files: BTreeSet::new(),
        }
    }
}

impl ModuleDirectory {
    /// Checks the structural invariants of this module. Any violation is a
    /// fatal configuration error; no partial schedule is ever produced from
    /// an invalid module.
    ///
    /// 检查此模块的结构不变量。任何违反都是致命的配置错误；
    /// 绝不会从无效模块产生部分调度。
    pub fn validate(&self) -> Result<()> {
        let file_fields = [
            self.file_list.is_some(),
            self.file_list_dir.is_some(),
            self.file_list_properties.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if file_fields > 1 {
            return Err(
                RunnerError::Configuration(t!("config.file_fields_conflict", dir = self.dir).to_string()).into(),
            );
        }
        if file_fields == 1 && self.single_test.is_none() {
            return Err(RunnerError::Configuration(
                t!("config.file_fields_need_single_test", dir = self.dir).to_string(),
            )
            .into());
        }
        if self.needs_split && self.single_test.is_some() {
            return Err(
                RunnerError::Configuration(t!("config.split_single_conflict", dir = self.dir).to_string()).into(),
            );
        }
        Ok(())
    }

    /// The resolved file selection, if any of the three file fields is set.
    /// 如果设置了三个文件字段中的任何一个，则为解析后的文件选择。
    pub fn file_selection(&self) -> Option<FileSelection<'_>> {
        if let Some(list) = &self.file_list {
            return Some(FileSelection::List(list));
        }
        if let Some(dir) = &self.file_list_dir {
            return Some(FileSelection::Dir(dir));
        }
        if let Some(keys) = &self.file_list_properties {
            return Some(FileSelection::Properties(keys));
        }
        None
    }

    /// Whether tests are selected by file rather than by class.
    /// 测试是按文件而不是按类选择的。
    pub fn is_file_mode(&self) -> bool {
        self.file_selection().is_some()
    }

    /// Whether the module runs as one unsplit command. Such modules never
    /// consult discovery output; their selection comes straight from the
    /// configuration.
    ///
    /// 模块是否作为一个未拆分的命令运行。此类模块从不查询发现输出；
    /// 它们的选择直接来自配置。
    pub fn runs_whole(&self) -> bool {
        !self.needs_split && self.file_selection().is_none()
    }

    /// The skip set that applies to this module's identifiers.
    /// 适用于此模块标识符的跳过集合。
    pub fn skip_set(&self) -> &BTreeSet<String> {
        if self.is_file_mode() {
            &self.skipped_files
        } else {
            &self.skipped_tests
        }
    }

    /// The isolation set that applies to this module's identifiers.
    /// 适用于此模块标识符的隔离集合。
    pub fn isolation_set(&self) -> &BTreeSet<String> {
        if self.is_file_mode() {
            &self.isolated_files
        } else {
            &self.isolated_tests
        }
    }
}

/// Represents the entire build descriptor, loaded from a TOML plan file.
/// It names the project, its source, runner settings, and all modules.
///
/// 代表从 TOML 计划文件加载的整个构建描述符。
/// 它指定项目、源码、运行器设置和所有模块。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildDescriptor {
    /// The project under test.
    /// 被测项目。
    pub project: ProjectSpec,
    /// Where the project source comes from.
    /// 项目源码的来源。
    pub source: SourceSpec,
    /// Free-form string settings, read through [`Settings`].
    /// 自由格式的字符串设置，通过 [`Settings`] 读取。
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    /// All module directories, in descriptor order. Command emission
    /// preserves this order.
    /// 所有模块目录，按描述符顺序排列。命令发射保留此顺序。
    #[serde(default)]
    pub modules: Vec<ModuleDirectory>,
}

impl BuildDescriptor {
    /// A typed view over the `settings` table.
    /// `settings` 表的类型化视图。
    pub fn settings(&self) -> Settings {
        Settings::new(self.settings.clone())
    }
}

/// Typed accessors over the descriptor's string settings. Known keys:
///
/// * `engine.binary` — container engine executable (default "docker")
/// * `engine.run_args` — extra engine `run` arguments, shell-split
/// * `engine.build_timeout` — image build deadline (default "1800s")
/// * `engine.success_marker` — substring accepting a build (default
///   "Successfully built")
/// * `engine.cache_marker` — substring accepting a cached build (default
///   "Using cache")
/// * `run.timeout` — per-command deadline (default "3600s")
/// * `project.build_command` — build tool invocation (default "mvn -B test")
/// * `project.source_root` — host checkout scanned by discovery (default ".")
/// * `project.properties_file` — properties resource for file lists
/// * `discovery.file_suffix` — test file suffix (default ".q")
/// * `discovery.exclude` — path substring excluded from file scans
/// * `discovery.class_prefix` — test class prefix (default "Test")
/// * `discovery.class_suffix` — test class file suffix (default ".java")
///
/// Durations accept plain seconds or an `s`/`m`/`h` suffix.
///
/// 描述符字符串设置的类型化访问器。
/// 持续时间接受纯秒数或 `s`/`m`/`h` 后缀。
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// The raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The string value for `key`, or `default` when absent.
    /// `key` 的字符串值，缺省时为 `default`。
    pub fn str_or(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// The duration value for `key`, or `default` when absent. A malformed
    /// value is a fatal configuration error.
    /// `key` 的持续时间值，缺省时为 `default`。格式错误的值是致命的配置错误。
    pub fn duration_or(&self, key: &str, default: Duration) -> Result<Duration> {
        match self.values.get(key) {
            None => Ok(default),
            Some(raw) => parse_duration(raw).ok_or_else(|| {
                RunnerError::Configuration(t!("config.bad_duration", key = key, value = raw).to_string()).into()
            }),
        }
    }

    /// The integer value for `key`, or `default` when absent.
    /// `key` 的整数值，缺省时为 `default`。
    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize> {
        match self.values.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                RunnerError::Configuration(t!("config.bad_number", key = key, value = raw).to_string()).into()
            }),
        }
    }

    /// The boolean value for `key`, or `default` when absent.
    /// `key` 的布尔值，缺省时为 `default`。
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            None => Ok(default),
            Some(raw) => match raw.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(
                    RunnerError::Configuration(t!("config.bad_bool", key = key, value = raw).to_string()).into(),
                ),
            },
        }
    }
}

/// Parses "90", "90s", "15m" or "2h" into a duration.
fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, scale) = match raw.as_bytes().last()? {
        b'h' => (&raw[..raw.len() - 1], 3600),
        b'm' => (&raw[..raw.len() - 1], 60),
        b's' => (&raw[..raw.len() - 1], 1),
        _ => (raw, 1),
    };
    let value: u64 = digits.trim().parse().ok()?;
    Some(Duration::from_secs(value * scale))
}

/// Loads and validates a build descriptor from `path`. Parse errors and
/// module invariant violations both abort the run before anything is built.
///
/// 从 `path` 加载并验证构建描述符。解析错误和模块不变量违反
/// 都会在构建任何内容之前中止运行。
pub fn load_descriptor(path: &Path) -> Result<BuildDescriptor> {
    let raw = fs::read_to_string(path)
        .with_context(|| t!("config.read_failed", path = path.display()).to_string())?;
    let descriptor: BuildDescriptor = toml::from_str(&raw)
        .with_context(|| t!("config.parse_failed", path = path.display()).to_string())?;
    for module in &descriptor.modules {
        module.validate()?;
    }
    Ok(descriptor)
}
