//! # Test Discovery Module / 测试发现模块
//!
//! Turns each module's selection rules into concrete test identifiers by
//! probing a host-side checkout of the project: literal lists pass through
//! untouched, directories are scanned for test files, properties files
//! contribute named lists, and split modules get a sorted scan of their
//! test classes. Discovered identifiers are then filtered through the
//! module's skip and isolation sets.
//!
//! 通过探测宿主机上的项目检出，将每个模块的选择规则转化为具体的
//! 测试标识符：字面列表原样传递，目录被扫描以查找测试文件，
//! 属性文件提供命名列表，拆分模块获得其测试类的排序扫描。
//! 发现的标识符随后通过模块的跳过和隔离集合进行过滤。

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{FileSelection, ModuleDirectory, Settings};
use crate::core::models::RunnerError;
use crate::infra::t;

/// The identifiers one module will run, already filtered. `batched` keeps
/// discovery order and is chunked by the planner; every entry of
/// `isolated` gets a container of its own.
///
/// 单个模块将运行的标识符，已经过过滤。`batched` 保留发现顺序并由
/// 规划器分块；`isolated` 的每个条目都有自己的容器。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredTests {
    /// Identifiers to be grouped into batches, in discovery order.
    /// 要分组成批的标识符，按发现顺序排列。
    pub batched: Vec<String>,
    /// Identifiers that each run alone, in discovery order.
    /// 各自单独运行的标识符，按发现顺序排列。
    pub isolated: Vec<String>,
}

impl DiscoveredTests {
    pub fn is_empty(&self) -> bool {
        self.batched.is_empty() && self.isolated.is_empty()
    }
}

/// Host-side test discovery over the project checkout named by
/// `project.source_root`. Unsplit modules without file selections never
/// touch the filesystem.
///
/// 对 `project.source_root` 指定的项目检出进行宿主机端测试发现。
/// 没有文件选择的未拆分模块从不接触文件系统。
#[derive(Debug)]
pub struct TestDiscovery {
    source_root: PathBuf,
    properties_file: PathBuf,
    file_suffix: String,
    exclude: String,
    class_prefix: String,
    class_suffix: String,
}

impl TestDiscovery {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let source_root = expand_path(&settings.str_or("project.source_root", "."))?;
        let mut properties_file = expand_path(&settings.str_or(
            "project.properties_file",
            "testconfiguration.properties",
        ))?;
        if properties_file.is_relative() {
            properties_file = source_root.join(properties_file);
        }
        Ok(Self {
            source_root,
            properties_file,
            file_suffix: settings.str_or("discovery.file_suffix", ".q"),
            exclude: settings.str_or("discovery.exclude", ""),
            class_prefix: settings.str_or("discovery.class_prefix", "Test"),
            class_suffix: settings.str_or("discovery.class_suffix", ".java"),
        })
    }

    /// Resolves one module's selection rules to filtered identifiers.
    /// 将单个模块的选择规则解析为过滤后的标识符。
    pub fn discover(&self, module: &ModuleDirectory) -> Result<DiscoveredTests> {
        module.validate()?;
        let identifiers = if module.needs_split {
            self.scan_classes(&module.dir)?
        } else {
            match (module.single_test.as_deref(), module.file_selection()) {
                (Some(name), None) => vec![name.to_string()],
                (Some(_), Some(FileSelection::List(list))) => list.to_vec(),
                (Some(_), Some(FileSelection::Dir(dir))) => self.scan_files(dir)?,
                (Some(_), Some(FileSelection::Properties(keys))) => self.read_properties(keys)?,
                (None, _) => Vec::new(),
            }
        };
        Ok(split_filtered(identifiers, module))
    }

    /// Scans a directory tree for test files with the configured suffix,
    /// dropping any path that contains the exclusion substring. Identifiers
    /// are bare file names, in scan order.
    ///
    /// 扫描目录树以查找具有配置后缀的测试文件，
    /// 丢弃任何包含排除子串的路径。标识符是纯文件名，按扫描顺序排列。
    fn scan_files(&self, dir: &str) -> Result<Vec<String>> {
        let root = self.source_root.join(dir);
        let mut found = Vec::new();
        walk(&root, &mut |path| {
            if !self.exclude.is_empty() && path.to_string_lossy().contains(&self.exclude) {
                return;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(&self.file_suffix) {
                    found.push(name.to_string());
                }
            }
        })?;
        Ok(found)
    }

    /// Scans a module's tree for test class files and returns the class
    /// names sorted alphabetically, so batch composition is stable across
    /// runs and machines.
    ///
    /// 扫描模块的目录树以查找测试类文件，并返回按字母顺序排序的类名，
    /// 因此批次组成在不同运行和机器之间保持稳定。
    fn scan_classes(&self, module_dir: &str) -> Result<Vec<String>> {
        let root = self.source_root.join(module_dir);
        let mut classes = Vec::new();
        walk(&root, &mut |path| {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with(&self.class_prefix) && name.ends_with(&self.class_suffix) {
                    classes.push(name[..name.len() - self.class_suffix.len()].to_string());
                }
            }
        })?;
        classes.sort();
        classes.dedup();
        Ok(classes)
    }

    /// Reads the named properties from the project properties file. Each
    /// value is a comma-separated file list; all requested keys are
    /// concatenated in declaration order. A key missing from the file
    /// contributes nothing.
    ///
    /// 从项目属性文件读取命名属性。每个值都是逗号分隔的文件列表；
    /// 所有请求的键按声明顺序连接。文件中缺少的键不贡献任何内容。
    fn read_properties(&self, keys: &[String]) -> Result<Vec<String>> {
        let raw = fs::read_to_string(&self.properties_file).with_context(|| {
            t!(
                "discovery.properties_read_failed",
                path = self.properties_file.display()
            )
            .to_string()
        })?;
        let table = parse_properties(&raw);
        let mut files = Vec::new();
        for key in keys {
            if let Some(value) = table.get(key) {
                files.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from),
                );
            }
        }
        Ok(files)
    }
}

/// Depth-first file walk. Directories are recursed, files are visited.
fn walk(dir: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| t!("discovery.scan_failed", path = dir.display()).to_string())?;
    for entry in entries {
        let path = entry
            .with_context(|| t!("discovery.scan_failed", path = dir.display()).to_string())?
            .path();
        if path.is_dir() {
            walk(&path, visit)?;
        } else {
            visit(&path);
        }
    }
    Ok(())
}

/// Applies the module's skip and isolation sets. Skipped identifiers are
/// dropped entirely; isolated identifiers are pulled out of the main list.
/// 应用模块的跳过和隔离集合。跳过的标识符被完全丢弃；
/// 隔离的标识符从主列表中抽出。
fn split_filtered(identifiers: Vec<String>, module: &ModuleDirectory) -> DiscoveredTests {
    let skip = module.skip_set();
    let isolate = module.isolation_set();
    let mut batched = Vec::new();
    let mut isolated = Vec::new();
    for id in identifiers {
        if skip.contains(&id) {
            continue;
        }
        if isolate.contains(&id) {
            isolated.push(id);
        } else {
            batched.push(id);
        }
    }
    DiscoveredTests { batched, isolated }
}

/// Expands `~` and environment variables in a user-supplied path.
fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).map_err(|e| {
        RunnerError::Configuration(t!("config.bad_path", value = raw, error = e).to_string())
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Parses the `key=value` subset of the Java properties format: `#` and `!`
/// start comment lines, and a trailing `\` continues the value on the next
/// line. That subset is all the test configuration files in the wild use.
///
/// 解析 Java 属性格式的 `key=value` 子集：`#` 和 `!` 开始注释行，
/// 行尾的 `\` 将值延续到下一行。实际使用的测试配置文件只用到这个子集。
fn parse_properties(raw: &str) -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    let mut lines = raw.lines();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, first)) = line.split_once('=') else {
            continue;
        };
        let mut value = first.trim().to_string();
        while value.ends_with('\\') {
            value.pop();
            match lines.next() {
                Some(next) => value.push_str(next.trim()),
                None => break,
            }
        }
        table.insert(key.trim().to_string(), value);
    }
    table
}
