//! # Config Module Unit Tests / Config 模块单元测试
//!
//! This module contains unit tests for the `config.rs` module, covering
//! descriptor parsing, module invariant validation, and the typed settings
//! accessors.
//!
//! 此模块包含 `config.rs` 模块的单元测试，涵盖描述符解析、
//! 模块不变量验证以及类型化的设置访问器。

mod common;

use shard_runner::config::{
    load_descriptor, BuildDescriptor, FileSelection, ModuleDirectory, Settings,
    DEFAULT_RUN_TIMEOUT,
};
use std::collections::BTreeMap;
use std::time::Duration;

#[cfg(test)]
mod descriptor_tests {
    use super::*;

    #[test]
    fn test_minimal_descriptor_defaults() {
        let toml_str = r#"
[project]
name = "hive"
base_image = "ubuntu:22.04"

[source]
kind = "git"
url = "https://github.com/example/hive.git"
"#;
        let descriptor: BuildDescriptor = toml::from_str(toml_str).unwrap();

        assert_eq!(descriptor.project.name, "hive");
        assert_eq!(descriptor.project.language, "en");
        assert!(descriptor.project.required_packages.is_empty());
        assert_eq!(descriptor.source.branch, None);
        assert!(descriptor.settings.is_empty());
        assert!(descriptor.modules.is_empty());
    }

    #[test]
    fn test_full_descriptor_parses() {
        let descriptor = common::sample_descriptor();

        assert_eq!(descriptor.modules.len(), 5);
        assert_eq!(descriptor.source.branch.as_deref(), Some("release-4.1"));
        assert!(descriptor.project.required_packages.contains("maven"));

        let ql = &descriptor.modules[3];
        assert_eq!(ql.dir, "ql");
        assert!(ql.needs_split);
        assert_eq!(ql.tests_per_container, 2);
        assert!(ql.skipped_tests.contains("TestWorker"));
        assert!(ql.isolated_tests.contains("TestCleaner2"));
    }

    #[test]
    fn test_module_field_defaults() {
        let toml_str = r#"dir = "beeline""#;
        let module: ModuleDirectory = toml::from_str(toml_str).unwrap();

        assert_eq!(module.single_test, None);
        assert!(!module.needs_split);
        assert_eq!(module.tests_per_container, 1);
        assert!(module.skipped_tests.is_empty());
        assert!(module.mvn_properties.is_empty());
        assert_eq!(module.file_list, None);
    }

    /// Module directories are free-form paths and may contain non-ASCII
    /// text; parsing must preserve them byte for byte.
    ///
    /// 模块目录是自由格式路径，可能包含非 ASCII 文本；
    /// 解析必须逐字节保留它们。
    #[test]
    fn test_unicode_module_dir() {
        let toml_str = r#"
[project]
name = "项目"
base_image = "ubuntu:22.04"

[source]
kind = "git"
url = "https://example.com/repo.git"

[[modules]]
dir = "服务/核心"
"#;
        let descriptor: BuildDescriptor = toml::from_str(toml_str).unwrap();
        assert_eq!(descriptor.project.name, "项目");
        assert_eq!(descriptor.modules[0].dir, "服务/核心");
        assert!(descriptor.modules[0].validate().is_ok());
    }
}

#[cfg(test)]
mod module_validation_tests {
    use super::*;

    #[test]
    fn test_valid_shapes_pass() {
        let whole = ModuleDirectory {
            dir: "beeline".to_string(),
            ..Default::default()
        };
        let split = ModuleDirectory {
            dir: "ql".to_string(),
            needs_split: true,
            ..Default::default()
        };
        let file_mode = ModuleDirectory {
            dir: "itests".to_string(),
            single_test: Some("TestCliDriver".to_string()),
            file_list: Some(vec!["a.q".to_string()]),
            ..Default::default()
        };

        assert!(whole.validate().is_ok());
        assert!(split.validate().is_ok());
        assert!(file_mode.validate().is_ok());
    }

    #[test]
    fn test_multiple_file_fields_rejected() {
        let module = ModuleDirectory {
            dir: "itests".to_string(),
            single_test: Some("TestCliDriver".to_string()),
            file_list: Some(vec!["a.q".to_string()]),
            file_list_dir: Some("queries".to_string()),
            ..Default::default()
        };

        let err = module.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
        assert!(err.to_string().contains("itests"));
    }

    #[test]
    fn test_file_field_without_single_test_rejected() {
        let module = ModuleDirectory {
            dir: "itests".to_string(),
            file_list_dir: Some("queries".to_string()),
            ..Default::default()
        };

        let err = module.validate().unwrap_err();
        assert!(err.to_string().contains("single_test"));
    }

    #[test]
    fn test_split_with_single_test_rejected() {
        let module = ModuleDirectory {
            dir: "ql".to_string(),
            needs_split: true,
            single_test: Some("TestCleaner".to_string()),
            ..Default::default()
        };

        let err = module.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_file_selection_resolution() {
        let files = vec!["a.q".to_string(), "b.q".to_string()];
        let by_list = ModuleDirectory {
            dir: "itests".to_string(),
            single_test: Some("TestCliDriver".to_string()),
            file_list: Some(files.clone()),
            ..Default::default()
        };
        let by_dir = ModuleDirectory {
            dir: "itests".to_string(),
            single_test: Some("TestCliDriver".to_string()),
            file_list_dir: Some("queries".to_string()),
            ..Default::default()
        };
        let plain = ModuleDirectory {
            dir: "beeline".to_string(),
            ..Default::default()
        };

        assert_eq!(by_list.file_selection(), Some(FileSelection::List(&files)));
        assert_eq!(by_dir.file_selection(), Some(FileSelection::Dir("queries")));
        assert_eq!(plain.file_selection(), None);

        assert!(by_list.is_file_mode());
        assert!(!plain.is_file_mode());
    }

    #[test]
    fn test_runs_whole() {
        let whole = ModuleDirectory {
            dir: "beeline".to_string(),
            ..Default::default()
        };
        let single_only = ModuleDirectory {
            dir: "itests/qtest".to_string(),
            single_test: Some("TestContribCliDriver".to_string()),
            ..Default::default()
        };
        let split = ModuleDirectory {
            dir: "ql".to_string(),
            needs_split: true,
            ..Default::default()
        };
        let file_mode = ModuleDirectory {
            dir: "itests".to_string(),
            single_test: Some("TestCliDriver".to_string()),
            file_list: Some(vec!["a.q".to_string()]),
            ..Default::default()
        };

        assert!(whole.runs_whole());
        assert!(single_only.runs_whole());
        assert!(!split.runs_whole());
        assert!(!file_mode.runs_whole());
    }

    /// Skip and isolation sets switch between the class and file variants
    /// depending on the module's selection mode.
    ///
    /// 跳过和隔离集合根据模块的选择模式在类变体和文件变体之间切换。
    #[test]
    fn test_skip_and_isolation_sets_follow_mode() {
        let mut module = ModuleDirectory {
            dir: "itests".to_string(),
            needs_split: true,
            ..Default::default()
        };
        module.skipped_tests.insert("TestWorker".to_string());
        module.isolated_tests.insert("TestCleaner".to_string());
        module.skipped_files.insert("slow.q".to_string());
        module.isolated_files.insert("huge.q".to_string());

        assert!(module.skip_set().contains("TestWorker"));
        assert!(module.isolation_set().contains("TestCleaner"));

        module.needs_split = false;
        module.single_test = Some("TestCliDriver".to_string());
        module.file_list = Some(vec!["a.q".to_string()]);

        assert!(module.skip_set().contains("slow.q"));
        assert!(module.isolation_set().contains("huge.q"));
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let values: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::new(values)
    }

    #[test]
    fn test_str_or() {
        let s = settings(&[("engine.binary", "podman")]);
        assert_eq!(s.str_or("engine.binary", "docker"), "podman");
        assert_eq!(s.str_or("engine.missing", "docker"), "docker");
        assert_eq!(s.get("engine.binary"), Some("podman"));
        assert_eq!(s.get("engine.missing"), None);
    }

    #[test]
    fn test_duration_units() {
        let s = settings(&[
            ("plain", "90"),
            ("seconds", "45s"),
            ("minutes", "30m"),
            ("hours", "2h"),
            ("padded", " 90 "),
        ]);
        let fallback = Duration::from_secs(7);

        assert_eq!(s.duration_or("plain", fallback).unwrap(), Duration::from_secs(90));
        assert_eq!(s.duration_or("seconds", fallback).unwrap(), Duration::from_secs(45));
        assert_eq!(s.duration_or("minutes", fallback).unwrap(), Duration::from_secs(1800));
        assert_eq!(s.duration_or("hours", fallback).unwrap(), Duration::from_secs(7200));
        assert_eq!(s.duration_or("padded", fallback).unwrap(), Duration::from_secs(90));
        assert_eq!(s.duration_or("absent", fallback).unwrap(), fallback);
    }

    #[test]
    fn test_malformed_duration_is_fatal() {
        let s = settings(&[("run.timeout", "soon")]);
        let err = s.duration_or("run.timeout", DEFAULT_RUN_TIMEOUT).unwrap_err();
        assert!(err.to_string().contains("run.timeout"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_usize_or() {
        let s = settings(&[("jobs", "4"), ("bad", "many")]);
        assert_eq!(s.usize_or("jobs", 1).unwrap(), 4);
        assert_eq!(s.usize_or("absent", 8).unwrap(), 8);
        assert!(s.usize_or("bad", 1).is_err());
    }

    #[test]
    fn test_bool_or() {
        let s = settings(&[("on", "true"), ("off", "false"), ("bad", "yes")]);
        assert!(s.bool_or("on", false).unwrap());
        assert!(!s.bool_or("off", true).unwrap());
        assert!(s.bool_or("absent", true).unwrap());
        assert!(s.bool_or("bad", false).is_err());
    }

    #[test]
    fn test_descriptor_settings_view() {
        let descriptor = common::sample_descriptor();
        let s = descriptor.settings();
        assert_eq!(
            s.duration_or("run.timeout", DEFAULT_RUN_TIMEOUT).unwrap(),
            Duration::from_secs(3600)
        );
        assert_eq!(s.str_or("project.build_command", "mvn -B test"), "mvn -B test");
    }
}

#[cfg(test)]
mod load_descriptor_tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_valid_plan() {
        let dir = tempdir().unwrap();
        let path = common::write_plan(dir.path(), common::sample_plan_toml());

        let descriptor = load_descriptor(&path).unwrap();
        assert_eq!(descriptor.project.name, "hive");
        assert_eq!(descriptor.modules.len(), 5);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let err = load_descriptor(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read build plan"));
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = common::write_plan(dir.path(), "[project\nname = ");

        let err = load_descriptor(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse build plan"));
    }

    /// An invalid module aborts loading even though the TOML itself parses.
    /// 即使 TOML 本身可以解析，无效模块也会中止加载。
    #[test]
    fn test_load_rejects_invalid_module() {
        let dir = tempdir().unwrap();
        let plan = r#"
[project]
name = "hive"
base_image = "ubuntu:22.04"

[source]
kind = "git"
url = "https://example.com/repo.git"

[[modules]]
dir = "ql"
needs_split = true
single_test = "TestCleaner"
"#;
        let path = common::write_plan(dir.path(), plan);

        let err = load_descriptor(&path).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }
}
