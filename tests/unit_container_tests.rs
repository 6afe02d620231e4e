//! # Container Engine Unit Tests / 容器引擎单元测试
//!
//! This module contains unit tests for the `container.rs` module: package
//! family detection, build recipe rendering, and the engine client driven
//! against fake engine scripts.
//!
//! 此模块包含 `container.rs` 模块的单元测试：包管理器系列检测、
//! 构建配方渲染，以及由伪引擎脚本驱动的引擎客户端。

mod common;

use shard_runner::core::source;
use shard_runner::infra::container::{render_recipe, PackageFamily};
use shard_runner::models::BuildInfo;
use std::path::PathBuf;

#[cfg(test)]
mod package_family_tests {
    use super::*;

    #[test]
    fn test_detects_apt_images() {
        assert_eq!(PackageFamily::detect("ubuntu:22.04").unwrap(), PackageFamily::Apt);
        assert_eq!(PackageFamily::detect("debian:bookworm").unwrap(), PackageFamily::Apt);
    }

    #[test]
    fn test_detects_rpm_images() {
        for image in ["centos:7", "rockylinux:9", "fedora:39", "amazonlinux:2023"] {
            assert_eq!(PackageFamily::detect(image).unwrap(), PackageFamily::Rpm);
        }
    }

    #[test]
    fn test_detection_ignores_case_and_registry_prefix() {
        assert_eq!(
            PackageFamily::detect("docker.io/library/Ubuntu:22.04").unwrap(),
            PackageFamily::Apt
        );
    }

    #[test]
    fn test_unknown_family_is_fatal() {
        let err = PackageFamily::detect("alpine:3.19").unwrap_err();
        assert!(err.to_string().contains("Unsupported base image 'alpine:3.19'"));
    }

    #[test]
    fn test_install_lines_per_family() {
        assert_eq!(
            PackageFamily::Rpm.install_line("git maven"),
            "yum install -y -q git maven"
        );
        assert_eq!(
            PackageFamily::Apt.install_line("git maven"),
            "apt-get update && DEBIAN_FRONTEND=noninteractive apt-get install -y git maven"
        );
    }
}

#[cfg(test)]
mod recipe_tests {
    use super::*;

    #[test]
    fn test_git_recipe_on_apt_image() {
        let info = common::sample_build_info(true);
        let recipe = render_recipe(&info).unwrap();
        assert_eq!(
            recipe,
            "FROM ubuntu:22.04\n\
             RUN apt-get update && DEBIAN_FRONTEND=noninteractive apt-get install -y \
             git maven openjdk-17-jdk-headless\n\
             RUN useradd -m shardbuilder\n\
             USER shardbuilder\n\
             WORKDIR /home/shardbuilder\n\
             RUN git clone --depth 1 --branch release-4.1 \
             https://github.com/example/hive.git hive\n\
             WORKDIR /home/shardbuilder/hive\n"
        );
    }

    #[test]
    fn test_tarball_recipe_on_rpm_image_merges_source_packages() {
        let mut descriptor = common::sample_descriptor();
        descriptor.project.base_image = "centos:7".to_string();
        descriptor.source.kind = "tarball".to_string();
        descriptor.source.url = "https://archive.example.com/hive-4.1.0.tar.gz".to_string();
        descriptor.source.branch = None;
        descriptor.source.strip_components = Some(2);

        let resolved = source::resolve(&descriptor.source).unwrap();
        let info = BuildInfo::new("Hive-Nightly", descriptor, resolved, PathBuf::from("build"), true);

        let recipe = render_recipe(&info).unwrap();
        assert_eq!(
            recipe,
            "FROM centos:7\n\
             RUN yum install -y -q curl git gzip maven openjdk-17-jdk-headless tar\n\
             RUN useradd -m shardbuilder\n\
             USER shardbuilder\n\
             WORKDIR /home/shardbuilder\n\
             RUN mkdir -p hive\n\
             RUN curl -fsSL https://archive.example.com/hive-4.1.0.tar.gz \
             | tar -xz --strip-components=2 -C hive\n\
             WORKDIR /home/shardbuilder/hive\n"
        );
    }

    #[test]
    fn test_recipe_rejects_unknown_base_image() {
        let mut descriptor = common::sample_descriptor();
        descriptor.project.base_image = "alpine:3.19".to_string();

        let resolved = source::resolve(&descriptor.source).unwrap();
        let info = BuildInfo::new("Hive-Nightly", descriptor, resolved, PathBuf::from("build"), true);

        let err = render_recipe(&info).unwrap_err();
        assert!(err.to_string().contains("Unsupported base image"));
    }
}

#[cfg(all(test, unix))]
mod engine_client_tests {
    use super::*;
    use anyhow::Result;
    use shard_runner::config::Settings;
    use shard_runner::infra::container::{ContainerRuntime, EngineClient};
    use shard_runner::infra::logger::LiveLog;
    use shard_runner::infra::lookup::ExecutableLookup;
    use shard_runner::models::{ContainerCommand, ContainerResult, RunnerError};
    use std::collections::BTreeMap;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;

    /// Writes an executable shell script standing in for the engine binary.
    /// 写入一个可执行 shell 脚本，代替引擎二进制文件。
    fn fake_engine(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-engine.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn engine_client(binary: &str, extra: &[(&str, &str)]) -> Result<EngineClient> {
        let mut values = BTreeMap::new();
        values.insert("engine.binary".to_string(), binary.to_string());
        for (key, value) in extra {
            values.insert(key.to_string(), value.to_string());
        }
        EngineClient::new(&Settings::new(values), &ExecutableLookup::default(), LiveLog::memory())
    }

    fn info_at(build_dir: &Path) -> BuildInfo {
        let descriptor = common::sample_descriptor();
        let resolved = source::resolve(&descriptor.source).unwrap();
        BuildInfo::new("Hive-Nightly", descriptor, resolved, build_dir.to_path_buf(), true)
    }

    #[tokio::test]
    async fn test_build_writes_recipe_and_accepts_success_marker() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), r#"echo "Successfully built 1f2e3d4c5b6a""#);
        let client = engine_client(&engine, &[]).unwrap();
        let info = info_at(dir.path());

        client.build_image(&info).await.unwrap();

        let recipe = fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert!(recipe.starts_with("FROM ubuntu:22.04\n"));
        assert!(recipe.ends_with("WORKDIR /home/shardbuilder/hive\n"));
    }

    #[tokio::test]
    async fn test_build_accepts_cache_marker() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), r#"echo " ---> Using cache""#);
        let client = engine_client(&engine, &[]).unwrap();

        assert!(client.build_image(&info_at(dir.path())).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_build_surfaces_engine_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(
            dir.path(),
            "echo \"E: Unable to locate package maven\" >&2\nexit 1",
        );
        let client = engine_client(&engine, &[]).unwrap();

        let err = client.build_image(&info_at(dir.path())).await.unwrap_err();
        match err.downcast_ref::<RunnerError>() {
            Some(RunnerError::ImageBuild { stderr }) => {
                assert!(stderr.contains("Unable to locate package maven"));
            }
            other => panic!("Expected an image build error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clean_exit_without_marker_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), "exit 0");
        let client = engine_client(&engine, &[]).unwrap();

        let err = client.build_image(&info_at(dir.path())).await.unwrap_err();
        assert!(err.to_string().contains("Image build failed"));
    }

    #[test]
    fn test_malformed_run_args_are_refused() {
        let Err(err) = engine_client("sh", &[("engine.run_args", "--volume \"unclosed")]) else {
            panic!("Malformed run_args should be refused");
        };
        assert!(err.to_string().contains("Invalid engine.run_args value"));
    }

    #[tokio::test]
    async fn test_run_container_assembles_engine_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), r#"printf '%s\n' "$@""#);
        let client = engine_client(&engine, &[("engine.run_args", "--memory 4g")]).unwrap();
        let info = info_at(dir.path());
        let command = ContainerCommand {
            command: "cd cli && mvn -B test".to_string(),
            suffix: "cli".to_string(),
            log_files: vec![],
        };

        let result = client.run_container(&info, &command).await.unwrap();

        assert_eq!(result.exit_code, Some(0));
        assert!(!result.timed_out);
        let argv: Vec<&str> = result.stdout.lines().collect();
        assert_eq!(
            argv,
            vec![
                "run",
                "--name",
                "hive-nightly_cli",
                "--memory",
                "4g",
                "hive-nightly",
                "/bin/bash",
                "-c",
                "cd cli && mvn -B test",
            ]
        );
    }

    #[tokio::test]
    async fn test_copy_log_files_counts_successful_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), "exit 0");
        let client = engine_client(&engine, &[]).unwrap();
        let info = info_at(dir.path());
        let result = ContainerResult {
            command: ContainerCommand {
                command: "cd ql && mvn -B test".to_string(),
                suffix: "ql_1".to_string(),
                log_files: vec![
                    "/home/shardbuilder/hive/ql/target/surefire-reports".to_string(),
                    "/home/shardbuilder/hive/ql/hive.log".to_string(),
                ],
            },
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            duration: Duration::from_secs(1),
        };

        let fetched = client
            .copy_log_files(&info, &result, &dir.path().join("logs").join("ql_1"))
            .await;
        assert_eq!(fetched, 2);
    }

    #[tokio::test]
    async fn test_copy_log_files_skips_commands_without_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), "exit 1");
        let client = engine_client(&engine, &[]).unwrap();
        let info = info_at(dir.path());
        let result = ContainerResult {
            command: ContainerCommand {
                command: "cd beeline && mvn -B test".to_string(),
                suffix: "beeline".to_string(),
                log_files: vec![],
            },
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            duration: Duration::from_secs(1),
        };

        let fetched = client
            .copy_log_files(&info, &result, &dir.path().join("logs").join("beeline"))
            .await;
        assert_eq!(fetched, 0);
    }
}
