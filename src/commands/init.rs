//! # Build Plan Initialization Module / 构建计划初始化模块
//!
//! This module provides functionality for initializing a new build plan
//! through an interactive command-line wizard. It helps users create a
//! `ShardPlan.toml` file with a project description, a source location and
//! common module templates.
//!
//! 此模块通过交互式命令行向导提供初始化新构建计划的功能。
//! 它帮助用户创建包含项目描述、源码位置和常见模块模板的
//! `ShardPlan.toml` 文件。
//!
//! ## Features / 功能特性
//!
//! - **Interactive Wizard**: Step-by-step guidance for plan setup
//! - **Module Templates**: Pre-defined module shapes for common layouts
//! - **Project Detection**: Default project name taken from the working directory
//! - **Overwrite Protection**: Confirmation prompts before overwriting existing plans
//!
//! - **交互式向导**: 计划设置的逐步指导
//! - **模块模板**: 常见布局的预定义模块形态
//! - **项目检测**: 默认项目名称取自工作目录
//! - **覆盖保护**: 覆盖现有计划前的确认提示

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::core::config::{BuildDescriptor, ModuleDirectory, ProjectSpec, SourceSpec};
use crate::core::source;
use crate::infra::t;

/// Runs the interactive wizard to generate a `ShardPlan.toml` file.
///
/// This function provides a step-by-step guided process for creating a new
/// build plan with user-selected templates for module directories.
///
/// 运行交互式向导以生成 `ShardPlan.toml` 文件。
///
/// 此函数提供逐步指导过程，用于创建带有用户选择的模块模板的新构建计划文件。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new("ShardPlan.toml");
    let theme = ColorfulTheme::default();

    if !non_interactive {
        println!("\n{}", t!("init_wizard_welcome", locale = language).cyan().bold());
        println!("{}", t!("init_wizard_description", locale = language));
    }

    if config_path.exists() && !non_interactive {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init_overwrite_prompt", locale = language, path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init_aborted", locale = language));
            return Ok(());
        }
    }

    let default_descriptor = generate_default_descriptor(language)?;

    if non_interactive {
        write_config(config_path, &default_descriptor, language)?;
        return Ok(());
    }

    // Interactive part starts here
    let detected_name = match detect_project_name() {
        Ok(name) => {
            println!(
                "{}",
                t!("init_detected_project_name", locale = language, name = name.green())
            );
            name
        }
        Err(_) => String::new(),
    };

    let mut name_input = Input::<String>::with_theme(&theme)
        .with_prompt(t!("init_project_name_prompt", locale = language));
    if !detected_name.is_empty() {
        name_input = name_input.default(detected_name);
    }
    let project_name: String = name_input.interact_text()?;

    let base_image: String = Input::with_theme(&theme)
        .with_prompt(t!("init_base_image_prompt", locale = language))
        .default("ubuntu:22.04".to_string())
        .interact_text()?;

    let kinds = source::known_kinds();
    let kind_index = Select::with_theme(&theme)
        .with_prompt(t!("init_source_kind_prompt", locale = language))
        .items(kinds)
        .default(0)
        .interact()
        .context(t!("init_user_confirmation_failed", locale = language).to_string())?;

    let url: String = Input::with_theme(&theme)
        .with_prompt(t!("init_source_url_prompt", locale = language))
        .interact_text()?;

    let branch: String = Input::with_theme(&theme)
        .with_prompt(t!("init_source_branch_prompt", locale = language))
        .allow_empty(true)
        .interact_text()?;

    let options = vec![
        ("whole_module", t!("init_template_whole_module", locale = language)),
        ("split_module", t!("init_template_split_module", locale = language)),
        ("qfile_module", t!("init_template_qfile_module", locale = language)),
    ];

    let selections = MultiSelect::with_theme(&theme)
        .with_prompt(t!("init_module_selection_prompt", locale = language))
        .items(&options.iter().map(|o| o.1.clone()).collect::<Vec<_>>())
        .interact()
        .context(t!("init_user_confirmation_failed", locale = language).to_string())?;

    if selections.is_empty() {
        println!("{}", t!("init_no_modules_selected", locale = language).yellow());
    }

    let mut selected_modules = Vec::new();

    for i in selections {
        let selection_key = options[i].0;
        let dir: String = Input::with_theme(&theme)
            .with_prompt(t!("init_module_dir_prompt", locale = language))
            .interact_text()?;
        let module = match selection_key {
            "whole_module" => ModuleDirectory {
                dir,
                ..Default::default()
            },
            "split_module" => {
                let tests_per_container: usize = Input::with_theme(&theme)
                    .with_prompt(t!("init_batch_size_prompt", locale = language))
                    .default(5)
                    .interact_text()?;
                ModuleDirectory {
                    dir,
                    needs_split: true,
                    tests_per_container,
                    ..Default::default()
                }
            }
            "qfile_module" => {
                let driver: String = Input::with_theme(&theme)
                    .with_prompt(t!("init_driver_class_prompt", locale = language))
                    .interact_text()?;
                let file_dir: String = Input::with_theme(&theme)
                    .with_prompt(t!("init_qfile_dir_prompt", locale = language))
                    .interact_text()?;
                ModuleDirectory {
                    dir,
                    single_test: Some(driver),
                    file_list_dir: Some(file_dir),
                    ..Default::default()
                }
            }
            _ => continue,
        };
        selected_modules.push(module);
    }

    let final_descriptor = BuildDescriptor {
        project: ProjectSpec {
            name: project_name,
            base_image,
            required_packages: default_descriptor.project.required_packages.clone(),
            language: language.to_string(),
        },
        source: SourceSpec {
            kind: kinds[kind_index].to_string(),
            url,
            branch: if branch.is_empty() { None } else { Some(branch) },
            strip_components: None,
        },
        settings: default_descriptor.settings.clone(),
        modules: if selected_modules.is_empty() {
            default_descriptor.modules
        } else {
            selected_modules
        },
    };

    write_config(config_path, &final_descriptor, language)
}

fn generate_default_descriptor(language: &str) -> Result<BuildDescriptor> {
    let mut settings = BTreeMap::new();
    settings.insert("run.timeout".to_string(), "3600".to_string());
    settings.insert("project.build_command".to_string(), "mvn -B test".to_string());

    Ok(BuildDescriptor {
        project: ProjectSpec {
            name: "my-project".to_string(),
            base_image: "ubuntu:22.04".to_string(),
            required_packages: ["git", "maven", "openjdk-17-jdk-headless"]
                .into_iter()
                .map(String::from)
                .collect(),
            language: language.to_string(),
        },
        source: SourceSpec {
            kind: "git".to_string(),
            url: "https://github.com/example/my-project.git".to_string(),
            branch: None,
            strip_components: None,
        },
        settings,
        modules: vec![
            ModuleDirectory {
                dir: "core".to_string(),
                ..Default::default()
            },
            ModuleDirectory {
                dir: "server".to_string(),
                needs_split: true,
                tests_per_container: 5,
                ..Default::default()
            },
        ],
    })
}

fn write_config(path: &Path, descriptor: &BuildDescriptor, language: &str) -> Result<()> {
    let toml_string = toml::to_string_pretty(descriptor)
        .context(t!("init_serialize_failed", locale = language).to_string())?;

    fs::write(path, toml_string)
        .with_context(|| t!("init_write_failed", locale = language, path = path.display()))?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init_success_created", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init_usage_hint", locale = language));

    Ok(())
}

/// Tries to detect the project name from the current working directory.
/// The last path component is a reasonable default for projects checked
/// out under their own name.
///
/// 尝试从当前工作目录检测项目名称。
/// 对于以自身名称检出的项目，最后一个路径组件是合理的默认值。
fn detect_project_name() -> Result<String> {
    let cwd = env::current_dir()?;
    let name = cwd
        .file_name()
        .and_then(|n| n.to_str())
        .context(t!("init_project_detect_failed", locale = "en").to_string())?;
    Ok(name.to_string())
}
