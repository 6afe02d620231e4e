//! # Shard Runner Library / Shard Runner 库
//!
//! This library provides the core functionality for the Shard Runner tool,
//! a configuration-driven regression test sharder that runs a project's
//! test modules inside disposable containers.
//!
//! 此库为 Shard Runner 工具提供核心功能，
//! 这是一个配置驱动的回归测试分片器，
//! 在一次性容器内运行项目的测试模块。
//!
//! ## Modules / 模块
//!
//! - `core` - Configuration, test discovery, planning and orchestration
//! - `infra` - Infrastructure services like process execution and the engine client
//! - `reporting` - Run result reporting and visualization
//! - `cli` - Command-line interface
//! - `commands` - Subcommand implementations
//!
//! - `core` - 配置、测试发现、规划和编排
//! - `infra` - 基础设施服务，如进程执行和引擎客户端
//! - `reporting` - 运行结果报告和可视化
//! - `cli` - 命令行接口
//! - `commands` - 子命令实现

pub mod cli;
pub mod commands;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;
pub use core::planner;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    // Detect system locale and set it for i18n.
    // Fallback to "en" if detection fails.
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    // Try to match the full locale first (e.g., "zh-CN")
    // Then try to match the language part only (e.g., "en" from "en-US")
    // Finally, fall back to "en"
    let lang = if available_locales.contains(&locale.as_str()) {
        &locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
