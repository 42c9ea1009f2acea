//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, GradingConfig};
use crate::workflow::EssayCtx;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info。
/// 重复初始化（例如测试中）会被忽略。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("essay_grader={default_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n作文评分日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法初始化日志文件: {}", log_file_path))?;
    Ok(())
}

/// 向日志文件追加内容
pub fn append_to_log_file(log_file_path: &str, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, grading: &GradingConfig) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 作文批量评分模式");
    info!("🤖 模型: {}", grading.model);
    info!(
        "⚖️ 权重: 内容 {:.2} / 结构 {:.2} / 规范 {:.2}",
        grading.weights.content, grading.weights.organization, grading.weights.conventions
    );
    info!(
        "📉 扣分: {} | 🛡️ 护栏: {}",
        grading.penalty,
        if grading.guardrail_enabled { "开启" } else { "关闭" }
    );
    info!("📄 输入: {} → 输出: {}", config.input_file, config.output_file);
    info!("{}", "=".repeat(60));
}

/// 权重之和不为 1.0 时给出提示（不阻断评分）
pub fn warn_if_unbalanced(grading: &GradingConfig) {
    if grading.weights.is_balanced() {
        info!("✅ 权重平衡");
    } else {
        warn!(
            "⚠️ 权重之和为 {:.2}，应为 1.0！将按原值计算",
            grading.weights.sum()
        );
    }
}

/// 记录作文加载信息
pub fn log_essays_loaded(total: usize) {
    info!("✓ 找到 {} 篇待评分的作文", total);
    info!("💡 将按表格顺序逐篇评分\n");
}

/// 记录进度（每篇作文处理完成后调用）
pub fn log_progress(ctx: &EssayCtx) {
    info!(
        "📊 进度: {}/{} ({:.1}%)",
        ctx.essay_index,
        ctx.total,
        ctx.progress() * 100.0
    );
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
