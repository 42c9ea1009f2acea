//! 失败记录写入服务 - 业务能力层
//!
//! 只负责"把评分失败的作文追加到失败记录文件"，不关心流程

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::models::essay::FailedEssay;

/// 失败记录写入服务
///
/// 职责：
/// - 将评分失败的作文编号和错误信息写入文件
/// - 只处理单篇作文
/// - 不关心批处理顺序
pub struct FailureWriter {
    file_path: String,
}

impl FailureWriter {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// 追加一条失败记录
    pub fn write(&self, failed: &FailedEssay) -> Result<()> {
        debug!(
            "写入失败记录: 作文 {} | 错误长度: {}",
            failed.essay_id,
            failed.message.len()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .with_context(|| format!("无法打开失败记录文件: {}", self.file_path))?;

        // 错误信息可能多行，压成一行方便 grep
        let message = failed.message.replace(['\r', '\n'], " ");
        let line = format!(
            "[{}] 作文 {} | 错误: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            failed.essay_id,
            message
        );

        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
