//! 评分结果写入服务 - 业务能力层
//!
//! 只负责把输出行写成带表头的分隔文本文件

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::models::essay::GradedRow;

/// 评分结果写入服务
pub struct ReportWriter {
    delimiter: u8,
}

impl ReportWriter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// 写入结果文件（覆盖已有文件）
    pub fn write_file(&self, path: &Path, rows: &[GradedRow]) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("无法创建结果文件: {}", path.display()))?;
        self.write_to(file, rows)
            .with_context(|| format!("写入结果文件失败: {}", path.display()))?;

        debug!("已写入 {} 行结果到 {}", rows.len(), path.display());
        Ok(())
    }

    /// 写入任意输出
    ///
    /// 即使没有任何结果，也会写出表头。
    pub fn write_to<W: Write>(&self, writer: W, rows: &[GradedRow]) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(HEADERS)?;
        for row in rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new(b',')
    }
}

/// 输出表头，与 [`GradedRow`] 的字段顺序一致
pub const HEADERS: [&str; 7] = [
    "essay_id",
    "final_grade",
    "content_score",
    "organization_score",
    "conventions_score",
    "content_feedback",
    "latency_ms",
];
