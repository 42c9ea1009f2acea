//! 作文处理流程 - 流程层
//!
//! 核心职责：定义"一篇作文"的完整处理流程
//!
//! 流程顺序：
//! 1. 评分（GradingService）
//! 2. 成功 → 投影为输出行
//! 3. 失败 → 写入失败记录（兜底），本篇跳过

use tracing::{error, info, warn};

use crate::config::GradingConfig;
use crate::models::essay::{EssayInput, FailedEssay, GradedRow};
use crate::models::grading::GradingOutcome;
use crate::services::{FailureWriter, GradingService};
use crate::utils::logging::truncate_text;
use crate::workflow::essay_ctx::EssayCtx;

/// 作文处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 评分成功
    Graded { row: GradedRow, token_count: u64 },
    /// 评分失败，已跳过
    Failed(FailedEssay),
}

/// 作文处理流程
///
/// - 编排单篇作文的评分流程
/// - 不持有可变状态，评分配置在整批处理期间不变
pub struct EssayFlow {
    grading_service: GradingService,
    grading_config: GradingConfig,
    failure_writer: FailureWriter,
    verbose_logging: bool,
}

impl EssayFlow {
    pub fn new(
        grading_service: GradingService,
        grading_config: GradingConfig,
        failure_writer: FailureWriter,
        verbose_logging: bool,
    ) -> Self {
        Self {
            grading_service,
            grading_config,
            failure_writer,
            verbose_logging,
        }
    }

    pub async fn run(&self, essay: &EssayInput, ctx: &EssayCtx) -> ProcessResult {
        self.log_text(ctx, &essay.text);

        match self
            .grading_service
            .grade(&essay.text, &self.grading_config)
            .await
        {
            GradingOutcome::Success(result) => {
                info!(
                    "{} ✓ 综合分 {} (内容 {} / 结构 {} / 规范 {}) | {} ms | {} tokens",
                    ctx,
                    result.final_grade,
                    result.content.score,
                    result.organization.score,
                    result.conventions.score,
                    result.latency_ms,
                    result.token_count
                );
                ProcessResult::Graded {
                    row: GradedRow::from_result(&essay.id, &result),
                    token_count: result.token_count,
                }
            }
            GradingOutcome::Failure { message } => {
                error!("{} ❌ 评分失败，已跳过: {}", ctx, message);
                let failed = FailedEssay {
                    essay_id: essay.id.clone(),
                    message,
                };
                if let Err(e) = self.failure_writer.write(&failed) {
                    warn!("{} ⚠️ 写入失败记录失败: {}", ctx, e);
                }
                ProcessResult::Failed(failed)
            }
        }
    }

    fn log_text(&self, ctx: &EssayCtx, text: &str) {
        if text.trim().is_empty() {
            warn!("{} ⚠️ 作文正文为空，仍然提交评分", ctx);
        }
        if self.verbose_logging {
            info!("{} 正文预览: {}", ctx, truncate_text(text, 80));
        }
    }
}
