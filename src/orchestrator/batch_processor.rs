//! 批量作文评分器 - 编排层
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、创建聊天后端和评分流程
//! 2. **批量加载**：读取作文表格
//! 3. **顺序处理**：严格按表格顺序逐篇评分，一次只有一个请求在途
//! 4. **失败兜底**：单篇失败只记录并跳过，不中断整批
//! 5. **结果输出**：写出结果表格并汇总统计

use crate::clients::{ChatBackend, OpenAiChatClient};
use crate::config::Config;
use crate::models::essay::{EssayInput, FailedEssay, GradedRow};
use crate::models::loaders::load_essays;
use crate::services::{FailureWriter, GradingService, ReportWriter};
use crate::utils::logging::{
    append_to_log_file, init_log_file, log_essays_loaded, log_progress, log_startup,
    warn_if_unbalanced,
};
use crate::workflow::{EssayCtx, EssayFlow, ProcessResult};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    flow: EssayFlow,
    report_writer: ReportWriter,
}

impl App {
    /// 初始化应用（使用配置中的 OpenAI 兼容服务）
    pub fn initialize(config: Config) -> Result<Self> {
        config.require_api_key()?;
        let backend: Arc<dyn ChatBackend> = Arc::new(OpenAiChatClient::new(&config));
        Self::with_backend(config, backend)
    }

    /// 使用指定的聊天后端初始化应用
    pub fn with_backend(config: Config, backend: Arc<dyn ChatBackend>) -> Result<Self> {
        init_log_file(&config.output_log_file)?;

        let grading_config = config.grading_config();
        log_startup(&config, &grading_config);
        warn_if_unbalanced(&grading_config);

        let flow = EssayFlow::new(
            GradingService::new(backend),
            grading_config,
            FailureWriter::new(config.failure_log_file.clone()),
            config.verbose_logging,
        );
        let report_writer = ReportWriter::new(config.delimiter_byte());

        Ok(Self {
            config,
            flow,
            report_writer,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        let essays = self.load_essays()?;

        if essays.is_empty() {
            warn!("⚠️ 表格中没有待评分的作文");
        } else {
            log_essays_loaded(essays.len());
        }

        let (rows, stats) = self.grade_all(&essays).await;

        self.report_writer
            .write_file(Path::new(&self.config.output_file), &rows)?;
        info!("💾 结果已写入: {}", self.config.output_file);

        print_final_stats(&stats, &self.config);
        if let Err(e) = append_to_log_file(&self.config.output_log_file, &stats.summary()) {
            warn!("⚠️ 写入日志文件失败: {}", e);
        }

        Ok(stats)
    }

    /// 按顺序给所有作文评分
    ///
    /// 返回的输出行与输入顺序一致，失败的作文不出现在输出行中。
    pub async fn grade_all(&self, essays: &[EssayInput]) -> (Vec<GradedRow>, RunStats) {
        let total = essays.len();
        let mut rows = Vec::with_capacity(total);
        let mut stats = RunStats {
            total,
            ..Default::default()
        };

        for (index, essay) in essays.iter().enumerate() {
            let ctx = EssayCtx::new(essay.id.clone(), index + 1, total);

            match self.flow.run(essay, &ctx).await {
                ProcessResult::Graded { row, token_count } => {
                    stats.record_success(row.final_grade, token_count);
                    rows.push(row);
                }
                ProcessResult::Failed(failure) => {
                    stats.record_failure(&failure);
                }
            }

            log_progress(&ctx);
        }

        (rows, stats)
    }

    /// 加载作文
    fn load_essays(&self) -> Result<Vec<EssayInput>> {
        info!("\n📁 正在读取作文表格: {}", self.config.input_file);
        load_essays(
            Path::new(&self.config.input_file),
            &self.config.id_column,
            &self.config.text_column,
            self.config.delimiter_byte(),
        )
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub total_tokens: u64,
    /// 失败作文的 ID，按处理顺序
    pub failed_ids: Vec<String>,
    /// 综合分 1..=6 的分布，下标 0 对应 1 分
    pub grade_counts: [usize; 6],
}

impl RunStats {
    fn record_success(&mut self, final_grade: i64, token_count: u64) {
        self.success += 1;
        self.total_tokens += token_count;
        if let Some(slot) = usize::try_from(final_grade - 1)
            .ok()
            .and_then(|i| self.grade_counts.get_mut(i))
        {
            *slot += 1;
        }
    }

    fn record_failure(&mut self, failure: &FailedEssay) {
        self.failed += 1;
        self.failed_ids.push(failure.essay_id.clone());
    }

    /// 成功作文的平均综合分
    pub fn mean_grade(&self) -> Option<f64> {
        if self.success == 0 {
            return None;
        }
        let sum: usize = self
            .grade_counts
            .iter()
            .enumerate()
            .map(|(i, count)| (i + 1) * count)
            .sum();
        Some(sum as f64 / self.success as f64)
    }

    /// 写入日志文件的统计摘要
    pub fn summary(&self) -> String {
        let distribution = self
            .grade_counts
            .iter()
            .enumerate()
            .map(|(i, count)| format!("{}分: {}", i + 1, count))
            .collect::<Vec<_>>()
            .join(", ");
        let mean = self
            .mean_grade()
            .map(|m| format!("{:.2}", m))
            .unwrap_or_else(|| "-".to_string());

        format!(
            "完成时间: {}\n成功: {}/{}\n失败: {}{}\n平均综合分: {}\n分布: {}\ntoken 总数: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.success,
            self.total,
            self.failed,
            failed_list(&self.failed_ids),
            mean,
            distribution,
            self.total_tokens
        )
    }
}

// ========== 日志辅助函数 ==========

fn failed_list(ids: &[String]) -> String {
    if ids.is_empty() {
        String::new()
    } else {
        format!(" ({})", ids.join(", "))
    }
}

fn print_final_stats(stats: &RunStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部评分完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}{}", stats.failed, failed_list(&stats.failed_ids));
    if let Some(mean) = stats.mean_grade() {
        info!("📈 平均综合分: {:.2}", mean);
    }
    info!("🔢 token 总数: {}", stats.total_tokens);
    info!("{}", "=".repeat(60));
    if stats.failed > 0 {
        info!("失败记录已保存至: {}", config.failure_log_file);
    }
    info!("\n日志已保存至: {}", config.output_log_file);
}
