//! # Essay Grader
//!
//! 一个用大模型给学生作文批量评分的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 持有聊天后端，只暴露"发两条消息、拿一条回复"的能力
//! - `ChatBackend` - 后端抽象，`OpenAiChatClient` 为 OpenAI 兼容实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇作文
//! - `GradingService` - 评分能力（指令 → 请求 → 解析 → 综合分）
//! - `ReportWriter` - 写结果表格能力
//! - `FailureWriter` - 写失败记录能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇作文"的完整处理流程
//! - `EssayCtx` - 上下文封装（编号 + 位置 + 总数）
//! - `EssayFlow` - 流程编排（评分 → 输出行 / 失败记录）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量评分器，按表格顺序逐篇处理并汇总统计
//!
//! ## 综合分规则
//!
//! `round(内容*w1 + 结构*w2 + 规范*w3) + 扣分`，护栏开启且结构或规范 ≤ 2 时封顶 3 分，
//! 最终截断到 [1, 6]。

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ChatBackend, ChatReply, ChatRequest, OpenAiChatClient};
pub use config::{Config, GradingConfig, Weights};
pub use error::{AppError, AppResult};
pub use models::{Criterion, CriterionResult, EssayInput, GradedRow, GradingOutcome, GradingResult};
pub use orchestrator::{App, RunStats};
pub use services::GradingService;
pub use workflow::{EssayCtx, EssayFlow, ProcessResult};
