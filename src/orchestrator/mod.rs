//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量评分和流程调度：
//! - 管理应用生命周期（初始化、运行、统计）
//! - 加载作文表格（Vec<EssayInput>）
//! - 按表格顺序逐篇调用 `workflow::EssayFlow`
//! - 写出结果表格、输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<EssayInput>)
//!     ↓
//! workflow::EssayFlow (处理单篇作文)
//!     ↓
//! services (能力层：grading / report / failure)
//!     ↓
//! clients (基础设施：ChatBackend)
//! ```

pub mod batch_processor;

pub use batch_processor::{App, RunStats};
