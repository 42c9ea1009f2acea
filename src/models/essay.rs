use serde::{Deserialize, Serialize};

use crate::models::grading::GradingResult;

/// 一篇待评分的作文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssayInput {
    /// 作文编号（原样保留，不做解析）
    pub id: String,
    /// 作文正文，可以为空
    pub text: String,
}

impl EssayInput {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// 输出表格的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedRow {
    pub essay_id: String,
    pub final_grade: i64,
    pub content_score: i64,
    pub organization_score: i64,
    pub conventions_score: i64,
    pub content_feedback: String,
    pub latency_ms: u64,
}

impl GradedRow {
    /// 把一次成功的评分投影为输出行
    pub fn from_result(essay_id: &str, result: &GradingResult) -> Self {
        Self {
            essay_id: essay_id.to_string(),
            final_grade: result.final_grade,
            content_score: result.content.score,
            organization_score: result.organization.score,
            conventions_score: result.conventions.score,
            content_feedback: result.content.feedback.clone(),
            latency_ms: result.latency_ms,
        }
    }
}

/// 评分失败的作文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEssay {
    pub essay_id: String,
    pub message: String,
}
