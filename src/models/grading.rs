use std::fmt;

/// 模型回复无法解析时使用的默认分数
pub const DEFAULT_CRITERION_SCORE: i64 = 3;

/// 模型回复无法解析时使用的默认评语
pub const PLACEHOLDER_FEEDBACK: &str = "No feedback could be parsed from the model reply.";

/// 评分标准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Content,
    Organization,
    Conventions,
}

impl Criterion {
    /// 全部评分标准（按回复中的行序）
    pub const ALL: [Criterion; 3] = [
        Criterion::Content,
        Criterion::Organization,
        Criterion::Conventions,
    ];

    /// 模型回复中使用的行首标签
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Content => "CONTENT",
            Criterion::Organization => "ORGANIZATION",
            Criterion::Conventions => "CONVENTIONS",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 单项评分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionResult {
    /// 模型给出的分数（理论上 1-6，不做修正）
    pub score: i64,
    pub feedback: String,
}

impl CriterionResult {
    pub fn new(score: i64, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }

    /// 回复中找不到该项时的默认结果
    pub fn fallback() -> Self {
        Self::new(DEFAULT_CRITERION_SCORE, PLACEHOLDER_FEEDBACK)
    }

    /// 是否为默认结果
    pub fn is_fallback(&self) -> bool {
        self.score == DEFAULT_CRITERION_SCORE && self.feedback == PLACEHOLDER_FEEDBACK
    }
}

/// 一次成功评分的完整结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingResult {
    /// 综合分数，范围 [1, 6]
    pub final_grade: i64,
    pub content: CriterionResult,
    pub organization: CriterionResult,
    pub conventions: CriterionResult,
    /// 请求耗时（毫秒）
    pub latency_ms: u64,
    /// API 返回的 token 总数，缺失时为 0
    pub token_count: u64,
}

/// 评分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradingOutcome {
    Success(GradingResult),
    Failure { message: String },
}

impl GradingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GradingOutcome::Success(_))
    }

    pub fn final_grade(&self) -> Option<i64> {
        match self {
            GradingOutcome::Success(result) => Some(result.final_grade),
            GradingOutcome::Failure { .. } => None,
        }
    }
}
