//! 作文评分服务 - 业务能力层
//!
//! 只负责"给一篇作文打分"这一能力：
//! 1. 组装固定的评分指令
//! 2. 调用一次聊天后端（temperature = 0）
//! 3. 按评分标准逐项解析回复
//! 4. 计算加权综合分（扣分 → 护栏 → 截断到 [1, 6]）
//!
//! 服务本身不持有评分配置，每次调用都显式传入 [`GradingConfig`]。

use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tracing::{debug, warn};

use crate::clients::{ChatBackend, ChatRequest};
use crate::config::GradingConfig;
use crate::models::grading::{Criterion, CriterionResult, GradingOutcome, GradingResult};

/// 评分指令
pub const GRADING_INSTRUCTION: &str = "You are an experienced writing assessor. \
Read the student essay supplied by the user and grade it on three criteria, \
each with an integer score from 1 (lowest) to 6 (highest):\n\
- CONTENT: ideas, argument, use of evidence and relevance to the task.\n\
- ORGANIZATION: structure, paragraphing, transitions and logical flow.\n\
- CONVENTIONS: grammar, spelling, punctuation and sentence mechanics.\n\
\n\
Respond with exactly three lines and nothing else, strictly in this format:\n\
CONTENT: [score] | [reasoning]\n\
ORGANIZATION: [score] | [reasoning]\n\
CONVENTIONS: [score] | [reasoning]";

/// 护栏触发阈值：组织或规范分数不高于此值
const GUARDRAIL_TRIGGER_SCORE: i64 = 2;

/// 护栏触发后的最高分
const GUARDRAIL_CAP: i64 = 3;

const MIN_GRADE: i64 = 1;
const MAX_GRADE: i64 = 6;

static CONTENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| criterion_regex(Criterion::Content));
static ORGANIZATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| criterion_regex(Criterion::Organization));
static CONVENTIONS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| criterion_regex(Criterion::Conventions));

fn criterion_regex(criterion: Criterion) -> Regex {
    // `.` 不匹配换行，评语只取到行尾；分数只认 ASCII 数字
    Regex::new(&format!(r"{}:\s*([0-9]+)\s*\|\s*(.*)", criterion.label()))
        .expect("criterion pattern is a valid regex")
}

fn pattern_for(criterion: Criterion) -> &'static Regex {
    match criterion {
        Criterion::Content => &*CONTENT_PATTERN,
        Criterion::Organization => &*ORGANIZATION_PATTERN,
        Criterion::Conventions => &*CONVENTIONS_PATTERN,
    }
}

/// 作文评分服务
///
/// 职责：
/// - 只处理单篇作文
/// - 不持有可变状态，唯一的共享资源是聊天后端
/// - 调用失败不会中断批处理，只返回 `GradingOutcome::Failure`
#[derive(Clone)]
pub struct GradingService {
    backend: Arc<dyn ChatBackend>,
}

impl GradingService {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// 给一篇作文评分
    ///
    /// # 参数
    /// - `essay_text`: 作文正文，可以为空
    /// - `config`: 本次批处理的评分配置
    ///
    /// # 返回
    /// 成功时返回各项分数和综合分；请求阶段的任何错误都折叠为 `Failure`
    pub async fn grade(&self, essay_text: &str, config: &GradingConfig) -> GradingOutcome {
        let request = ChatRequest {
            model: config.model.clone(),
            system_message: GRADING_INSTRUCTION.to_string(),
            user_message: essay_text.to_string(),
            temperature: 0.0,
        };

        let started = Instant::now();
        let reply = match self.backend.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("评分请求失败: {}", e);
                return GradingOutcome::Failure {
                    message: e.to_string(),
                };
            }
        };
        let latency_ms = (started.elapsed().as_secs_f64() * 1000.0).round() as u64;

        debug!("模型回复: {}", reply.content);

        let [content, organization, conventions] = parse_reply(&reply.content);
        let final_grade =
            compute_final_grade(content.score, organization.score, conventions.score, config);

        GradingOutcome::Success(GradingResult {
            final_grade,
            content,
            organization,
            conventions,
            latency_ms,
            token_count: reply.total_tokens.unwrap_or(0),
        })
    }
}

/// 从回复中提取某一项的分数和评语
///
/// 在整段回复中查找第一处 `NAME: <数字> | <评语>`。
/// 找不到或数字溢出时返回 `None`。
pub fn parse_criterion(reply: &str, criterion: Criterion) -> Option<(i64, String)> {
    let caps = pattern_for(criterion).captures(reply)?;
    let score = caps.get(1)?.as_str().parse::<i64>().ok()?;
    let feedback = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
    Some((score, feedback.to_string()))
}

/// 逐项解析回复，缺失的项使用默认值
///
/// 返回顺序与 [`Criterion::ALL`] 一致。
pub fn parse_reply(reply: &str) -> [CriterionResult; 3] {
    Criterion::ALL.map(|criterion| match parse_criterion(reply, criterion) {
        Some((score, feedback)) => CriterionResult::new(score, feedback),
        None => {
            warn!("⚠️ 回复中未找到 {} 行，使用默认分数", criterion);
            CriterionResult::fallback()
        }
    })
}

/// 计算综合分
///
/// `round(c*wc + o*wo + g*wg) + penalty`，再按护栏封顶，最后截断到 [1, 6]。
/// 权重不做归一化；`.5` 向远离零的方向取整。
pub fn compute_final_grade(
    content: i64,
    organization: i64,
    conventions: i64,
    config: &GradingConfig,
) -> i64 {
    let weights = &config.weights;
    let raw = content as f64 * weights.content
        + organization as f64 * weights.organization
        + conventions as f64 * weights.conventions;

    // 超大分数会使 `as` 饱和到 i64::MAX，加扣分时不能溢出
    let mut grade = (raw.round() as i64).saturating_add(config.penalty);

    if config.guardrail_enabled
        && (organization <= GUARDRAIL_TRIGGER_SCORE || conventions <= GUARDRAIL_TRIGGER_SCORE)
    {
        grade = grade.min(GUARDRAIL_CAP);
    }

    grade.clamp(MIN_GRADE, MAX_GRADE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ChatReply;
    use crate::config::Weights;
    use crate::error::LlmError;
    use crate::models::grading::PLACEHOLDER_FEEDBACK;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 返回固定回复的后端，同时记录收到的请求
    struct ScriptedBackend {
        reply: Result<ChatReply, String>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn replying(content: &str, total_tokens: Option<u64>) -> Self {
            Self {
                reply: Ok(ChatReply {
                    content: content.to_string(),
                    total_tokens,
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(model: &str) -> Self {
            Self {
                reply: Err(model.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(model) => Err(LlmError::EmptyResponse {
                    model: model.clone(),
                }),
            }
        }
    }

    fn config(content: f64, organization: f64, conventions: f64, guardrail: bool) -> GradingConfig {
        GradingConfig {
            model: "llama-3.1-8b-instant".to_string(),
            weights: Weights {
                content,
                organization,
                conventions,
            },
            penalty: -1,
            guardrail_enabled: guardrail,
        }
    }

    #[test]
    fn test_parse_criterion_well_formed() {
        let reply = "CONTENT: 5 | Strong argument.\nORGANIZATION: 4 | Clear.\nCONVENTIONS: 3 | Some typos.";
        assert_eq!(
            parse_criterion(reply, Criterion::Content),
            Some((5, "Strong argument.".to_string()))
        );
        assert_eq!(
            parse_criterion(reply, Criterion::Organization),
            Some((4, "Clear.".to_string()))
        );
        assert_eq!(
            parse_criterion(reply, Criterion::Conventions),
            Some((3, "Some typos.".to_string()))
        );
    }

    #[test]
    fn test_parse_criterion_anywhere_in_reply() {
        let reply = "Here is my assessment:\n\n  ORGANIZATION:6|   Excellent flow.   \nThanks!";
        assert_eq!(
            parse_criterion(reply, Criterion::Organization),
            Some((6, "Excellent flow.".to_string()))
        );
        assert_eq!(parse_criterion(reply, Criterion::Content), None);
    }

    #[test]
    fn test_parse_criterion_rejects_non_numeric_score() {
        assert_eq!(parse_criterion("CONTENT: five | ok", Criterion::Content), None);
        assert_eq!(parse_criterion("CONTENT: 5 without bar", Criterion::Content), None);
        assert_eq!(
            parse_criterion("CONTENT: 99999999999999999999999 | huge", Criterion::Content),
            None
        );
    }

    #[test]
    fn test_parse_reply_defaults_missing_criterion_only() {
        let reply = "CONTENT: 4 | Good.\nORGANIZATION: 5 | Tidy.";
        let [content, organization, conventions] = parse_reply(reply);

        assert_eq!(content, CriterionResult::new(4, "Good."));
        assert_eq!(organization, CriterionResult::new(5, "Tidy."));
        assert_eq!(conventions.score, 3);
        assert_eq!(conventions.feedback, PLACEHOLDER_FEEDBACK);
        assert!(conventions.is_fallback());
    }

    #[test]
    fn test_parse_reply_all_defaults_for_garbage() {
        for result in parse_reply("I cannot grade this.") {
            assert!(result.is_fallback());
        }
    }

    #[test]
    fn test_composite_matches_weighted_formula() {
        let cfg = config(0.4, 0.3, 0.3, false);
        for c in 1..=6 {
            for o in 1..=6 {
                for g in 1..=6 {
                    let raw = c as f64 * 0.4 + o as f64 * 0.3 + g as f64 * 0.3;
                    let expected = (raw.round() as i64 - 1).clamp(1, 6);
                    assert_eq!(compute_final_grade(c, o, g, &cfg), expected);
                }
            }
        }
    }

    #[test]
    fn test_guardrail_caps_low_organization_or_conventions() {
        let cfg = config(0.8, 0.1, 0.1, true);
        for c in 1..=6 {
            for low in 1..=2 {
                for other in 1..=6 {
                    assert!(compute_final_grade(c, low, other, &cfg) <= 3);
                    assert!(compute_final_grade(c, other, low, &cfg) <= 3);
                }
            }
        }
        // 未触发时不封顶：raw = 4.8 + 0.3 + 0.3 = 5.4 → 5 - 1 = 4
        assert_eq!(compute_final_grade(6, 3, 3, &cfg), 4);
        assert_eq!(compute_final_grade(6, 6, 6, &cfg), 5);
    }

    #[test]
    fn test_guardrail_disabled_does_not_cap() {
        let cfg = config(0.8, 0.1, 0.1, false);
        // raw = 4.8 + 0.1 + 0.1 = 5.0 → 5 - 1 = 4
        assert_eq!(compute_final_grade(6, 1, 1, &cfg), 4);
    }

    #[test]
    fn test_final_grade_always_clamped() {
        let mut cfg = config(0.4, 0.3, 0.3, false);
        cfg.penalty = -10;
        assert_eq!(compute_final_grade(6, 6, 6, &cfg), 1);
        cfg.penalty = 10;
        assert_eq!(compute_final_grade(1, 1, 1, &cfg), 6);
        // 模型报出超范围分数时同样截断
        cfg.penalty = 0;
        assert_eq!(compute_final_grade(9, 9, 9, &cfg), 6);
    }

    #[test]
    fn test_huge_score_with_positive_penalty_clamps_to_max() {
        let mut cfg = config(1.0, 1.0, 1.0, false);
        cfg.penalty = 1;
        assert_eq!(compute_final_grade(i64::MAX, i64::MAX, i64::MAX, &cfg), 6);

        let reply = "CONTENT: 9223372036854775807 | x\nORGANIZATION: 6 | y\nCONVENTIONS: 6 | z";
        let [content, organization, conventions] = parse_reply(reply);
        assert_eq!(content.score, i64::MAX);
        assert_eq!(
            compute_final_grade(content.score, organization.score, conventions.score, &cfg),
            6
        );

        cfg.penalty = i64::MIN;
        assert_eq!(compute_final_grade(6, 6, 6, &cfg), 1);
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        // 权重取二进制可精确表示的值，保证 raw 恰好落在 .5 上
        let mut cfg = config(0.5, 0.25, 0.25, false);
        cfg.penalty = 0;
        // raw = 1.5 + 0.25 + 0.75 = 2.5 → 3
        assert_eq!(compute_final_grade(3, 1, 3, &cfg), 3);
        // raw = 2.5 + 0.5 + 0.5 = 3.5 → 4
        assert_eq!(compute_final_grade(5, 2, 2, &cfg), 4);
    }

    #[test]
    fn test_parse_criterion_only_ascii_digits() {
        assert_eq!(parse_criterion("CONTENT: ５ | fullwidth", Criterion::Content), None);
        let [content, _, _] = parse_reply("CONTENT: ５ | fullwidth");
        assert!(content.is_fallback());
    }

    #[test]
    fn test_unbalanced_weights_used_as_is() {
        let cfg = config(1.0, 1.0, 1.0, false);
        // raw = 6，不做归一化
        assert_eq!(compute_final_grade(2, 2, 2, &cfg), 5);
    }

    #[test]
    fn test_example_low_organization_triggers_guardrail() {
        let cfg = config(0.2, 0.4, 0.4, true);
        assert_eq!(compute_final_grade(5, 2, 4, &cfg), 2);
    }

    #[test]
    fn test_example_all_sixes() {
        let cfg = config(0.2, 0.4, 0.4, true);
        assert_eq!(compute_final_grade(6, 6, 6, &cfg), 5);
    }

    #[tokio::test]
    async fn test_grade_success_and_request_shape() {
        let backend = Arc::new(ScriptedBackend::replying(
            "CONTENT: 5 | Insightful.\nORGANIZATION: 2 | Disjointed.\nCONVENTIONS: 4 | Mostly clean.",
            Some(321),
        ));
        let service = GradingService::new(backend.clone());
        let cfg = config(0.2, 0.4, 0.4, true);

        let outcome = service.grade("My essay body.", &cfg).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.final_grade(), Some(2));
        let GradingOutcome::Success(result) = outcome else {
            panic!("应评分成功");
        };
        assert_eq!(result.final_grade, 2);
        assert_eq!(result.content, CriterionResult::new(5, "Insightful."));
        assert_eq!(result.organization.score, 2);
        assert_eq!(result.conventions.score, 4);
        assert_eq!(result.token_count, 321);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "llama-3.1-8b-instant");
        assert_eq!(seen[0].system_message, GRADING_INSTRUCTION);
        assert_eq!(seen[0].user_message, "My essay body.");
        assert_eq!(seen[0].temperature, 0.0);
    }

    #[tokio::test]
    async fn test_grade_missing_conventions_uses_default() {
        let backend = Arc::new(ScriptedBackend::replying(
            "CONTENT: 6 | Great.\nORGANIZATION: 6 | Great.",
            None,
        ));
        let service = GradingService::new(backend);
        let cfg = config(0.2, 0.4, 0.4, true);

        let GradingOutcome::Success(result) = service.grade("", &cfg).await else {
            panic!("应评分成功");
        };
        // raw = 1.2 + 2.4 + 1.2 = 4.8 → 5 - 1 = 4
        assert_eq!(result.conventions, CriterionResult::fallback());
        assert_eq!(result.final_grade, 4);
        assert_eq!(result.token_count, 0);
    }

    #[tokio::test]
    async fn test_grade_is_repeatable_for_fixed_reply() {
        let backend = Arc::new(ScriptedBackend::replying(
            "CONTENT: 3 | a\nORGANIZATION: 4 | b\nCONVENTIONS: 5 | c",
            Some(10),
        ));
        let service = GradingService::new(backend);
        let cfg = config(0.4, 0.3, 0.3, true);

        let first = service.grade("same", &cfg).await;
        let second = service.grade("same", &cfg).await;
        let (GradingOutcome::Success(a), GradingOutcome::Success(b)) = (first, second) else {
            panic!("应评分成功");
        };
        assert_eq!(a.final_grade, b.final_grade);
        assert_eq!(
            (a.content, a.organization, a.conventions),
            (b.content, b.organization, b.conventions)
        );
    }

    #[tokio::test]
    async fn test_grade_failure_carries_message() {
        let service = GradingService::new(Arc::new(ScriptedBackend::failing("llama-3.1-8b-instant")));
        let outcome = service.grade("text", &config(0.4, 0.3, 0.3, true)).await;

        match outcome {
            GradingOutcome::Failure { ref message } => {
                assert!(message.contains("llama-3.1-8b-instant"));
                assert_eq!(outcome.final_grade(), None);
            }
            other => panic!("应失败，实际: {:?}", other),
        }
    }
}
