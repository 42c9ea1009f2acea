//! 作文处理上下文
//!
//! 封装"我正在处理第几篇作文、共几篇"这一信息

use std::fmt::Display;

/// 作文处理上下文
#[derive(Debug, Clone)]
pub struct EssayCtx {
    /// 作文编号
    pub essay_id: String,

    /// 作文在表格中的位置（从1开始）
    pub essay_index: usize,

    /// 本批作文总数
    pub total: usize,
}

impl EssayCtx {
    pub fn new(essay_id: impl Into<String>, essay_index: usize, total: usize) -> Self {
        Self {
            essay_id: essay_id.into(),
            essay_index,
            total,
        }
    }

    /// 处理完当前作文后的进度，范围 (0, 1]
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.essay_index as f64 / self.total as f64
    }
}

impl Display for EssayCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[作文 {}/{} ID#{}]",
            self.essay_index, self.total, self.essay_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_index_over_total() {
        assert_eq!(EssayCtx::new("a", 1, 4).progress(), 0.25);
        assert_eq!(EssayCtx::new("d", 4, 4).progress(), 1.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(EssayCtx::new("x7", 2, 9).to_string(), "[作文 2/9 ID#x7]");
    }
}
