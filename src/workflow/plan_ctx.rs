//! 组卷计划上下文
//!
//! 封装"我正在处理第几份计划的第几条"这一信息，只用于日志

use std::fmt::Display;

/// 组卷计划上下文
#[derive(Debug, Clone)]
pub struct PlanCtx {
    /// 计划名称
    pub plan_name: String,

    /// 计划索引（仅用于日志显示）
    pub plan_index: usize,

    /// 当前条目在计划中的索引（从1开始）
    pub step_index: usize,
}

impl PlanCtx {
    pub fn new(plan_name: String, plan_index: usize) -> Self {
        Self {
            plan_name,
            plan_index,
            step_index: 0,
        }
    }

    /// 指向下一条
    pub fn at_step(&self, step_index: usize) -> Self {
        Self {
            step_index,
            ..self.clone()
        }
    }
}

impl Display for PlanCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[试卷 {} {} 条目#{}]",
            self.plan_index, self.plan_name, self.step_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = PlanCtx::new("Weekly".to_string(), 2).at_step(5);
        assert_eq!(ctx.to_string(), "[试卷 2 Weekly 条目#5]");
    }
}
