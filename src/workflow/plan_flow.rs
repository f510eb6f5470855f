//! 组卷计划执行流程 - 流程层
//!
//! 把一份计划的每一条翻译成会话操作：
//! 1. 应用计划里的筛选条件和抬头信息
//! 2. section → 分节标题；question → 按 id 加题（可覆盖题干 / 分值）；
//!    take_visible → 按筛选结果顺序加入前 N 道尚未加入的题
//! 3. 题库里找不到的 id 记一条警告后跳过，不影响其余条目

use tracing::{debug, info, warn};

use crate::error::PlanError;
use crate::models::plan::{PaperPlan, PlanStep};
use crate::utils::logging::truncate_text;
use crate::workflow::builder_session::BuilderSession;
use crate::workflow::plan_ctx::PlanCtx;

/// 单条步骤的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// 已加入试卷（数量）
    Added(usize),
    /// 跳过（题库中找不到）
    Skipped,
}

/// 一份计划的执行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub questions_added: usize,
    pub sections_added: usize,
    /// 找不到的题库 id
    pub missing_ids: Vec<String>,
}

/// 组卷计划执行流程
///
/// - 只操作传入的会话，不持有任何资源
/// - 不做排版和导出（由编排层决定）
pub struct PlanFlow {
    verbose_logging: bool,
}

impl PlanFlow {
    pub fn new(verbose_logging: bool) -> Self {
        Self { verbose_logging }
    }

    /// 在会话上执行整份计划
    ///
    /// # 返回
    /// 执行统计；计划条目无法识别时返回错误，会话不做任何改动
    pub fn run(
        &self,
        session: &mut BuilderSession,
        plan: &PaperPlan,
        ctx: &PlanCtx,
    ) -> Result<PlanOutcome, PlanError> {
        let steps = plan.steps()?;

        session.set_details(plan.details.clone());
        session.apply_filters(plan.filters.clone());
        if session.filters() != &plan.filters {
            warn!("{} ⚠️ 计划中的部分筛选条件在题库中不存在，已忽略", ctx);
        }

        let mut outcome = PlanOutcome::default();
        for (index, step) in steps.iter().enumerate() {
            let step_ctx = ctx.at_step(index + 1);
            match self.run_step(session, step, &step_ctx, &mut outcome) {
                StepResult::Added(n) => debug!("{} ✓ 加入 {} 项", step_ctx, n),
                StepResult::Skipped => {}
            }
        }

        info!(
            "[试卷 {}] ✓ 计划执行完成: {} 道题, {} 个分节, {} 个 id 未找到",
            ctx.plan_index,
            outcome.questions_added,
            outcome.sections_added,
            outcome.missing_ids.len()
        );
        Ok(outcome)
    }

    fn run_step(
        &self,
        session: &mut BuilderSession,
        step: &PlanStep,
        ctx: &PlanCtx,
        outcome: &mut PlanOutcome,
    ) -> StepResult {
        match step {
            PlanStep::Section { label, prefix } => {
                session.add_section(label.clone(), prefix.clone());
                outcome.sections_added += 1;
                StepResult::Added(1)
            }
            PlanStep::Question {
                catalog_id,
                text,
                marks,
            } => {
                let Some(item_id) = session.add_question_by_id(catalog_id) else {
                    warn!("{} ⚠️ 题库中找不到题目 {}，跳过", ctx, catalog_id);
                    outcome.missing_ids.push(catalog_id.clone());
                    return StepResult::Skipped;
                };

                if text.is_some() || marks.is_some() {
                    let edited = session
                        .paper()
                        .get(&item_id)
                        .and_then(|item| item.question())
                        .cloned()
                        .map(|mut question| {
                            if let Some(text) = text {
                                question.text = text.clone();
                            }
                            if let Some(marks) = marks {
                                question.marks = *marks;
                            }
                            question
                        });
                    if let Some(question) = edited {
                        session.edit_question(&item_id, question);
                    }
                }

                if self.verbose_logging {
                    if let Some(question) = session.paper().get(&item_id).and_then(|i| i.question()) {
                        info!("{} 题干: {}", ctx, truncate_text(&question.text, 80));
                    }
                }
                outcome.questions_added += 1;
                StepResult::Added(1)
            }
            PlanStep::TakeVisible(count) => {
                let candidates: Vec<String> = session
                    .visible()
                    .into_iter()
                    .filter(|q| !session.is_added(&q.id))
                    .take(*count)
                    .map(|q| q.id)
                    .collect();

                if candidates.len() < *count {
                    warn!(
                        "{} ⚠️ 筛选结果只有 {} 道可用题目（需要 {}）",
                        ctx,
                        candidates.len(),
                        count
                    );
                }

                let mut added = 0;
                for id in &candidates {
                    if session.add_question_by_id(id).is_some() {
                        added += 1;
                    }
                }
                outcome.questions_added += added;
                StepResult::Added(added)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::catalog_client::Catalog;
    use crate::models::question::{Question, QuestionKind};
    use std::sync::Arc;

    fn session() -> BuilderSession {
        let catalog = Catalog::new(vec![
            Question::new("1", "2 + 3 = ?", 1, QuestionKind::MultipleChoice)
                .with_class("6th")
                .with_subject("Math"),
            Question::new("2", "Solve x + 1 = 4", 2, QuestionKind::ShortAnswer)
                .with_class("6th")
                .with_subject("Math"),
            Question::new("3", "Explain photosynthesis", 4, QuestionKind::LongAnswer)
                .with_class("7th")
                .with_subject("Science"),
        ]);
        BuilderSession::new(Arc::new(catalog), 10)
    }

    fn plan(toml_text: &str) -> PaperPlan {
        toml::from_str(toml_text).unwrap()
    }

    #[test]
    fn test_sections_questions_and_overrides() {
        let plan = plan(
            r#"
            name = "Mixed"

            [details]
            school_name = "Hill School"

            [[entries]]
            section = "Part A"

            [[entries]]
            question = "1"

            [[entries]]
            question = "3"
            text = "Explain photosynthesis briefly"
            marks = 2

            [[entries]]
            question = "404"
            "#,
        );

        let mut session = session();
        let outcome = PlanFlow::new(false)
            .run(&mut session, &plan, &PlanCtx::new(plan.name.clone(), 1))
            .unwrap();

        assert_eq!(outcome.questions_added, 2);
        assert_eq!(outcome.sections_added, 1);
        assert_eq!(outcome.missing_ids, vec!["404".to_string()]);
        assert_eq!(session.details().school_name, "Hill School");

        let overridden = session.paper().items()[2].question().unwrap();
        assert_eq!(overridden.text, "Explain photosynthesis briefly");
        assert_eq!(overridden.marks, 2);
        assert_eq!(session.catalog().get("3").unwrap().marks, 4);
        assert_eq!(session.paper().max_marks(), 3);
    }

    #[test]
    fn test_take_visible_uses_filters_and_skips_added() {
        let plan = plan(
            r#"
            name = "Math only"

            [filters]
            class = "6th"
            subject = "Math"

            [[entries]]
            question = "2"

            [[entries]]
            take_visible = 5
            "#,
        );

        let mut session = session();
        let outcome = PlanFlow::new(true)
            .run(&mut session, &plan, &PlanCtx::new(plan.name.clone(), 1))
            .unwrap();

        assert_eq!(outcome.questions_added, 2);
        let sources: Vec<&str> = session
            .paper()
            .items()
            .iter()
            .filter_map(|i| i.question())
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(sources, vec!["2", "1"]);
    }

    #[test]
    fn test_invalid_entry_leaves_session_untouched() {
        let plan = plan(
            r#"
            name = "Broken"

            [[entries]]
            section = "Part A"
            question = "1"
            "#,
        );

        let mut session = session();
        let err = PlanFlow::new(false)
            .run(&mut session, &plan, &PlanCtx::new(plan.name.clone(), 1))
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidEntry { index: 1, .. }));
        assert!(session.paper().is_empty());
    }
}
