//! 单份组卷计划处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **建立会话**：基于当前题库快照创建 `BuilderSession`
//! 2. **执行计划**：委托 `PlanFlow` 完成加题、分节和覆盖
//! 3. **排版导出**：渲染整张试卷并交给导出器
//! 4. **统计输出**：记录题目数、页数、满分和缺失的题库 id

use crate::clients::catalog_client::Catalog;
use crate::config::Config;
use crate::models::plan::PaperPlan;
use crate::services::export::ExportSink;
use crate::workflow::{BuilderSession, PlanCtx, PlanFlow, PlanOutcome};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// 单份计划的处理结果
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub output_path: PathBuf,
    pub outcome: PlanOutcome,
    pub page_count: usize,
    pub max_marks: u64,
}

/// 处理单份组卷计划
///
/// # 参数
/// - `catalog`: 题库快照
/// - `plan`: 组卷计划
/// - `plan_index`: 计划索引（用于日志）
/// - `config`: 配置
/// - `exporter`: 导出目标
///
/// # 返回
/// 处理结果；计划无效或导出失败时返回错误
pub async fn process_plan<S: ExportSink>(
    catalog: Arc<Catalog>,
    plan: &PaperPlan,
    plan_index: usize,
    config: &Config,
    exporter: &S,
) -> Result<PlanReport> {
    log_plan_start(plan_index, plan);

    let mut session = BuilderSession::new(catalog, config.page_size);
    let ctx = PlanCtx::new(plan.name.clone(), plan_index);

    let outcome = PlanFlow::new(config.verbose_logging)
        .run(&mut session, plan, &ctx)
        .with_context(|| format!("计划执行失败: {}", plan.name))?;

    if session.paper().question_count() == 0 {
        warn!("[试卷 {}] ⚠️ 试卷中没有题目", plan_index);
    }

    let output_name = plan.get_output_name();
    let (output_path, doc) = session
        .export(exporter, &output_name)
        .await
        .with_context(|| format!("导出失败: {}", output_name))?;

    let report = PlanReport {
        output_path,
        outcome,
        page_count: doc.page_count(),
        max_marks: doc.max_marks,
    };
    log_plan_complete(plan_index, &report);

    Ok(report)
}

// ========== 日志辅助函数 ==========

fn log_plan_start(plan_index: usize, plan: &PaperPlan) {
    info!("\n[试卷 {}] {}", plan_index, "─".repeat(30));
    info!("[试卷 {}] 开始处理", plan_index);
    info!("[试卷 {}] 名称: {}", plan_index, plan.name);
    if let Some(file_path) = &plan.file_path {
        info!("[试卷 {}] 文件: {}", plan_index, file_path);
    }
    info!("[试卷 {}] 条目总数: {}", plan_index, plan.entries.len());
}

fn log_plan_complete(plan_index: usize, report: &PlanReport) {
    info!(
        "[试卷 {}] 统计: 题目 {}, 分节 {}, 缺失 {}, 共 {} 页, 满分 {}",
        plan_index,
        report.outcome.questions_added,
        report.outcome.sections_added,
        report.outcome.missing_ids.len(),
        report.page_count,
        report.max_marks
    );
    info!(
        "[试卷 {}] ✅ 已导出: {}\n",
        plan_index,
        report.output_path.display()
    );
}
