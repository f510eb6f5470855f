//! 批量组卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量组卷计划的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、解析导出格式、拉取题库快照
//! 2. **批量加载**：扫描并加载所有组卷计划（`Vec<PaperPlan>`）
//! 3. **逐份处理**：按文件名顺序依次处理，单份失败不影响其他计划
//! 4. **全局统计**：汇总所有计划的处理结果

use crate::clients::catalog_client::{Catalog, CatalogCache, CatalogClient};
use crate::config::Config;
use crate::error::AppError;
use crate::models::plan::PaperPlan;
use crate::orchestrator::paper_processor;
use crate::services::export::{ExportFormat, Exporter};
use crate::utils::logging;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    catalog: Arc<Catalog>,
    exporter: Exporter,
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)
            .with_context(|| format!("无法写入日志文件: {}", config.output_log_file))?;

        logging::log_startup(&config.catalog_source, config.page_size);

        let format = ExportFormat::parse(&config.export_format).map_err(AppError::from)?;
        let exporter = Exporter::new(format, &config.output_folder);

        // 拉取题库；失败时按空题库继续
        let client = CatalogClient::new(&config)?;
        let cache = CatalogCache::new();
        info!("\n📚 正在拉取题库...");
        cache.refresh(&client).await;
        let catalog = cache.snapshot();
        info!("✓ 题库共 {} 道题", catalog.len());

        Ok(Self {
            config,
            catalog,
            exporter,
        })
    }

    /// 使用现成的题库快照创建应用（不拉取题库）
    pub fn with_catalog(config: Config, catalog: Arc<Catalog>) -> Result<Self> {
        let format = ExportFormat::parse(&config.export_format).map_err(AppError::from)?;
        let exporter = Exporter::new(format, &config.output_folder);
        Ok(Self {
            config,
            catalog,
            exporter,
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        let all_plans = self.load_plans().await?;

        if all_plans.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        logging::log_plans_loaded(all_plans.len());

        let stats = self.process_all_plans(&all_plans).await;

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// 加载组卷计划
    async fn load_plans(&self) -> Result<Vec<PaperPlan>> {
        info!("\n📁 正在扫描组卷计划...");
        crate::models::load_all_plans(&self.config.plan_folder).await
    }

    /// 依次处理所有计划
    async fn process_all_plans(&self, all_plans: &[PaperPlan]) -> ProcessingStats {
        let mut stats = ProcessingStats {
            total: all_plans.len(),
            ..Default::default()
        };

        for (idx, plan) in all_plans.iter().enumerate() {
            let plan_index = idx + 1;
            match paper_processor::process_plan(
                Arc::clone(&self.catalog),
                plan,
                plan_index,
                &self.config,
                &self.exporter,
            )
            .await
            {
                Ok(_) => stats.success += 1,
                Err(e) => {
                    error!("[试卷 {}] ❌ 处理过程中发生错误: {:#}", plan_index, e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}
