//! # Paper Builder
//!
//! 从题库中筛选题目、组装试卷并排版导出的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 拉取题库并规范化为 `Catalog` 快照
//! - `CatalogCache` - 只采用最近一次拉取的结果
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯函数能力，不持有状态
//! - `filter_engine` - 级联筛选（候选项 + 可见题目）
//! - `pagination` - 分页
//! - `layout` - 多页排版
//! - `export` - 文本 / JSON 导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 一次组卷的状态与操作
//! - `BuilderSession` - 筛选条件、页码、试卷、抬头
//! - `PlanFlow` - 把 TOML 组卷计划翻译成会话操作
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理所有组卷计划
//! - `orchestrator/paper_processor` - 单份计划：执行、排版、导出
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{Catalog, CatalogCache, CatalogClient, CatalogSource};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Filters, Paper, PaperDetails, PaperItem, PaperPlan, Question, QuestionKind};
pub use orchestrator::{process_plan, App};
pub use workflow::{BuilderSession, PlanFlow};
