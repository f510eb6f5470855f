//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量组卷处理器
//! - 管理应用生命周期（初始化、运行）
//! - 拉取题库快照，批量加载组卷计划（Vec<PaperPlan>）
//! - 输出全局统计信息
//!
//! ### `paper_processor` - 单份计划处理器
//! - 为一份计划建立 BuilderSession
//! - 委托 PlanFlow 执行计划
//! - 排版并导出
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PaperPlan>)
//!     ↓
//! paper_processor (处理单份 PaperPlan)
//!     ↓
//! workflow::PlanFlow / BuilderSession
//!     ↓
//! services (筛选 / 分页 / 排版 / 导出)
//!     ↓
//! clients (题库快照)
//! ```

pub mod batch_processor;
pub mod paper_processor;

pub use batch_processor::{App, ProcessingStats};
pub use paper_processor::{process_plan, PlanReport};
