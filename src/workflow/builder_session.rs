//! 组卷会话 - 流程层
//!
//! 持有一次组卷所需的全部状态：题库快照、筛选条件、当前页码、试卷和抬头。
//! 每个操作都是一次同步的状态变换，派生数据（候选项、可见题目）按需重算。

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::clients::catalog_client::Catalog;
use crate::error::AppResult;
use crate::models::details::PaperDetails;
use crate::models::filters::Filters;
use crate::models::paper::Paper;
use crate::models::question::{Question, QuestionKind};
use crate::services::export::ExportSink;
use crate::services::filter_engine::{self, FilterMemo, FilterOptions};
use crate::services::layout::{LayoutConfig, LayoutEngine, RenderedDocument};
use crate::services::pagination::{self, PageSlice};

/// 组卷会话
pub struct BuilderSession {
    catalog: Arc<Catalog>,
    filters: Filters,
    page: usize,
    page_size: usize,
    paper: Paper,
    details: PaperDetails,
    memo: FilterMemo,
    layout: LayoutEngine,
}

impl BuilderSession {
    /// 创建会话
    ///
    /// # 参数
    /// - `catalog`: 题库快照
    /// - `page_size`: 题目列表每页条数
    pub fn new(catalog: Arc<Catalog>, page_size: usize) -> Self {
        Self {
            catalog,
            filters: Filters::new(),
            page: 1,
            page_size,
            paper: Paper::new(),
            details: PaperDetails::default(),
            memo: FilterMemo::new(),
            layout: LayoutEngine::new(LayoutConfig::default()),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn paper(&self) -> &Paper {
        &self.paper
    }

    pub fn details(&self) -> &PaperDetails {
        &self.details
    }

    pub fn set_details(&mut self, details: PaperDetails) {
        self.details = details;
    }

    /// 请求的页码（未钳制）
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    // ========== 筛选 ==========

    /// 选择年级
    ///
    /// 年级和科目都按同一份候选项核对，不在候选项中的一律清空。
    pub fn set_class(&mut self, class_label: Option<String>) {
        self.filters.set_class(class_label);
        self.after_filter_change();
    }

    /// 选择科目，核对规则同 `set_class`
    pub fn set_subject(&mut self, subject: Option<String>) {
        self.filters.set_subject(subject);
        self.after_filter_change();
    }

    /// 切换知识点，返回切换后是否选中
    pub fn toggle_topic(&mut self, topic: &str) -> bool {
        let selected = self.filters.toggle_topic(topic);
        self.page = 1;
        selected
    }

    /// 切换题型，返回切换后是否选中
    pub fn toggle_kind(&mut self, kind: QuestionKind) -> bool {
        let selected = self.filters.toggle_kind(kind);
        self.page = 1;
        selected
    }

    pub fn set_search(&mut self, search: Option<String>) {
        self.filters.set_search(search);
        self.page = 1;
    }

    /// 一次性替换全部筛选条件（无效的年级 / 科目会被清空）
    pub fn apply_filters(&mut self, filters: Filters) {
        self.filters = filters;
        self.after_filter_change();
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// 各字段候选项
    pub fn options(&mut self) -> FilterOptions {
        self.memo.get(&self.catalog, &self.filters).0.clone()
    }

    /// 全部可见题目，保持题库顺序
    pub fn visible(&mut self) -> Vec<Question> {
        let ids = self.memo.get(&self.catalog, &self.filters).1.to_vec();
        ids.iter()
            .filter_map(|id| self.catalog.get(id).cloned())
            .collect()
    }

    /// 当前页的可见题目，页码钳制到有效范围内
    pub fn current_page(&mut self) -> PageSlice<Question> {
        let visible = self.visible();
        let page = pagination::clamp_page(self.page, visible.len(), self.page_size);
        pagination::paginate(&visible, page, self.page_size)
    }

    /// 整体替换题库快照
    ///
    /// 已选但不再存在的年级 / 科目会被清空，页码回到第一页。
    /// 试卷中的题目是独立副本，不受影响。
    pub fn replace_catalog(&mut self, catalog: Arc<Catalog>) {
        info!("🔄 题库已替换: {} -> {} 道题", self.catalog.len(), catalog.len());
        self.catalog = catalog;
        self.reconcile_filters();
        self.page = 1;
    }

    fn after_filter_change(&mut self) {
        self.reconcile_filters();
        self.page = 1;
    }

    fn reconcile_filters(&mut self) {
        let options = filter_engine::compute_options(&self.catalog, &self.filters);
        if filter_engine::reconcile(&mut self.filters, &options) {
            debug!("筛选条件已按最新候选项清理");
        }
    }

    // ========== 试卷 ==========

    /// 按题库 id 加入题目
    ///
    /// # 返回
    /// 新的试卷内 id；题库中不存在该题时返回 None
    pub fn add_question_by_id(&mut self, catalog_id: &str) -> Option<String> {
        let question = self.catalog.get(catalog_id)?;
        self.paper = self.paper.add_question(question);
        self.paper.items().last().map(|item| item.id().to_string())
    }

    /// 题库中的某道题是否已加入试卷
    pub fn is_added(&self, catalog_id: &str) -> bool {
        self.paper.contains_source(catalog_id)
    }

    pub fn add_section(&mut self, label: impl Into<String>, prefix: Option<String>) -> Option<String> {
        self.paper = self.paper.add_section(label, prefix);
        self.paper.items().last().map(|item| item.id().to_string())
    }

    pub fn remove(&mut self, item_id: &str) {
        self.paper = self.paper.remove(item_id);
    }

    pub fn reorder(&mut self, item_id: &str, target_id: &str) {
        self.paper = self.paper.reorder(item_id, target_id);
    }

    pub fn edit_question(&mut self, item_id: &str, question: Question) {
        self.paper = self.paper.edit_question(item_id, question);
    }

    // ========== 输出 ==========

    pub fn render(&self) -> RenderedDocument {
        self.layout.render(&self.paper, &self.details)
    }

    /// 排版并导出；失败时会话状态不变，可以直接重试
    ///
    /// # 返回
    /// 写出的文件路径和本次导出所用的排版结果
    pub async fn export<S: ExportSink>(
        &self,
        sink: &S,
        name: &str,
    ) -> AppResult<(PathBuf, RenderedDocument)> {
        let doc = self.render();
        let path = sink.export(&doc, name).await?;
        Ok((path, doc))
    }
}
