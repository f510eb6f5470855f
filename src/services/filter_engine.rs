//! 级联筛选 - 业务能力层
//!
//! 纯函数：输入题库快照和筛选条件，输出各字段的候选项和可见题目。
//! 不访问网络或存储，结果只由输入决定。

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::clients::catalog_client::Catalog;
use crate::models::filters::Filters;
use crate::models::question::{Question, QuestionKind};

/// 各筛选字段的候选项（均按升序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub classes: Vec<String>,
    pub subjects: Vec<String>,
    /// 只有年级和科目都已选择时才非空
    pub topics: Vec<String>,
    pub kinds: Vec<QuestionKind>,
}

/// 计算候选项
///
/// - 年级候选受已选科目约束，科目候选受已选年级约束（互相收窄）
/// - 知识点 / 题型候选只在年级和科目都已选择时计算，否则为空
pub fn compute_options(catalog: &Catalog, filters: &Filters) -> FilterOptions {
    let questions = catalog.questions();

    let classes = distinct(
        questions
            .iter()
            .filter(|q| field_matches(&q.subject, &filters.subject))
            .filter_map(|q| q.class_label.as_deref()),
    );

    let subjects = distinct(
        questions
            .iter()
            .filter(|q| field_matches(&q.class_label, &filters.class_label))
            .filter_map(|q| q.subject.as_deref()),
    );

    let (topics, kinds) = if filters.has_class_and_subject() {
        let scoped: Vec<&Question> = questions
            .iter()
            .filter(|q| {
                field_matches(&q.class_label, &filters.class_label)
                    && field_matches(&q.subject, &filters.subject)
            })
            .collect();

        let topics = distinct(scoped.iter().filter_map(|q| q.topic.as_deref()));
        let kinds: BTreeSet<QuestionKind> = scoped
            .iter()
            .map(|q| q.kind.clone())
            .filter(|k| !k.as_str().is_empty())
            .collect();
        (topics, kinds.into_iter().collect())
    } else {
        (Vec::new(), Vec::new())
    };

    FilterOptions {
        classes,
        subjects,
        topics,
        kinds,
    }
}

/// 单道题是否满足全部筛选条件
///
/// 年级、科目精确匹配；知识点、题型集合内部为"或"；搜索词不区分大小写做子串匹配。
pub fn matches(question: &Question, filters: &Filters) -> bool {
    if !field_matches(&question.class_label, &filters.class_label) {
        return false;
    }
    if !field_matches(&question.subject, &filters.subject) {
        return false;
    }
    if !filters.topics.is_empty() {
        match question.topic.as_deref() {
            Some(topic) if filters.topics.contains(topic) => {}
            _ => return false,
        }
    }
    if !filters.kinds.is_empty() && !filters.kinds.contains(&question.kind) {
        return false;
    }
    if let Some(term) = filters.search_term() {
        if !question.search_haystack().contains(&term) {
            return false;
        }
    }
    true
}

/// 计算可见题目，保持题库顺序
pub fn compute_visible<'a>(catalog: &'a Catalog, filters: &Filters) -> Vec<&'a Question> {
    catalog
        .questions()
        .iter()
        .filter(|q| matches(q, filters))
        .collect()
}

/// 清理已失效的选择
///
/// 已选年级 / 科目不在最新候选项中时清空它，并连带清空知识点与题型。
///
/// # 返回
/// 是否有字段被清空
pub fn reconcile(filters: &mut Filters, options: &FilterOptions) -> bool {
    let mut changed = false;

    if let Some(class_label) = &filters.class_label {
        if !options.classes.contains(class_label) {
            debug!("已选年级 {} 不再可用，清空", class_label);
            filters.class_label = None;
            filters.clear_dependents();
            changed = true;
        }
    }

    if let Some(subject) = &filters.subject {
        if !options.subjects.contains(subject) {
            debug!("已选科目 {} 不再可用，清空", subject);
            filters.subject = None;
            filters.clear_dependents();
            changed = true;
        }
    }

    changed
}

fn field_matches(value: &Option<String>, selected: &Option<String>) -> bool {
    match selected {
        None => true,
        Some(selected) => value.as_deref() == Some(selected.as_str()),
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ========== 缓存 ==========

/// 级联筛选结果缓存
///
/// 以（题库快照指针，筛选条件）为键，只保留最近一次的结果。
/// 题库整体替换后指针变化，缓存自然失效。
#[derive(Debug, Default)]
pub struct FilterMemo {
    key: Option<(usize, Filters)>,
    options: FilterOptions,
    visible_ids: Vec<String>,
}

impl FilterMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回候选项和可见题目 id（必要时重新计算）
    pub fn get(&mut self, catalog: &Arc<Catalog>, filters: &Filters) -> (&FilterOptions, &[String]) {
        let key = (Arc::as_ptr(catalog) as usize, filters.clone());
        if self.key.as_ref() != Some(&key) {
            self.options = compute_options(catalog, filters);
            self.visible_ids = compute_visible(catalog, filters)
                .into_iter()
                .map(|q| q.id.clone())
                .collect();
            self.key = Some(key);
        }
        (&self.options, &self.visible_ids)
    }

    /// 缓存是否对应给定输入
    pub fn is_fresh(&self, catalog: &Arc<Catalog>, filters: &Filters) -> bool {
        matches!(&self.key, Some((ptr, f)) if *ptr == Arc::as_ptr(catalog) as usize && f == filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_catalog() -> Catalog {
        Catalog::new(vec![
            Question::new("1", "2 + 3 = ?", 1, QuestionKind::MultipleChoice)
                .with_class("6th")
                .with_subject("Math")
                .with_topic("Arithmetic"),
            Question::new("2", "Solve x + 1 = 4", 2, QuestionKind::ShortAnswer)
                .with_class("6th")
                .with_subject("Math")
                .with_topic("Algebra"),
            Question::new("3", "Match organisms", 2, QuestionKind::MatchPairs)
                .with_class("7th")
                .with_subject("Science")
                .with_topic("Biology"),
        ])
    }

    fn selected(class_label: &str, subject: &str) -> Filters {
        let mut f = Filters::new();
        f.set_class(Some(class_label.to_string()));
        f.set_subject(Some(subject.to_string()));
        f
    }

    #[test]
    fn test_scenario_class_and_subject() {
        let catalog = scenario_catalog();
        let filters = selected("6th", "Math");

        let options = compute_options(&catalog, &filters);
        assert_eq!(options.topics, vec!["Algebra", "Arithmetic"]);
        assert_eq!(
            options.kinds,
            vec![QuestionKind::MultipleChoice, QuestionKind::ShortAnswer]
        );

        let visible: Vec<&str> = compute_visible(&catalog, &filters)
            .iter()
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(visible, vec!["1", "2"]);
    }

    #[test]
    fn test_topics_empty_without_both_selections() {
        let catalog = scenario_catalog();
        let mut filters = Filters::new();
        filters.set_class(Some("6th".to_string()));

        let options = compute_options(&catalog, &filters);
        assert!(options.topics.is_empty());
        assert!(options.kinds.is_empty());
        assert_eq!(options.subjects, vec!["Math"]);
        assert_eq!(options.classes, vec!["6th", "7th"]);
    }

    #[test]
    fn test_mutual_narrowing() {
        let catalog = scenario_catalog();
        let mut filters = Filters::new();
        filters.set_subject(Some("Science".to_string()));
        let options = compute_options(&catalog, &filters);
        assert_eq!(options.classes, vec!["7th"]);
        assert_eq!(options.subjects, vec!["Math", "Science"]);
    }

    #[test]
    fn test_topic_and_kind_are_disjunctive_within() {
        let catalog = scenario_catalog();
        let mut filters = selected("6th", "Math");
        filters.toggle_topic("Algebra");
        filters.toggle_topic("Arithmetic");
        assert_eq!(compute_visible(&catalog, &filters).len(), 2);

        filters.toggle_kind(QuestionKind::ShortAnswer);
        let visible = compute_visible(&catalog, &filters);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "2");
    }

    #[test]
    fn test_topic_filter_excludes_uncategorized() {
        let catalog = Catalog::new(vec![
            Question::new("a", "no topic", 1, QuestionKind::ShortAnswer),
            Question::new("b", "topic", 1, QuestionKind::ShortAnswer).with_topic("Algebra"),
        ]);
        let mut filters = Filters::new();
        filters.toggle_topic("Algebra");
        let visible = compute_visible(&catalog, &filters);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "b");
    }

    #[test]
    fn test_search_is_case_insensitive_over_all_fields() {
        let catalog = scenario_catalog();
        let mut filters = Filters::new();

        filters.set_search(Some("  SCIENCE ".to_string()));
        let ids: Vec<&str> = compute_visible(&catalog, &filters).iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);

        filters.set_search(Some("short_answer".to_string()));
        assert_eq!(compute_visible(&catalog, &filters).len(), 1);

        filters.set_search(Some("6TH".to_string()));
        assert_eq!(compute_visible(&catalog, &filters).len(), 2);
    }

    #[test]
    fn test_soundness_and_completeness() {
        let catalog = scenario_catalog();
        let mut filters = selected("6th", "Math");
        filters.toggle_kind(QuestionKind::MultipleChoice);

        let visible = compute_visible(&catalog, &filters);
        for q in catalog.questions() {
            let shown = visible.iter().any(|v| v.id == q.id);
            assert_eq!(shown, matches(q, &filters));
        }
        for q in &visible {
            assert_eq!(q.class_label.as_deref(), Some("6th"));
            assert_eq!(q.subject.as_deref(), Some("Math"));
            assert_eq!(q.kind, QuestionKind::MultipleChoice);
        }
    }

    #[test]
    fn test_empty_catalog_is_total() {
        let catalog = Catalog::empty();
        let filters = selected("6th", "Math");
        assert_eq!(compute_options(&catalog, &filters).classes.len(), 0);
        assert!(compute_visible(&catalog, &filters).is_empty());
    }

    #[test]
    fn test_reconcile_clears_vanished_subject() {
        let catalog = Catalog::new(vec![Question::new("1", "t", 1, QuestionKind::ShortAnswer)
            .with_class("6th")
            .with_subject("Math")]);
        let mut filters = selected("6th", "History");
        filters.toggle_topic("Wars");

        let options = compute_options(&catalog, &filters);
        assert!(reconcile(&mut filters, &options));
        assert_eq!(filters.class_label.as_deref(), Some("6th"));
        assert!(filters.subject.is_none());
        assert!(filters.topics.is_empty());

        let options = compute_options(&catalog, &filters);
        assert!(!reconcile(&mut filters, &options));
    }

    #[test]
    fn test_memo_recomputes_only_on_change() {
        let catalog = Arc::new(scenario_catalog());
        let mut memo = FilterMemo::new();
        let filters = selected("6th", "Math");

        let (_, ids) = memo.get(&catalog, &filters);
        assert_eq!(ids, &["1".to_string(), "2".to_string()]);
        assert!(memo.is_fresh(&catalog, &filters));

        let replaced = Arc::new(scenario_catalog());
        assert!(!memo.is_fresh(&replaced, &filters));

        let mut changed = filters.clone();
        changed.toggle_kind(QuestionKind::ShortAnswer);
        assert!(!memo.is_fresh(&catalog, &changed));
        let (_, ids) = memo.get(&catalog, &changed);
        assert_eq!(ids, &["2".to_string()]);
    }
}
