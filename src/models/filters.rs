//! 筛选条件
//!
//! 年级、科目是硬依赖：任何一个发生变化（包括清空），知识点和题型的已选项都会被清空，
//! 因为它们的候选集合已经不再保证有效。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::question::QuestionKind;

/// 题目筛选条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// 知识点（内部为"或"关系）
    #[serde(default)]
    pub topics: BTreeSet<String>,
    /// 题型（内部为"或"关系）
    #[serde(default)]
    pub kinds: BTreeSet<QuestionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 选择或清空年级，同时清空知识点与题型
    pub fn set_class(&mut self, class_label: Option<String>) {
        self.class_label = non_blank(class_label);
        self.clear_dependents();
    }

    /// 选择或清空科目，同时清空知识点与题型
    pub fn set_subject(&mut self, subject: Option<String>) {
        self.subject = non_blank(subject);
        self.clear_dependents();
    }

    /// 切换一个知识点；返回切换后是否处于选中状态
    pub fn toggle_topic(&mut self, topic: impl Into<String>) -> bool {
        let topic = topic.into();
        if self.topics.remove(&topic) {
            false
        } else {
            self.topics.insert(topic);
            true
        }
    }

    /// 切换一个题型；返回切换后是否处于选中状态
    pub fn toggle_kind(&mut self, kind: QuestionKind) -> bool {
        if self.kinds.remove(&kind) {
            false
        } else {
            self.kinds.insert(kind);
            true
        }
    }

    pub fn set_search(&mut self, search: Option<String>) {
        self.search = non_blank(search);
    }

    /// 去掉首尾空白后的搜索词；空白视为未设置
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// 年级与科目是否都已选择（知识点 / 题型候选只在此时计算）
    pub fn has_class_and_subject(&self) -> bool {
        self.class_label.is_some() && self.subject.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.class_label.is_none()
            && self.subject.is_none()
            && self.topics.is_empty()
            && self.kinds.is_empty()
            && self.search_term().is_none()
    }

    pub(crate) fn clear_dependents(&mut self) {
        self.topics.clear();
        self.kinds.clear();
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_dependents() -> Filters {
        let mut f = Filters::new();
        f.set_class(Some("6th".to_string()));
        f.set_subject(Some("Math".to_string()));
        f.toggle_topic("Algebra");
        f.toggle_kind(QuestionKind::ShortAnswer);
        f
    }

    #[test]
    fn test_changing_class_clears_topics_and_kinds() {
        let mut f = with_dependents();
        f.set_class(Some("7th".to_string()));
        assert!(f.topics.is_empty());
        assert!(f.kinds.is_empty());
        assert_eq!(f.subject.as_deref(), Some("Math"));
    }

    #[test]
    fn test_reselecting_same_subject_still_clears() {
        let mut f = with_dependents();
        f.set_subject(Some("Math".to_string()));
        assert!(f.topics.is_empty());
        assert!(f.kinds.is_empty());
    }

    #[test]
    fn test_clearing_subject_clears_dependents() {
        let mut f = with_dependents();
        f.set_subject(None);
        assert!(f.subject.is_none());
        assert!(f.topics.is_empty());
        assert!(!f.has_class_and_subject());
    }

    #[test]
    fn test_toggle_topic() {
        let mut f = Filters::new();
        assert!(f.toggle_topic("Algebra"));
        assert!(!f.toggle_topic("Algebra"));
        assert!(f.topics.is_empty());
    }

    #[test]
    fn test_blank_search_is_unset() {
        let mut f = Filters::new();
        f.set_search(Some("   ".to_string()));
        assert!(f.search.is_none());
        f.search = Some("  Water ".to_string());
        assert_eq!(f.search_term().as_deref(), Some("water"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let f: Filters = toml::from_str(
            r#"
            class = "6th"
            subject = "Math"
            topics = ["Algebra"]
            kinds = ["MCQ", "short_answer"]
            "#,
        )
        .unwrap();
        assert_eq!(f.class_label.as_deref(), Some("6th"));
        assert!(f.kinds.contains(&QuestionKind::MultipleChoice));
        assert!(f.kinds.contains(&QuestionKind::ShortAnswer));
    }
}
