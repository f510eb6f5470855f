//! 试卷组装模型
//!
//! 试卷是一个有序序列，元素为"题目副本"或"分节标题"。所有操作都返回新的 `Paper`，
//! 不修改原值；题目在加入时深拷贝，之后与题库完全解耦。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::question::Question;

/// 试卷中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaperItem {
    /// 题目副本
    Question {
        /// 试卷内 id（与题库 id 无关）
        id: String,
        /// 复制来源的题库 id，仅作引用，不持有
        source_question_id: String,
        question: Question,
    },
    /// 分节标题，重置后续题号
    Section {
        id: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
}

impl PaperItem {
    pub fn id(&self) -> &str {
        match self {
            PaperItem::Question { id, .. } | PaperItem::Section { id, .. } => id,
        }
    }

    pub fn question(&self) -> Option<&Question> {
        match self {
            PaperItem::Question { question, .. } => Some(question),
            PaperItem::Section { .. } => None,
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, PaperItem::Section { .. })
    }

    /// 分节标题的完整显示文本（前缀 + 空格 + 标题）
    pub fn section_heading(&self) -> Option<String> {
        match self {
            PaperItem::Section { label, prefix, .. } => Some(match prefix.as_deref().map(str::trim) {
                Some(p) if !p.is_empty() => format!("{} {}", p, label),
                _ => label.clone(),
            }),
            PaperItem::Question { .. } => None,
        }
    }
}

/// 试卷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paper {
    items: Vec<PaperItem>,
    /// 下一个 id 序号；只增不减，保证同一条派生链上的 id 不会重复
    #[serde(skip)]
    next_seq: u64,
}

impl PartialEq for Paper {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Paper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[PaperItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, item_id: &str) -> Option<&PaperItem> {
        self.items.iter().find(|it| it.id() == item_id)
    }

    pub fn position(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|it| it.id() == item_id)
    }

    /// 题库中的某道题是否已经加入过试卷
    pub fn contains_source(&self, source_id: &str) -> bool {
        self.items.iter().any(|it| {
            matches!(it, PaperItem::Question { source_question_id, .. } if source_question_id == source_id)
        })
    }

    /// 题目数量（不含分节标题）
    pub fn question_count(&self) -> usize {
        self.items.iter().filter(|it| !it.is_section()).count()
    }

    /// 满分：所有题目分值之和，与分节无关
    ///
    /// 按 u64 饱和累加，题库里的异常大分值不会导致溢出。
    pub fn max_marks(&self) -> u64 {
        self.items
            .iter()
            .filter_map(PaperItem::question)
            .fold(0u64, |total, q| total.saturating_add(u64::from(q.marks)))
    }

    /// 加入一道题
    ///
    /// 生成新的试卷内 id（不同于试卷中已有的任何 id，也不同于题库 id），
    /// 深拷贝题目后追加到末尾。同一道题可以多次加入，彼此独立。
    pub fn add_question(&self, question: &Question) -> Paper {
        let mut next = self.clone();
        let id = next.fresh_id("q", Some(&question.id));
        next.items.push(PaperItem::Question {
            id,
            source_question_id: question.id.clone(),
            question: question.clone(),
        });
        next
    }

    /// 追加分节标题；题号的重置在渲染时处理
    pub fn add_section(&self, label: impl Into<String>, prefix: Option<String>) -> Paper {
        let mut next = self.clone();
        let id = next.fresh_id("s", None);
        next.items.push(PaperItem::Section {
            id,
            label: label.into(),
            prefix: prefix.filter(|p| !p.trim().is_empty()),
        });
        next
    }

    /// 按 id 移除；不存在时原样返回
    pub fn remove(&self, item_id: &str) -> Paper {
        let mut next = self.clone();
        next.items.retain(|it| it.id() != item_id);
        next
    }

    /// 把 `item_id` 移动到 `target_id` 当前所在的位置，其余元素相对顺序不变
    ///
    /// 任一 id 不存在或两者相同时不做任何改动。
    pub fn reorder(&self, item_id: &str, target_id: &str) -> Paper {
        if item_id == target_id {
            return self.clone();
        }
        let (Some(from), Some(to)) = (self.position(item_id), self.position(target_id)) else {
            return self.clone();
        };

        let mut next = self.clone();
        let moved = next.items.remove(from);
        next.items.insert(to, moved);
        next
    }

    /// 替换某个题目副本的内容，保持试卷内 id 与来源引用不变
    ///
    /// id 不存在或指向分节标题时不做任何改动。题库不受影响。
    pub fn edit_question(&self, item_id: &str, new_question: Question) -> Paper {
        let mut next = self.clone();
        if let Some(PaperItem::Question { question, .. }) =
            next.items.iter_mut().find(|it| it.id() == item_id)
        {
            *question = new_question;
        }
        next
    }

    fn fresh_id(&mut self, prefix: &str, avoid: Option<&str>) -> String {
        let taken: HashSet<&str> = self.items.iter().map(PaperItem::id).collect();
        loop {
            self.next_seq += 1;
            let candidate = format!("{}{}", prefix, self.next_seq);
            if !taken.contains(candidate.as_str()) && avoid != Some(candidate.as_str()) {
                return candidate;
            }
        }
    }
}
