use serde::{Deserialize, Serialize};

use super::details::PaperDetails;
use super::filters::Filters;
use crate::error::PlanError;

/// 组卷计划（一个 TOML 文件对应一份试卷）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperPlan {
    pub name: String,
    /// 导出文件名（不含扩展名），缺省时使用 `name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(default)]
    pub details: PaperDetails,
    /// `take_visible` 条目使用的筛选条件
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub entries: Vec<PlanEntry>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

/// 计划中的一条，`section` / `question` / `take_visible` 三选一
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// 覆盖题干（通过编辑副本实现，不影响题库）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 覆盖分值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_visible: Option<usize>,
}

/// 解析后的计划步骤
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Section {
        label: String,
        prefix: Option<String>,
    },
    Question {
        catalog_id: String,
        text: Option<String>,
        marks: Option<u32>,
    },
    /// 按计划的筛选条件，加入前 N 道可见题目
    TakeVisible(usize),
}

impl PaperPlan {
    /// 获取导出文件名，如果不存在则使用计划名称
    pub fn get_output_name(&self) -> String {
        self.output_name.clone().unwrap_or_else(|| self.name.clone())
    }

    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }

    /// 把条目解析为步骤；任何一条无法识别都视为整个计划无效
    pub fn steps(&self) -> Result<Vec<PlanStep>, PlanError> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.to_step().ok_or_else(|| PlanError::InvalidEntry {
                plan: self.name.clone(),
                index: index + 1,
            }))
            .collect()
    }
}

impl PlanEntry {
    fn to_step(&self) -> Option<PlanStep> {
        match (&self.section, &self.question, self.take_visible) {
            (Some(label), None, None) => Some(PlanStep::Section {
                label: label.clone(),
                prefix: self.prefix.clone(),
            }),
            (None, Some(id), None) => Some(PlanStep::Question {
                catalog_id: id.clone(),
                text: self.text.clone(),
                marks: self.marks.filter(|m| *m > 0),
            }),
            (None, None, Some(count)) => Some(PlanStep::TakeVisible(count)),
            _ => None,
        }
    }
}
