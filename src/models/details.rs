use serde::{Deserialize, Serialize};

/// 试卷抬头信息（只在第一页显示）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperDetails {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub topic_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub test_name: String,
}

impl PaperDetails {
    /// 学校名，空时显示占位
    pub fn school_line(&self) -> String {
        or_placeholder(&self.school_name, "SCHOOL")
    }

    /// 考试名称，空时显示占位
    pub fn test_line(&self) -> String {
        or_placeholder(&self.test_name, "Test Name")
    }

    /// 抬头信息行的四列：知识点、年级、日期、满分
    pub fn detail_columns(&self, max_marks: u64) -> [String; 4] {
        [
            format!("Topic: {}", or_placeholder(&self.topic_name, "-")),
            format!("Class: {}", or_placeholder(&self.class_name, "-")),
            format!("Date: {}", or_placeholder(&self.date, "-")),
            format!("Max Marks: {}", max_marks),
        ]
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}
