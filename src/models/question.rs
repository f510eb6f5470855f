use phf::phf_map;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// 题型别名表（小写），题库中的写法并不统一
static KIND_ALIASES: phf::Map<&'static str, QuestionKind> = phf_map! {
    "multiple_choice" => QuestionKind::MultipleChoice,
    "multiple-choice" => QuestionKind::MultipleChoice,
    "mcq" => QuestionKind::MultipleChoice,
    "choice" => QuestionKind::MultipleChoice,
    "fill_in_blank" => QuestionKind::FillInBlank,
    "fill_in_blanks" => QuestionKind::FillInBlank,
    "fill_in_the_blank" => QuestionKind::FillInBlank,
    "blank" => QuestionKind::FillInBlank,
    "match_pairs" => QuestionKind::MatchPairs,
    "match_the_following" => QuestionKind::MatchPairs,
    "matching" => QuestionKind::MatchPairs,
    "short_answer" => QuestionKind::ShortAnswer,
    "long_answer" => QuestionKind::LongAnswer,
    "write_reasons" => QuestionKind::WriteReasons,
    "give_reasons" => QuestionKind::WriteReasons,
    "multi_part" => QuestionKind::MultiPart,
    "multipart" => QuestionKind::MultiPart,
};

/// 题型
///
/// 固定集合之外的题型保留原始字符串（`Other`），渲染时按纯文本处理。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum QuestionKind {
    MultipleChoice,
    FillInBlank,
    MatchPairs,
    #[default]
    ShortAnswer,
    LongAnswer,
    WriteReasons,
    MultiPart,
    Other(String),
}

impl QuestionKind {
    /// 获取标准标签
    pub fn as_str(&self) -> &str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::FillInBlank => "fill_in_blank",
            QuestionKind::MatchPairs => "match_pairs",
            QuestionKind::ShortAnswer => "short_answer",
            QuestionKind::LongAnswer => "long_answer",
            QuestionKind::WriteReasons => "write_reasons",
            QuestionKind::MultiPart => "multi_part",
            QuestionKind::Other(tag) => tag,
        }
    }

    /// 从题库标签解析题型（忽略大小写与首尾空白）
    ///
    /// 空标签按简答题处理。
    pub fn parse(tag: &str) -> Self {
        let normalized = tag.trim().to_lowercase();
        if normalized.is_empty() {
            return QuestionKind::default();
        }
        KIND_ALIASES
            .get(normalized.as_str())
            .cloned()
            .unwrap_or(QuestionKind::Other(normalized))
    }

    /// 是否需要为手写作答预留额外空白
    pub fn needs_answer_space(&self) -> bool {
        matches!(self, QuestionKind::LongAnswer | QuestionKind::WriteReasons)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QuestionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(QuestionKind::parse(&tag))
    }
}

/// 题库中的一道题（规范化之后，只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default = "default_marks", deserialize_with = "deserialize_marks")]
    pub marks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub kind: QuestionKind,

    // --- 题型相关的可选内容 ---
    /// 选择题选项：标签 → 内容，按标签升序
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_option_id: Option<String>,
    /// 连线题左列（长度可与右列不同）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subparts: Option<Vec<String>>,
    /// 参考答案，仅供参考
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
}

impl Default for Question {
    fn default() -> Self {
        Self {
            id: String::new(),
            text: String::new(),
            marks: default_marks(),
            class_label: None,
            subject: None,
            topic: None,
            kind: QuestionKind::default(),
            options: None,
            correct_option_id: None,
            left_items: None,
            right_items: None,
            blank_template: None,
            subparts: None,
            reference_answer: None,
        }
    }
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>, marks: u32, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            marks: marks.max(1),
            kind,
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class_label: impl Into<String>) -> Self {
        self.class_label = Some(class_label.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_options<I, K, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.options = Some(options.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn with_pairs<L, R>(mut self, left: L, right: R) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        self.left_items = Some(left.into_iter().map(Into::into).collect());
        self.right_items = Some(right.into_iter().map(Into::into).collect());
        self
    }

    /// 搜索用的拼接文本（小写）：题干、科目、知识点、年级、题型
    pub fn search_haystack(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.text,
            self.subject.as_deref().unwrap_or(""),
            self.topic.as_deref().unwrap_or(""),
            self.class_label.as_deref().unwrap_or(""),
            self.kind
        )
        .to_lowercase()
    }

    /// 选择题选项，按标签升序；非选择题或无选项时为空
    pub fn sorted_options(&self) -> Vec<(&str, &str)> {
        match (&self.kind, &self.options) {
            (QuestionKind::MultipleChoice, Some(options)) => options
                .iter()
                .map(|(label, text)| (label.as_str(), text.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// 连线题左右两列；非连线题或两列都缺失时返回 None
    pub fn pair_columns(&self) -> Option<(&[String], &[String])> {
        if self.kind != QuestionKind::MatchPairs {
            return None;
        }
        if self.left_items.is_none() && self.right_items.is_none() {
            return None;
        }
        Some((
            self.left_items.as_deref().unwrap_or(&[]),
            self.right_items.as_deref().unwrap_or(&[]),
        ))
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = crate::utils::logging::truncate_text(&self.text, 60);
        write!(f, "{} [{} | {}分]", preview, self.kind, self.marks)
    }
}

pub(crate) fn default_marks() -> u32 {
    1
}

/// 分值既可能是整数也可能是字符串；无法解析或非正数时取 1
pub(crate) fn deserialize_marks<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct MarksVisitor;

    impl<'de> Visitor<'de> for MarksVisitor {
        type Value = u32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer representing marks")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(positive_marks(value.trim().parse::<i64>().unwrap_or(0)))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(positive_marks(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(positive_marks(i64::try_from(value).unwrap_or(i64::MAX)))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(positive_marks(value.round() as i64))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(default_marks())
        }
    }

    deserializer.deserialize_any(MarksVisitor)
}

pub(crate) fn positive_marks(value: i64) -> u32 {
    if value <= 0 {
        default_marks()
    } else {
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}
