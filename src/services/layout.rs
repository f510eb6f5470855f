//! 试卷排版 - 业务能力层
//!
//! 单次遍历试卷序列，把分节标题和题目排进固定尺寸的页面：
//! - 抬头只出现在第一页，之后的页面从上边距开始
//! - 每一项先计算整体高度，放不下就先换页，再整体输出（不拆分）
//! - 题号按分节计数，遇到分节标题重置为 1
//! - 单项高度超过一页时照常输出，允许溢出，不截断内容
//!
//! 单位为毫米（A4 默认 210 × 297），字号为磅。

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::details::PaperDetails;
use crate::models::paper::{Paper, PaperItem};
use crate::models::question::{Question, QuestionKind};

/// 1 磅对应的毫米数
const PT_TO_MM: f32 = 25.4 / 72.0;

/// 文本宽度测量
pub trait TextMetrics {
    /// 返回文本在指定字号下的宽度（毫米）
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// 按平均字宽估算的测量器（每个字符宽度 = 字号 × 比例）
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    pub char_width_ratio: f32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            char_width_ratio: 0.5,
        }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * PT_TO_MM * self.char_width_ratio
    }
}

/// 页面与排版参数
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    // --- 抬头（只在第一页） ---
    pub school_y: f32,
    pub test_name_y: f32,
    pub details_y: f32,
    /// 第一页正文起始位置
    pub body_start_y: f32,
    pub school_font: f32,
    pub test_name_font: f32,
    pub body_font: f32,
    pub option_font: f32,
    // --- 间距 ---
    pub line_height: f32,
    pub question_gap: f32,
    pub indent: f32,
    pub option_indent: f32,
    pub options_gap: f32,
    pub option_line_height: f32,
    pub pair_row_height: f32,
    pub column_gap: f32,
    /// 问答 / 说明理由题预留的作答空白
    pub answer_space: f32,
    /// 分值标签与题干之间保留的间隙
    pub marks_gap: f32,
    pub option_separator: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 15.0,
            school_y: 20.0,
            test_name_y: 30.0,
            details_y: 45.0,
            body_start_y: 60.0,
            school_font: 16.0,
            test_name_font: 14.0,
            body_font: 12.0,
            option_font: 10.0,
            line_height: 5.0,
            question_gap: 2.0,
            indent: 8.0,
            option_indent: 4.0,
            options_gap: 1.0,
            option_line_height: 3.8,
            pair_row_height: 4.2,
            column_gap: 12.0,
            answer_space: 8.0,
            marks_gap: 4.0,
            option_separator: "    ".to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn content_width(&self) -> f32 {
        (self.page_width - 2.0 * self.margin).max(1.0)
    }

    /// 正文可用的最低位置
    pub fn content_bottom(&self) -> f32 {
        self.page_height - self.margin
    }
}

/// 文本用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    School,
    TestName,
    Detail,
    Section,
    Question,
    Marks,
    Options,
    PairLeft,
    PairRight,
}

/// 一段定位好的文本
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub text: String,
    pub role: TextRole,
}

/// 一页
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPage {
    pub index: usize,
    pub runs: Vec<TextRun>,
}

/// 试卷项的落点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub item_id: String,
    pub page_index: usize,
    pub y: f32,
    pub height: f32,
    /// 题号（分节标题为 None）
    pub number: Option<u32>,
}

/// 排版结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDocument {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<RenderedPage>,
    pub placements: Vec<Placement>,
    pub max_marks: u64,
    pub question_count: usize,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 按试卷顺序列出题号
    pub fn question_numbers(&self) -> Vec<u32> {
        self.placements.iter().filter_map(|p| p.number).collect()
    }

    pub fn placement(&self, item_id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.item_id == item_id)
    }
}

/// 排版器
pub struct LayoutEngine<M: TextMetrics = MonospaceMetrics> {
    config: LayoutConfig,
    metrics: M,
}

impl LayoutEngine<MonospaceMetrics> {
    pub fn new(config: LayoutConfig) -> Self {
        Self::with_metrics(config, MonospaceMetrics::default())
    }
}

impl Default for LayoutEngine<MonospaceMetrics> {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

/// 排版过程中的状态
struct Cursor {
    y: f32,
    page_index: usize,
    counter: u32,
    pages: Vec<RenderedPage>,
}

impl Cursor {
    fn push(&mut self, run: TextRun) {
        if let Some(page) = self.pages.last_mut() {
            page.runs.push(run);
        }
    }
}

/// 一道题预先计算好的块
struct QuestionBlock {
    lines: Vec<String>,
    marks_text: String,
    marks_width: f32,
    extra: Extra,
    height: f32,
}

enum Extra {
    None { gap: f32 },
    Options { lines: Vec<String> },
    /// 空条目为 None：不输出文本，但保留所在行
    Pairs {
        left: Vec<Option<String>>,
        right: Vec<Option<String>>,
    },
    AnswerSpace,
}

impl<M: TextMetrics> LayoutEngine<M> {
    pub fn with_metrics(config: LayoutConfig, metrics: M) -> Self {
        Self { config, metrics }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// 排版整张试卷
    ///
    /// # 参数
    /// - `paper`: 试卷
    /// - `details`: 抬头信息
    ///
    /// # 返回
    /// 完整的多页排版结果
    pub fn render(&self, paper: &Paper, details: &PaperDetails) -> RenderedDocument {
        let max_marks = paper.max_marks();

        let mut cursor = Cursor {
            y: self.config.body_start_y,
            page_index: 0,
            counter: 1,
            pages: vec![RenderedPage {
                index: 0,
                runs: Vec::new(),
            }],
        };
        self.emit_header(&mut cursor, details, max_marks);

        let mut placements = Vec::with_capacity(paper.len());
        for item in paper.items() {
            let placement = match item {
                PaperItem::Section { id, .. } => {
                    let heading = item.section_heading().unwrap_or_default();
                    self.emit_section(&mut cursor, id, &heading)
                }
                PaperItem::Question { id, question, .. } => self.emit_question(&mut cursor, id, question),
            };
            placements.push(placement);
        }

        debug!(
            "排版完成: {} 页, {} 道题, 满分 {}",
            cursor.pages.len(),
            paper.question_count(),
            max_marks
        );

        RenderedDocument {
            page_width: self.config.page_width,
            page_height: self.config.page_height,
            pages: cursor.pages,
            placements,
            max_marks,
            question_count: paper.question_count(),
        }
    }

    fn emit_header(&self, cursor: &mut Cursor, details: &PaperDetails, max_marks: u64) {
        let cfg = &self.config;
        let content_w = cfg.content_width();

        let school = details.school_line();
        let school_w = self.metrics.text_width(&school, cfg.school_font);
        cursor.push(TextRun {
            x: cfg.margin + ((content_w - school_w) / 2.0).max(0.0),
            y: cfg.school_y,
            font_size: cfg.school_font,
            text: school,
            role: TextRole::School,
        });

        let test_name = details.test_line();
        let test_w = self.metrics.text_width(&test_name, cfg.test_name_font);
        cursor.push(TextRun {
            x: cfg.margin + ((content_w - test_w) / 2.0).max(0.0),
            y: cfg.test_name_y,
            font_size: cfg.test_name_font,
            text: test_name,
            role: TextRole::TestName,
        });

        let columns = details.detail_columns(max_marks);
        let col_w = content_w / columns.len() as f32;
        for (i, text) in columns.into_iter().enumerate() {
            cursor.push(TextRun {
                x: cfg.margin + i as f32 * col_w,
                y: cfg.details_y,
                font_size: cfg.body_font,
                text,
                role: TextRole::Detail,
            });
        }
    }

    /// 放不下就换页；新页面上不再检查，超高的块直接溢出
    fn ensure_room(&self, cursor: &mut Cursor, height: f32) {
        let fresh_page_top = if cursor.page_index == 0 {
            self.config.body_start_y
        } else {
            self.config.margin
        };
        let page_is_fresh = cursor.y <= fresh_page_top;

        if cursor.y + height > self.config.content_bottom() && !page_is_fresh {
            cursor.page_index += 1;
            cursor.y = self.config.margin;
            cursor.pages.push(RenderedPage {
                index: cursor.page_index,
                runs: Vec::new(),
            });
        }
    }

    fn emit_section(&self, cursor: &mut Cursor, id: &str, heading: &str) -> Placement {
        let cfg = &self.config;
        let height = cfg.line_height + cfg.question_gap;
        self.ensure_room(cursor, height);

        let placement = Placement {
            item_id: id.to_string(),
            page_index: cursor.page_index,
            y: cursor.y,
            height,
            number: None,
        };

        cursor.push(TextRun {
            x: cfg.margin,
            y: cursor.y,
            font_size: cfg.body_font,
            text: heading.to_string(),
            role: TextRole::Section,
        });
        cursor.y += height;
        cursor.counter = 1;

        placement
    }

    fn emit_question(&self, cursor: &mut Cursor, id: &str, question: &Question) -> Placement {
        let cfg = &self.config;
        let number = cursor.counter;
        let block = self.measure_question(number, question);
        self.ensure_room(cursor, block.height);

        let placement = Placement {
            item_id: id.to_string(),
            page_index: cursor.page_index,
            y: cursor.y,
            height: block.height,
            number: Some(number),
        };

        let text_x = cfg.margin + cfg.indent;
        for (i, line) in block.lines.iter().enumerate() {
            cursor.push(TextRun {
                x: text_x,
                y: cursor.y + i as f32 * cfg.line_height,
                font_size: cfg.body_font,
                text: line.clone(),
                role: TextRole::Question,
            });
        }

        // 分值右对齐在题干最后一行
        let last_line_y = cursor.y + block.lines.len().saturating_sub(1) as f32 * cfg.line_height;
        cursor.push(TextRun {
            x: cfg.margin + cfg.content_width() - block.marks_width,
            y: last_line_y,
            font_size: cfg.body_font,
            text: block.marks_text.clone(),
            role: TextRole::Marks,
        });
        cursor.y += block.lines.len() as f32 * cfg.line_height;

        let extra_x = text_x + cfg.option_indent;
        match &block.extra {
            Extra::None { gap } => cursor.y += gap,
            Extra::AnswerSpace => cursor.y += cfg.question_gap + cfg.answer_space,
            Extra::Options { lines } => {
                let top = cursor.y + cfg.options_gap;
                for (i, line) in lines.iter().enumerate() {
                    cursor.push(TextRun {
                        x: extra_x,
                        y: top + i as f32 * cfg.option_line_height,
                        font_size: cfg.option_font,
                        text: line.clone(),
                        role: TextRole::Options,
                    });
                }
                cursor.y = top + lines.len() as f32 * cfg.option_line_height + cfg.question_gap;
            }
            Extra::Pairs { left, right } => {
                let left_max_w = left
                    .iter()
                    .flatten()
                    .map(|t| self.metrics.text_width(t, cfg.option_font))
                    .fold(0.0_f32, f32::max);
                let right_x = extra_x + left_max_w + cfg.column_gap;
                let top = cursor.y + cfg.options_gap;

                for (i, text) in left.iter().enumerate() {
                    let Some(text) = text else { continue };
                    cursor.push(TextRun {
                        x: extra_x,
                        y: top + i as f32 * cfg.pair_row_height,
                        font_size: cfg.option_font,
                        text: text.clone(),
                        role: TextRole::PairLeft,
                    });
                }
                for (i, text) in right.iter().enumerate() {
                    let Some(text) = text else { continue };
                    cursor.push(TextRun {
                        x: right_x,
                        y: top + i as f32 * cfg.pair_row_height,
                        font_size: cfg.option_font,
                        text: text.clone(),
                        role: TextRole::PairRight,
                    });
                }
                let rows = left.len().max(right.len());
                cursor.y = top + rows as f32 * cfg.pair_row_height + cfg.question_gap;
            }
        }

        cursor.counter += 1;
        placement
    }

    /// 计算一道题的整体高度（题干 + 题型附加块）
    fn measure_question(&self, number: u32, question: &Question) -> QuestionBlock {
        let cfg = &self.config;

        let display_text = if question.kind == QuestionKind::FillInBlank {
            normalize_blanks(&question.text)
        } else {
            question.text.clone()
        };
        let numbered = format!("{}. {}", number, display_text);
        let marks_text = format!("[{}]", question.marks);
        let marks_width = self.metrics.text_width(&marks_text, cfg.body_font);
        let available = (cfg.content_width() - marks_width - cfg.indent - cfg.marks_gap).max(1.0);

        let lines = wrap_text(&self.metrics, &numbered, available, cfg.body_font);
        let text_height = lines.len() as f32 * cfg.line_height;

        let options = question.sorted_options();
        let extra = if !options.is_empty() {
            let segments: Vec<String> = options
                .iter()
                .map(|(label, text)| format!("{}) {}", label, text))
                .collect();
            Extra::Options {
                lines: wrap_segments(
                    &self.metrics,
                    &segments,
                    &cfg.option_separator,
                    available,
                    cfg.option_font,
                ),
            }
        } else if let Some((left, right)) = question.pair_columns() {
            Extra::Pairs {
                left: left
                    .iter()
                    .enumerate()
                    .map(|(i, item)| pair_entry(column_label(i), item))
                    .collect(),
                right: right
                    .iter()
                    .enumerate()
                    .map(|(i, item)| pair_entry((i + 1).to_string(), item))
                    .collect(),
            }
        } else if question.kind.needs_answer_space() {
            Extra::AnswerSpace
        } else {
            Extra::None {
                gap: cfg.question_gap,
            }
        };

        let extra_height = match &extra {
            Extra::None { gap } => *gap,
            Extra::AnswerSpace => cfg.question_gap + cfg.answer_space,
            Extra::Options { lines } => {
                cfg.options_gap + lines.len() as f32 * cfg.option_line_height + cfg.question_gap
            }
            Extra::Pairs { left, right } => {
                cfg.options_gap
                    + left.len().max(right.len()) as f32 * cfg.pair_row_height
                    + cfg.question_gap
            }
        };

        QuestionBlock {
            lines,
            marks_text,
            marks_width,
            extra,
            height: text_height + extra_height,
        }
    }
}

fn pair_entry(label: String, item: &str) -> Option<String> {
    let item = item.trim();
    (!item.is_empty()).then(|| format!("{}) {}", label, item))
}

/// 连线题左列标签：A..Z，之后 AA、AB ...
pub fn column_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    label.iter().rev().collect()
}

/// 按宽度贪心折行；单词超过一行时按字符硬切
///
/// 空文本也返回一行，保证分值有落点。
pub fn wrap_text<M: TextMetrics + ?Sized>(metrics: &M, text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if metrics.text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if metrics.text_width(word, font_size) <= max_width {
            current = word.to_string();
        } else {
            // 超长单词按字符切分
            for ch in word.chars() {
                let mut next = current.clone();
                next.push(ch);
                if !current.is_empty() && metrics.text_width(&next, font_size) > max_width {
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                } else {
                    current = next;
                }
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// 把若干段落用分隔符拼成行，段落尽量不拆开
///
/// 单个段落超过一行宽度时退回到 [`wrap_text`] 按单词折行。
pub fn wrap_segments<M: TextMetrics + ?Sized>(
    metrics: &M,
    segments: &[String],
    separator: &str,
    max_width: f32,
    font_size: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for segment in segments {
        let candidate = if current.is_empty() {
            segment.clone()
        } else {
            format!("{}{}{}", current, separator, segment)
        };

        if metrics.text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if metrics.text_width(segment, font_size) <= max_width {
            current = segment.clone();
        } else {
            let mut wrapped = wrap_text(metrics, segment, max_width, font_size);
            current = wrapped.pop().unwrap_or_default();
            lines.extend(wrapped);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// 统一填空标记（连续下划线、[blank]、{{blank}}）为固定长度的横线
fn normalize_blanks(text: &str) -> String {
    static BLANK_MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    let marker = BLANK_MARKER.get_or_init(|| Regex::new(r"_{2,}|\[blank\]|\{\{\s*blank\s*\}\}").ok());

    match marker {
        Some(re) => re.replace_all(text, "__________").into_owned(),
        None => text.to_string(),
    }
}
