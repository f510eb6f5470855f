//! 导出 - 业务能力层
//!
//! 把排版结果交给外部：纯文本（页与页之间用换页符分隔）或 JSON。
//! 导出失败只返回错误，不改动试卷或排版结果，调用方可以直接重试。

use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, ExportError};
use crate::services::layout::{RenderedDocument, RenderedPage};

/// 纯文本导出时每列对应的毫米数
const MM_PER_COLUMN: f32 = 2.0;
/// 纯文本导出时每行对应的毫米数
const MM_PER_ROW: f32 = 5.0;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownExportFormat {
                value: value.to_string(),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

/// 导出目标
pub trait ExportSink {
    /// 导出文档
    ///
    /// # 参数
    /// - `doc`: 排版结果
    /// - `name`: 文件名（不含扩展名）
    ///
    /// # 返回
    /// 写出的文件路径
    fn export(
        &self,
        doc: &RenderedDocument,
        name: &str,
    ) -> impl Future<Output = Result<PathBuf, ExportError>> + Send;
}

/// 纯文本导出
#[derive(Debug, Clone)]
pub struct TextExporter {
    output_folder: PathBuf,
}

impl TextExporter {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }
}

impl ExportSink for TextExporter {
    async fn export(&self, doc: &RenderedDocument, name: &str) -> Result<PathBuf, ExportError> {
        let body = render_plain_text(doc)?;
        let path = self.output_folder.join(format!("{}.{}", name, ExportFormat::Text.extension()));
        write_file(&self.output_folder, &path, body.as_bytes()).await?;
        Ok(path)
    }
}

/// JSON 导出
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_folder: PathBuf,
}

impl JsonExporter {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }
}

impl ExportSink for JsonExporter {
    async fn export(&self, doc: &RenderedDocument, name: &str) -> Result<PathBuf, ExportError> {
        if doc.question_count == 0 {
            return Err(ExportError::EmptyDocument);
        }
        let body = serde_json::to_string_pretty(doc)?;
        let path = self.output_folder.join(format!("{}.{}", name, ExportFormat::Json.extension()));
        write_file(&self.output_folder, &path, body.as_bytes()).await?;
        Ok(path)
    }
}

/// 按配置选择的导出器
#[derive(Debug, Clone)]
pub enum Exporter {
    Text(TextExporter),
    Json(JsonExporter),
}

impl Exporter {
    pub fn new(format: ExportFormat, output_folder: impl Into<PathBuf>) -> Self {
        match format {
            ExportFormat::Text => Self::Text(TextExporter::new(output_folder)),
            ExportFormat::Json => Self::Json(JsonExporter::new(output_folder)),
        }
    }
}

impl ExportSink for Exporter {
    async fn export(&self, doc: &RenderedDocument, name: &str) -> Result<PathBuf, ExportError> {
        match self {
            Self::Text(exporter) => exporter.export(doc, name).await,
            Self::Json(exporter) => exporter.export(doc, name).await,
        }
    }
}

async fn write_file(folder: &Path, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    tokio::fs::create_dir_all(folder)
        .await
        .map_err(|source| ExportError::CreateDirFailed {
            path: folder.display().to_string(),
            source,
        })?;

    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| ExportError::WriteFailed {
            path: path.display().to_string(),
            source,
        })?;

    debug!("已写出 {} ({} 字节)", path.display(), bytes.len());
    Ok(())
}

/// 把排版结果转成纯文本
///
/// 坐标按固定网格映射到行列，同一行的文本按 x 排序；页之间插入换页符。
pub fn render_plain_text(doc: &RenderedDocument) -> Result<String, ExportError> {
    if doc.question_count == 0 {
        return Err(ExportError::EmptyDocument);
    }

    let pages: Vec<String> = doc.pages.iter().map(page_to_text).collect();
    Ok(pages.join("\n\u{000C}\n"))
}

fn page_to_text(page: &RenderedPage) -> String {
    let mut rows: Vec<(i64, Vec<(usize, &str)>)> = Vec::new();

    for run in &page.runs {
        let row = (run.y / MM_PER_ROW * 10.0).round() as i64;
        let column = (run.x / MM_PER_COLUMN).round().max(0.0) as usize;
        match rows.iter_mut().find(|(r, _)| *r == row) {
            Some((_, cells)) => cells.push((column, run.text.as_str())),
            None => rows.push((row, vec![(column, run.text.as_str())])),
        }
    }
    rows.sort_by_key(|(row, _)| *row);

    let mut lines = Vec::with_capacity(rows.len());
    for (_, mut cells) in rows {
        cells.sort_by_key(|(column, _)| *column);
        let mut line = String::new();
        for (column, text) in cells {
            let width = line.chars().count();
            if column > width {
                line.push_str(&" ".repeat(column - width));
            } else if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(text);
        }
        lines.push(line.trim_start().to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::details::PaperDetails;
    use crate::models::paper::Paper;
    use crate::models::question::{Question, QuestionKind};
    use crate::services::layout::{LayoutConfig, LayoutEngine};

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("paper_builder_export_{}_{}", name, std::process::id()))
    }

    fn sample_doc() -> RenderedDocument {
        let paper = Paper::new()
            .add_section("Part A", None)
            .add_question(
                &Question::new("1", "2 + 3 = ?", 1, QuestionKind::MultipleChoice)
                    .with_options([("A", "4"), ("B", "5")]),
            );
        let details = PaperDetails {
            school_name: "Hill School".to_string(),
            ..Default::default()
        };
        LayoutEngine::new(LayoutConfig::default()).render(&paper, &details)
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(ExportFormat::parse("TEXT").unwrap(), ExportFormat::Text);
        assert_eq!(ExportFormat::parse(" json ").unwrap(), ExportFormat::Json);
        assert!(matches!(
            ExportFormat::parse("pdf"),
            Err(ConfigError::UnknownExportFormat { .. })
        ));
    }

    #[test]
    fn test_plain_text_contains_content() {
        let text = render_plain_text(&sample_doc()).unwrap();
        assert!(text.contains("Hill School"));
        assert!(text.contains("Part A"));
        assert!(text.contains("1. 2 + 3 = ?"));
        assert!(text.contains("[1]"));
        assert!(text.contains("A) 4    B) 5"));
        assert!(!text.contains('\u{000C}'));
    }

    #[test]
    fn test_plain_text_separates_pages() {
        let mut paper = Paper::new();
        for i in 0..100 {
            paper = paper.add_question(&Question::new(i.to_string(), "Filler", 1, QuestionKind::ShortAnswer));
        }
        let doc = LayoutEngine::new(LayoutConfig::default()).render(&paper, &PaperDetails::default());
        let text = render_plain_text(&doc).unwrap();
        assert_eq!(text.matches('\u{000C}').count(), doc.page_count() - 1);
    }

    #[test]
    fn test_empty_document_rejected() {
        let doc = LayoutEngine::new(LayoutConfig::default()).render(&Paper::new(), &PaperDetails::default());
        assert!(matches!(render_plain_text(&doc), Err(ExportError::EmptyDocument)));
    }

    #[tokio::test]
    async fn test_text_and_json_exporters_write_files() {
        let dir = temp_dir("write");
        let doc = sample_doc();

        let path = Exporter::new(ExportFormat::Text, &dir).export(&doc, "paper").await.unwrap();
        assert!(path.ends_with("paper.txt"));
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("Part A"));

        let path = Exporter::new(ExportFormat::Json, &dir).export(&doc, "paper").await.unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(value["max_marks"], 1);
        assert_eq!(value["question_count"], 1);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn test_json_exporter_rejects_empty_paper() {
        let doc = LayoutEngine::new(LayoutConfig::default()).render(&Paper::new(), &PaperDetails::default());
        let dir = temp_dir("empty");
        let result = tokio_test::block_on(JsonExporter::new(&dir).export(&doc, "paper"));
        assert!(matches!(result, Err(ExportError::EmptyDocument)));
        assert!(!dir.join("paper.json").exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_export_error() {
        // 输出目录被同名文件占用
        let blocker = temp_dir("blocked");
        tokio::fs::write(&blocker, b"x").await.unwrap();

        let err = TextExporter::new(&blocker).export(&sample_doc(), "paper").await.unwrap_err();
        assert!(matches!(err, ExportError::CreateDirFailed { .. }));

        let _ = tokio::fs::remove_file(&blocker).await;
    }
}
