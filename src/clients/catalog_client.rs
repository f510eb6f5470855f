//! 题库客户端
//!
//! 一次性拉取整个题库，把字段不统一的原始记录规范化为 `Question`。
//! 拉取结果以不可变快照（`Arc<Catalog>`）的形式整体替换，并通过请求序号丢弃过期响应。

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, CatalogError, ConfigError};
use crate::models::question::{positive_marks, Question, QuestionKind};

// ========== 题库快照 ==========

/// 题库快照（只读）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    questions: Vec<Question>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// 由规范化后的题目构建；id 重复时保留第一条
    pub fn new(questions: Vec<Question>) -> Self {
        let mut kept = Vec::with_capacity(questions.len());
        let mut index = HashMap::with_capacity(questions.len());
        for q in questions {
            if index.contains_key(&q.id) {
                warn!("题库中存在重复 id: {}，已忽略后出现的记录", q.id);
                continue;
            }
            index.insert(q.id.clone(), kept.len());
            kept.push(q);
        }
        Self {
            questions: kept,
            index,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// 由原始记录构建，单条坏记录不影响其他记录
    pub fn from_records(records: &[Value]) -> Self {
        let questions: Vec<Question> = records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| normalize_record(idx, record))
            .collect();

        let skipped = records.len() - questions.len();
        if skipped > 0 {
            warn!("⚠️ {} 条题目记录缺少题干，已跳过", skipped);
        }
        Self::new(questions)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

// ========== 记录规范化 ==========

/// 把一条原始记录规范化为 `Question`
///
/// # 参数
/// - `row`: 记录在返回数组中的位置（缺少 id 时用于生成替代 id）
/// - `record`: 原始 JSON 记录
///
/// # 返回
/// 缺少题干时返回 None；分值缺失或无效时取 1
pub fn normalize_record(row: usize, record: &Value) -> Option<Question> {
    let Some(text) = first_string(record, &["question_text", "text"]) else {
        debug!("第 {} 条记录缺少题干: {}", row, record);
        return None;
    };

    let id = first_string(record, &["question_id", "id"]).unwrap_or_else(|| format!("row-{}", row));

    let marks = ["default_marks", "marks"]
        .iter()
        .find_map(|key| record.get(*key).and_then(as_integer))
        .map(positive_marks)
        .unwrap_or(1);

    let kind = first_string(record, &["question_type", "kind", "type"])
        .map(|tag| QuestionKind::parse(&tag))
        .unwrap_or_default();

    Some(Question {
        id,
        text,
        marks,
        class_label: first_string(record, &["class", "class_label"]),
        subject: first_string(record, &["subject"]),
        topic: first_string(record, &["topic"]),
        kind,
        options: record.get("options").and_then(parse_options),
        correct_option_id: first_string(record, &["correct_option_id", "correctOptionId"]),
        left_items: first_list(record, &["left_items", "leftItems"]),
        right_items: first_list(record, &["right_items", "rightItems"]),
        blank_template: first_string(record, &["blank_template", "blanks"]),
        subparts: first_list(record, &["subparts"]),
        reference_answer: first_string(record, &["question_answer", "reference_answer"]),
    })
}

/// 取第一个存在且非空的字段，数字也按字符串处理
fn first_string(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 选项既可能是对象，也可能是 JSON 编码后的字符串（SQLite 后端）
fn parse_options(value: &Value) -> Option<BTreeMap<String, String>> {
    let decoded;
    let object = match value {
        Value::Object(map) => map,
        Value::String(s) => {
            decoded = serde_json::from_str::<Value>(s).ok()?;
            decoded.as_object()?
        }
        _ => return None,
    };

    let options: BTreeMap<String, String> = object
        .iter()
        .filter_map(|(label, text)| {
            let text = match text {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some((label.trim().to_string(), text))
        })
        .filter(|(label, _)| !label.is_empty())
        .collect();

    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

fn first_list(record: &Value, keys: &[&str]) -> Option<Vec<String>> {
    keys.iter().find_map(|key| {
        let value = record.get(*key)?;
        let decoded;
        let array = match value {
            Value::Array(items) => items,
            Value::String(s) => {
                decoded = serde_json::from_str::<Value>(s).ok()?;
                decoded.as_array()?
            }
            _ => return None,
        };
        let items: Vec<String> = array
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect();
        Some(items)
    })
}

/// 从返回体中取出题目数组：裸数组或 `{ "questions": [...] }`
pub fn extract_records(body: Value, source_name: &str) -> AppResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(CatalogError::UnexpectedShape {
                source_name: source_name.to_string(),
            }
            .into()),
        },
        _ => Err(CatalogError::UnexpectedShape {
            source_name: source_name.to_string(),
        }
        .into()),
    }
}

// ========== 题库来源 ==========

/// 题库来源：返回全部原始记录，不做任何筛选
pub trait CatalogSource {
    fn fetch_raw(&self) -> impl Future<Output = AppResult<Vec<Value>>> + Send;
}

/// 本地 JSON 文件
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalogSource {
    async fn fetch_raw(&self) -> AppResult<Vec<Value>> {
        let path = self.path.display().to_string();
        debug!("读取本地题库: {}", path);

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::ReadFailed {
                path: path.clone(),
                source,
            })?;
        let body: Value = serde_json::from_str(&content).map_err(CatalogError::from)?;
        extract_records(body, &path)
    }
}

/// 远程题库接口（GET，返回整个题库）
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl CatalogSource for HttpCatalogSource {
    async fn fetch_raw(&self) -> AppResult<Vec<Value>> {
        debug!("请求远程题库: {}", self.url);

        let body: Value = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::catalog_request_failed(&self.url, e))?
            .json()
            .await
            .map_err(|e| AppError::catalog_request_failed(&self.url, e))?;

        extract_records(body, &self.url)
    }
}

/// 按配置选择的题库来源
#[derive(Debug, Clone)]
pub enum CatalogClient {
    File(FileCatalogSource),
    Http(HttpCatalogSource),
}

impl CatalogClient {
    /// 根据配置创建题库客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.catalog_is_remote() {
            Ok(CatalogClient::Http(HttpCatalogSource::new(
                &config.catalog_source,
                Duration::from_secs(config.http_timeout_secs),
            )?))
        } else {
            Ok(CatalogClient::File(FileCatalogSource::new(&config.catalog_source)))
        }
    }
}

impl CatalogSource for CatalogClient {
    async fn fetch_raw(&self) -> AppResult<Vec<Value>> {
        match self {
            CatalogClient::File(source) => source.fetch_raw().await,
            CatalogClient::Http(source) => source.fetch_raw().await,
        }
    }
}

// ========== 快照缓存 ==========

/// 一次拉取的请求序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
struct CacheState {
    applied: u64,
    catalog: Arc<Catalog>,
}

/// 题库快照缓存
///
/// - 拉取未完成前，快照为空题库
/// - 只接受最近一次发出的请求的结果，过期响应直接丢弃
/// - 拉取失败时退化为空题库
#[derive(Debug, Default)]
pub struct CatalogCache {
    issued: AtomicU64,
    state: RwLock<CacheState>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<Catalog> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&state.catalog)
    }

    /// 发出一次新的拉取，之前发出的请求全部作废
    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// 提交拉取结果
    ///
    /// # 返回
    /// 结果是否被采用（过期请求返回 false）
    pub fn complete(&self, ticket: FetchTicket, result: AppResult<Catalog>) -> bool {
        let latest = self.issued.load(Ordering::SeqCst);
        if ticket.0 != latest {
            debug!("丢弃过期的题库响应 (序号 {} / 最新 {})", ticket.0, latest);
            return false;
        }

        let catalog = match result {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("⚠️ 拉取题库失败，按空题库处理: {}", e);
                Catalog::empty()
            }
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if ticket.0 <= state.applied {
            return false;
        }
        state.applied = ticket.0;
        state.catalog = Arc::new(catalog);
        true
    }

    /// 拉取并替换快照
    pub async fn refresh<S: CatalogSource>(&self, source: &S) -> bool {
        let ticket = self.begin_fetch();
        let result = source
            .fetch_raw()
            .await
            .map(|records| Catalog::from_records(&records));
        let applied = self.complete(ticket, result);
        if applied {
            info!("✓ 题库已加载，共 {} 道题目", self.snapshot().len());
        }
        applied
    }
}
