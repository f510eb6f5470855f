use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 题库拉取相关错误
    #[error("题库错误: {0}")]
    Catalog(#[from] CatalogError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 组卷计划错误
    #[error("组卷计划错误: {0}")]
    Plan(#[from] PlanError),
    /// 导出错误（试卷状态保持不变，可重试）
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 题库拉取错误
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 网络请求失败
    #[error("请求题库失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 读取本地题库失败
    #[error("读取题库文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("题库 JSON 解析失败: {0}")]
    JsonParseFailed(#[from] serde_json::Error),
    /// 返回内容不是题目数组
    #[error("题库返回格式不正确 ({source_name}): 缺少 questions 数组")]
    UnexpectedShape { source_name: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 组卷计划错误
#[derive(Debug, Error)]
pub enum PlanError {
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 计划条目无法识别
    #[error("计划 {plan} 第 {index} 条无法识别：需要 section / question / take_visible 之一")]
    InvalidEntry { plan: String, index: usize },
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 创建输出目录失败
    #[error("创建输出目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入导出文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("序列化试卷失败: {0}")]
    SerializeFailed(#[from] serde_json::Error),
    /// 试卷为空
    #[error("试卷为空，没有可导出的内容")]
    EmptyDocument,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 导出格式无法识别
    #[error("无法识别的导出格式: {value} (可选: text / json)")]
    UnknownExportFormat { value: String },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端初始化失败: {0}")]
    HttpClient(#[source] reqwest::Error),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建题库请求失败错误
    pub fn catalog_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Catalog(CatalogError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
