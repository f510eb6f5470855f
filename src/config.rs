/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 题库来源：本地 JSON 文件路径，或 http(s) 地址
    pub catalog_source: String,
    /// 组卷计划（TOML）存放目录
    pub plan_folder: String,
    /// 导出文件目录
    pub output_folder: String,
    /// 导出格式：text / json
    pub export_format: String,
    /// 题目列表每页条数
    pub page_size: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 拉取题库的 HTTP 超时（秒）
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_source: "catalog/questions.json".to_string(),
            plan_folder: "plans".to_string(),
            output_folder: "output".to_string(),
            export_format: "text".to_string(),
            page_size: 10,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            catalog_source: std::env::var("CATALOG_SOURCE").unwrap_or(default.catalog_source),
            plan_folder: std::env::var("PLAN_FOLDER").unwrap_or(default.plan_folder),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            export_format: std::env::var("EXPORT_FORMAT").unwrap_or(default.export_format),
            page_size: std::env::var("PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(default.page_size),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.http_timeout_secs),
        }
    }

    /// 题库来源是否为远程地址
    pub fn catalog_is_remote(&self) -> bool {
        self.catalog_source.starts_with("http://") || self.catalog_source.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_detection() {
        let mut config = Config::default();
        assert!(!config.catalog_is_remote());

        config.catalog_source = "https://bank.example.org/api/questions".to_string();
        assert!(config.catalog_is_remote());
    }

    #[test]
    fn test_default_page_size() {
        assert_eq!(Config::default().page_size, 10);
    }
}
