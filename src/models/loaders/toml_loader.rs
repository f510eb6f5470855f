use crate::error::{AppError, FileError, PlanError};
use crate::models::plan::PaperPlan;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载组卷计划
pub async fn load_toml_to_plan(toml_file_path: &Path) -> Result<PaperPlan> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(toml_file_path.display().to_string(), e))?;

    let plan: PaperPlan = toml::from_str(&content).map_err(|source| PlanError::TomlParseFailed {
        path: toml_file_path.display().to_string(),
        source,
    })?;

    Ok(plan.with_file_path(toml_file_path.to_string_lossy().to_string()))
}

/// 从文件夹中加载所有组卷计划
///
/// 单个文件解析失败只记录警告，不影响其他计划。结果按文件名排序，保证处理顺序稳定。
pub async fn load_all_plans(folder_path: &str) -> Result<Vec<PaperPlan>> {
    let folder = PathBuf::from(folder_path);

    if !folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut plans = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_toml_to_plan(&path).await {
            Ok(plan) => {
                tracing::info!("成功加载 {} 条组卷条目", plan.entries.len());
                plans.push(plan);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_folder(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "paper_builder_loader_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_load_all_plans_skips_broken_files() {
        let dir = temp_folder("skip");
        std::fs::write(dir.join("b.toml"), "name = \"Second\"\n").unwrap();
        std::fs::write(dir.join("a.toml"), "name = \"First\"\n").unwrap();
        std::fs::write(dir.join("broken.toml"), "name = [\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let plans = load_all_plans(dir.to_str().unwrap()).await.unwrap();
        let names: Vec<&str> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert!(plans[0].file_path.as_deref().unwrap().ends_with("a.toml"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_folder_is_error() {
        let err = load_all_plans("/definitely/not/here/plans").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FileError>(),
            Some(FileError::DirectoryNotFound { path }) if path == "/definitely/not/here/plans"
        ));
    }

    #[tokio::test]
    async fn test_unreadable_plan_is_file_error() {
        let dir = temp_folder("unreadable");
        let err = load_toml_to_plan(&dir.join("missing.toml")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::File(FileError::ReadFailed { .. }))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
