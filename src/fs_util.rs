//! 输出目录的文件系统辅助函数
use crate::error::{RsResult, RulesetError};
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;

/// 首次删除失败后的等待时间
const RETRY_DELAY: Duration = Duration::from_millis(500);
/// 慢速逐项删除时每项之间的间隔
const ENTRY_DELAY: Duration = Duration::from_millis(10);

/// 删除并重建目录
///
/// 目录被其他进程占用时整体删除可能失败：等待后改为逐项尽力删除，
/// 仍失败才作为致命错误上抛。
pub async fn recreate_dir(path: &Path) -> RsResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!("已删除输出目录：{}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            warn!("删除输出目录失败，将慢速重试：{} - {}", path.display(), e);
            tokio::time::sleep(RETRY_DELAY).await;
            remove_dir_slowly(path).await?;
        }
    }

    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// 逐项删除（先删内容再删目录），单项失败不中断，最后统一检查
async fn remove_dir_slowly(path: &Path) -> RsResult<()> {
    let entries: Vec<_> = WalkDir::new(path)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .collect();

    for entry in entries {
        let result = if entry.file_type().is_dir() {
            tokio::fs::remove_dir(entry.path()).await
        } else {
            tokio::fs::remove_file(entry.path()).await
        };
        if let Err(e) = result {
            if e.kind() != ErrorKind::NotFound {
                debug!("逐项删除失败：{} - {}", entry.path().display(), e);
            }
        }
        tokio::time::sleep(ENTRY_DELAY).await;
    }

    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RulesetError::FsContention {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// 列出目录下的普通文件（按文件名排序，跳过隐藏文件），目录不存在时返回空
pub fn sorted_files(dir: &Path) -> RsResult<Vec<std::path::PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| RulesetError::IoError(e.into()))?;
        if entry.file_type().is_file() && !is_hidden(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// 列出目录下的子目录（按名称排序，跳过隐藏目录）
pub fn sorted_dirs(dir: &Path) -> RsResult<Vec<std::path::PathBuf>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| RulesetError::IoError(e.into()))?;
        if entry.file_type().is_dir() && !is_hidden(entry.file_name()) {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
