//! 压缩编译：把统一规则集的文本分段转换为二进制规则集
pub mod compiler;

pub use compiler::{Behavior, RuleCompiler, SubprocessCompiler};

use crate::cancel::CancelSignal;
use crate::error::{FileError, FileResult, RsResult, RulesetError};
use crate::fs_util::sorted_files;
use crate::stats::CompactStats;
use log::{debug, warn};
use rsruleset_engine::classifier::is_comment_or_blank;
use rsruleset_engine::ip::to_cidr;
use rsruleset_engine::Bucket;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// 压缩编译器
pub struct Compactor {
    compiler: Arc<dyn RuleCompiler>,
    compiled_extension: String,
}

impl Compactor {
    pub fn new(compiler: Arc<dyn RuleCompiler>, compiled_extension: impl Into<String>) -> Self {
        Self {
            compiler,
            compiled_extension: compiled_extension.into(),
        }
    }

    /// 编译统一规则集下的 domainset 与 ip 两个分段目录
    pub async fn compact(&self, unified_root: &Path, cancel: &CancelSignal) -> RsResult<CompactStats> {
        let start = Instant::now();
        let mut stats = CompactStats::default();
        for bucket in Bucket::ALL {
            let Some(behavior) = Behavior::for_bucket(bucket) else {
                continue;
            };
            let dir_stats = self
                .compact_dir(&unified_root.join(bucket.dir_name()), behavior, cancel)
                .await?;
            stats.merge(&dir_stats);
        }
        stats.print_stats(start.elapsed());
        Ok(stats)
    }

    /// 编译单个目录：先清理全部旧产物，再逐个文件编译
    ///
    /// 单个文件失败只记录并跳过，不影响本次运行。
    pub async fn compact_dir(&self, dir: &Path, behavior: Behavior, cancel: &CancelSignal) -> RsResult<CompactStats> {
        let mut stats = CompactStats::default();
        if !dir.is_dir() {
            return Ok(stats);
        }

        stats.stale_removed = self.remove_stale_artifacts(dir).await?;

        for path in sorted_files(dir)? {
            if self.is_compiled_artifact(&path) {
                continue;
            }
            cancel.checkpoint()?;

            match self.compact_file(&path, behavior, cancel).await {
                Ok(target) => {
                    debug!("编译完成：{}", target.display());
                    stats.compiled += 1;
                }
                Err(FileError::Interrupted { .. }) => return Err(RulesetError::Cancelled),
                Err(e) => {
                    warn!("规则编译失败，跳过该文件：{} - {}", path.display(), e);
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }

    /// 删除目录下所有已编译产物，避免上次运行遗留的孤立产物
    async fn remove_stale_artifacts(&self, dir: &Path) -> RsResult<usize> {
        let mut removed = 0;
        for path in sorted_files(dir)? {
            if self.is_compiled_artifact(&path) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("清理过期编译产物 {} 个：{}", removed, dir.display());
        }
        Ok(removed)
    }

    fn is_compiled_artifact(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.compiled_extension)
    }

    /// 编译单个文件，返回产物路径；临时文件无论成败都会删除
    async fn compact_file(&self, path: &Path, behavior: Behavior, cancel: &CancelSignal) -> FileResult<PathBuf> {
        let scratch = scratch_path(path);
        let target = path.with_extension(&self.compiled_extension);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FileError::ScratchIo {
                path: path.to_path_buf(),
                source,
            })?;
        let result = match tokio::fs::write(&scratch, prepare_scratch(&content, behavior)).await {
            Ok(()) => self.compiler.convert(behavior, &scratch, &target, cancel).await,
            Err(source) => Err(FileError::ScratchIo {
                path: scratch.clone(),
                source,
            }),
        };

        match tokio::fs::remove_file(&scratch).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!("临时文件删除失败：{} - {}", scratch.display(), e);
            }
            _ => {}
        }
        result.map(|_| target)
    }
}

/// 与源文件同目录的隐藏临时文件
fn scratch_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.scratch", name))
}

/// 生成编译输入：去掉注释与空行；IP 分段的裸地址补全为 CIDR
pub fn prepare_scratch(content: &str, behavior: Behavior) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.lines().map(str::trim).filter(|line| !is_comment_or_blank(line)) {
        match behavior {
            Behavior::IpCidr => out.push_str(&to_cidr(line)),
            Behavior::Domain => out.push_str(line),
        }
        out.push('\n');
    }
    out
}
