//! 方言写出：`{output}/{dialect}/{bucket}/{category}.{ext}`
use super::{Dialect, DialectFormat, HeaderBlock};
use crate::error::RsResult;
use log::trace;
use rsruleset_engine::{Bucket, Category, Provenance, SegmentSet};
use std::path::{Path, PathBuf};

/// 渲染并写出一个分段文件（头部 + 正文）
pub async fn write_bucket_file(
    path: &Path,
    format: DialectFormat,
    header: &HeaderBlock,
    provenance: Option<Provenance>,
    lines: &[String],
) -> RsResult<()> {
    let mut content = header.render(provenance, lines.len());
    content.push_str(&format.render_body(lines)?);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    trace!("写出 {} 行：{}", lines.len(), path.display());
    Ok(())
}

/// 单个方言的写出器
#[derive(Debug, Clone)]
pub struct DialectWriter {
    dialect: Dialect,
    dialect_root: PathBuf,
    header: HeaderBlock,
}

impl DialectWriter {
    pub fn new(output_root: &Path, dialect: Dialect, header: HeaderBlock) -> Self {
        Self {
            dialect,
            dialect_root: output_root.join(dialect.name),
            header,
        }
    }

    pub fn dialect_root(&self) -> &Path {
        &self.dialect_root
    }

    /// 分类在某分段下的输出路径
    pub fn bucket_path(&self, bucket: Bucket, category: &Category) -> PathBuf {
        self.dialect_root
            .join(bucket.dir_name())
            .join(self.dialect.file_name(&category.name))
    }

    /// 写出分类的所有非空分段，返回写出的文件数
    pub async fn write_category(&self, category: &Category, segments: &SegmentSet) -> RsResult<usize> {
        let mut written = 0;
        for (bucket, lines) in segments.non_empty_buckets() {
            let path = self.bucket_path(bucket, category);
            write_bucket_file(&path, self.dialect.format, &self.header, Some(category.provenance), lines).await?;
            written += 1;
        }
        Ok(written)
    }
}
