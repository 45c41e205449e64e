//! 方言聚合过程：规则源遍历 + 单行分类 + 按分类聚合
use crate::cancel::CancelSignal;
use crate::config::PipelineConfig;
use crate::dialect::{Dialect, DialectWriter};
use crate::error::{RsResult, RulesetError};
use crate::source::{RuleFile, SourceTreeWalker};
use crate::stats::PassStats;
use log::debug;
use rsruleset_engine::{LineClassifier, RuleLine, SegmentAggregator, SegmentSet};
use std::time::Instant;

/// 每处理多少行检查一次取消信号
const LINE_CHECKPOINT_INTERVAL: usize = 4096;

/// 单个方言的一次聚合
pub struct DialectPass<'a> {
    config: &'a PipelineConfig,
    dialect: Dialect,
    classifier: LineClassifier,
}

impl<'a> DialectPass<'a> {
    pub fn new(config: &'a PipelineConfig, dialect: Dialect) -> Self {
        let classifier =
            LineClassifier::new(dialect.mode).with_signature_markers(config.signature_markers.iter().cloned());
        Self {
            config,
            dialect,
            classifier,
        }
    }

    /// 聚合全部规则源，再通过写出器落盘
    pub async fn run(&self, writer: &DialectWriter, cancel: &CancelSignal) -> RsResult<PassStats> {
        let start = Instant::now();
        let (aggregator, mut stats) = self.aggregate(cancel).await?;

        stats.categories = aggregator.len();
        for (category, segments) in aggregator.into_sorted() {
            cancel.checkpoint()?;
            stats.buckets.add_segments(&segments);
            stats.files_written += writer.write_category(&category, &segments).await?;
        }

        stats.print_stats(start.elapsed());
        Ok(stats)
    }

    /// 按配置顺序遍历规则源，返回运行期聚合结果
    pub async fn aggregate(&self, cancel: &CancelSignal) -> RsResult<(SegmentAggregator, PassStats)> {
        let mut aggregator = SegmentAggregator::new();
        let mut stats = PassStats::new(self.dialect.name);

        for tree in &self.config.sources {
            let files = SourceTreeWalker::new(tree).rule_files()?;
            debug!(
                "[{}] 规则源 {} ({}) 共 {} 个规则文件",
                self.dialect.name,
                tree.root.display(),
                tree.provenance,
                files.len()
            );

            for file in files {
                cancel.checkpoint()?;
                let segments = self.classify_file(&file, &mut stats, cancel).await?;
                aggregator.append(&file.category, segments);
                stats.files_read += 1;
            }
        }

        Ok((aggregator, stats))
    }

    /// 分类单个文件的全部行
    async fn classify_file(
        &self,
        file: &RuleFile,
        stats: &mut PassStats,
        cancel: &CancelSignal,
    ) -> RsResult<SegmentSet> {
        let bytes = tokio::fs::read(&file.path).await?;
        let content = String::from_utf8_lossy(&bytes);
        let mut segments = SegmentSet::new();

        for (idx, text) in content.lines().enumerate() {
            if idx % LINE_CHECKPOINT_INTERVAL == 0 {
                cancel.checkpoint()?;
            }
            stats.lines_read += 1;

            let classified = self
                .classifier
                .classify(&RuleLine::new(text, &file.path))
                .map_err(|source| RulesetError::MalformedRule {
                    path: file.path.clone(),
                    line_no: idx + 1,
                    source,
                })?;

            match classified {
                Some(line) => segments.push(line.bucket, line.value),
                None => stats.lines_dropped += 1,
            }
        }

        Ok(segments)
    }
}
