//! 负责各阶段统计数据的定义、更新与格式化输出
use rsruleset_engine::{Bucket, SegmentSet};
use std::time::Duration;

/// 分段行数统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BucketCounts {
    pub domain: usize,
    pub non_ip: usize,
    pub ip: usize,
}

impl BucketCounts {
    pub fn add(&mut self, bucket: Bucket, count: usize) {
        match bucket {
            Bucket::Domain => self.domain += count,
            Bucket::NonIp => self.non_ip += count,
            Bucket::Ip => self.ip += count,
        }
    }

    pub fn add_segments(&mut self, segments: &SegmentSet) {
        for bucket in Bucket::ALL {
            self.add(bucket, segments.get(bucket).len());
        }
    }

    pub fn total(&self) -> usize {
        self.domain + self.non_ip + self.ip
    }
}

/// 方言聚合过程统计
#[derive(Debug, Default, Clone)]
pub struct PassStats {
    /// 方言名
    pub dialect: &'static str,
    /// 读取的规则文件数
    pub files_read: usize,
    /// 读取的原始行数
    pub lines_read: usize,
    /// 被丢弃的行（空行/注释/签名）
    pub lines_dropped: usize,
    /// 输出分类数
    pub categories: usize,
    /// 写出的文件数
    pub files_written: usize,
    pub buckets: BucketCounts,
}

impl PassStats {
    pub fn new(dialect: &'static str) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn print_stats(&self, total_time: Duration) {
        log::info!(
            "[{}] 聚合完成 | 耗时: {:?} | 文件: {} | 行: {} (丢弃 {}) | 分类: {} | 写出文件: {}",
            self.dialect,
            total_time,
            self.files_read,
            self.lines_read,
            self.lines_dropped,
            self.categories,
            self.files_written
        );
        log::debug!(
            "[{}] 分段统计: 共 {} | domainset {} | non_ip {} | ip {}",
            self.dialect,
            self.buckets.total(),
            self.buckets.domain,
            self.buckets.non_ip,
            self.buckets.ip
        );
    }
}

/// 合并阶段统计
#[derive(Debug, Default, Clone)]
pub struct MergeStats {
    pub files_read: usize,
    /// 合并后的输出文件名数
    pub file_keys: usize,
    pub files_written: usize,
    pub buckets: BucketCounts,
}

impl MergeStats {
    pub fn print_stats(&self, total_time: Duration) {
        log::info!(
            "[UnifiedRuleSet] 合并完成 | 耗时: {:?} | 读取文件: {} | 文件名: {} | 写出文件: {}",
            total_time,
            self.files_read,
            self.file_keys,
            self.files_written
        );
        log::debug!(
            "[UnifiedRuleSet] 分段统计: 共 {} | domainset {} | non_ip {} | ip {}",
            self.buckets.total(),
            self.buckets.domain,
            self.buckets.non_ip,
            self.buckets.ip
        );
    }
}

/// 压缩编译统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompactStats {
    /// 删除的过期编译产物
    pub stale_removed: usize,
    pub compiled: usize,
    /// 编译失败并跳过的文件
    pub failed: usize,
}

impl CompactStats {
    pub fn merge(&mut self, other: &CompactStats) {
        self.stale_removed += other.stale_removed;
        self.compiled += other.compiled;
        self.failed += other.failed;
    }

    pub fn print_stats(&self, total_time: Duration) {
        log::info!(
            "[Compactor] 编译完成 | 耗时: {:?} | 成功: {} | 失败: {} | 清理过期产物: {}",
            total_time,
            self.compiled,
            self.failed,
            self.stale_removed
        );
    }
}
