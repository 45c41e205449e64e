//! 统一规则集合并
//!
//! 重新读取域名优先方言已写出的目录，这次按输出文件名（而非分类）分组，
//! 跨三个分段子目录重新归类，得到跨分类的统一规则集，作为压缩编译的输入。
use crate::cancel::CancelSignal;
use crate::dialect::writer::write_bucket_file;
use crate::dialect::{DialectFormat, HeaderBlock};
use crate::error::RsResult;
use crate::fs_util::sorted_files;
use crate::stats::MergeStats;
use log::debug;
use rsruleset_engine::{Bucket, DefaultBucketPolicy, MergeOptions, Provenance, SegmentSet, UnifiedNormalizer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// 统一规则集输出目录名
pub const UNIFIED_DIR_NAME: &str = "UnifiedRuleSet";

/// 统一规则集合并器
pub struct UnifiedMerger {
    source_root: PathBuf,
    target_root: PathBuf,
    normalizer: UnifiedNormalizer,
    header: HeaderBlock,
}

impl UnifiedMerger {
    /// `source_root` 为域名优先方言的输出目录，`output_root` 为总输出目录
    pub fn new(source_root: &Path, output_root: &Path, options: MergeOptions, header: HeaderBlock) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            target_root: output_root.join(UNIFIED_DIR_NAME),
            normalizer: UnifiedNormalizer::new(options),
            header,
        }
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// 读取 + 合并 + 写出
    pub async fn run(&self, cancel: &CancelSignal) -> RsResult<MergeStats> {
        let start = Instant::now();
        let mut stats = MergeStats::default();
        let merged = self.collect(cancel, &mut stats).await?;

        stats.file_keys = merged.len();
        for (file_name, segments) in &merged {
            cancel.checkpoint()?;
            stats.buckets.add_segments(segments);
            // 文件名以分类名开头，仅用于挑选头部模板
            let provenance = Provenance::from_category_name(file_name);
            for (bucket, lines) in segments.non_empty_buckets() {
                let path = self.target_root.join(bucket.dir_name()).join(file_name);
                write_bucket_file(&path, DialectFormat::PlainList, &self.header, provenance, lines).await?;
                stats.files_written += 1;
            }
        }

        stats.print_stats(start.elapsed());
        Ok(stats)
    }

    /// 按输出文件名分组重新归类（运行期局部状态）
    pub async fn collect(
        &self,
        cancel: &CancelSignal,
        stats: &mut MergeStats,
    ) -> RsResult<BTreeMap<String, SegmentSet>> {
        let mut merged: BTreeMap<String, SegmentSet> = BTreeMap::new();

        for source_bucket in Bucket::ALL {
            let dir = self.source_root.join(source_bucket.dir_name());
            let policy = DefaultBucketPolicy::for_source_bucket(source_bucket);

            for path in sorted_files(&dir)? {
                cancel.checkpoint()?;
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };

                let content = tokio::fs::read_to_string(&path).await?;
                let segments = merged.entry(file_name.to_string()).or_default();
                let mut count = 0;
                for line in content.lines() {
                    if let Some(classified) = self.normalizer.normalize(line, policy) {
                        segments.push(classified.bucket, classified.value);
                        count += 1;
                    }
                }
                stats.files_read += 1;
                debug!("合并 {}/{}：{} 行", source_bucket, file_name, count);
            }
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_merge_groups_by_file_name_across_buckets() {
        let tmp = tempfile::tempdir().unwrap();
        let surge = tmp.path().join("Surge");
        write(&surge, "domainset/bm7_google.list", "# Count: 2\nyoutube.com\nGoogleapis.com\n");
        write(
            &surge,
            "non_ip/bm7_google.list",
            "DOMAIN-SUFFIX,Google.COM\nDOMAIN-KEYWORD,google\nIP-CIDR,8.8.4.0/24,no-resolve\n",
        );
        write(&surge, "ip/bm7_google.list", "8.8.8.8\nIP-ASN,AS15169\n");
        write(&surge, "ip/sukka_cdn.list", "IP-CIDR6,2001:db8::/32\n");

        let merger = UnifiedMerger::new(&surge, tmp.path(), MergeOptions::default(), HeaderBlock::now());
        let stats = merger.run(&CancelSignal::never()).await.unwrap();
        assert_eq!(stats.files_read, 4);
        assert_eq!(stats.file_keys, 2);

        let unified = tmp.path().join(UNIFIED_DIR_NAME);
        assert_eq!(
            read_lines(&unified.join("domainset/bm7_google.list")),
            vec!["youtube.com", "googleapis.com", "+.google.com"]
        );
        assert_eq!(read_lines(&unified.join("non_ip/bm7_google.list")), vec!["DOMAIN-KEYWORD,google", "IP-ASN,AS15169"]);
        assert_eq!(read_lines(&unified.join("ip/bm7_google.list")), vec!["8.8.4.0/24", "8.8.8.8"]);
        assert_eq!(read_lines(&unified.join("ip/sukka_cdn.list")), vec!["2001:db8::/32"]);
        assert!(!unified.join("domainset/sukka_cdn.list").exists());
    }

    #[tokio::test]
    async fn test_union_of_disjoint_sources_without_loss_or_duplication() {
        let tmp = tempfile::tempdir().unwrap();
        let surge = tmp.path().join("Surge");
        write(&surge, "domainset/custom_ads.list", "a.com\nb.com\n");
        write(&surge, "non_ip/custom_ads.list", "DOMAIN,c.com\nDOMAIN-SUFFIX,d.com\n");

        let merger = UnifiedMerger::new(&surge, tmp.path(), MergeOptions::default(), HeaderBlock::now());
        let merged = merger
            .collect(&CancelSignal::never(), &mut MergeStats::default())
            .await
            .unwrap();

        let ads = merged.get("custom_ads.list").unwrap();
        assert_eq!(ads.domain, vec!["a.com", "b.com", "c.com", "+.d.com"]);
        assert!(ads.non_ip.is_empty());
        assert!(ads.ip.is_empty());
    }

    #[tokio::test]
    async fn test_header_follows_recovered_provenance() {
        let tmp = tempfile::tempdir().unwrap();
        let surge = tmp.path().join("Surge");
        write(&surge, "domainset/sukka_cdn.list", "cdn.example.com\n");
        write(&surge, "domainset/orphan.list", "x.example.com\n");

        let merger = UnifiedMerger::new(&surge, tmp.path(), MergeOptions::default(), HeaderBlock::now());
        merger.run(&CancelSignal::never()).await.unwrap();

        let unified = tmp.path().join(UNIFIED_DIR_NAME);
        let sukka = fs::read_to_string(unified.join("domainset/sukka_cdn.list")).unwrap();
        assert!(sukka.contains("# Count: 1"));
        assert!(sukka.contains("SukkaW/Surge"));
        let orphan = fs::read_to_string(unified.join("domainset/orphan.list")).unwrap();
        assert_eq!(orphan, "x.example.com\n");
    }
}
