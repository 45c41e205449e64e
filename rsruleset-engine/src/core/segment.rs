//! 分段集合与按分类的聚合器
use super::{Bucket, Category};
use rustc_hash::FxHashMap as HashMap;

/// 单个分类的三段规则（域名 / 非 IP / IP），只追加不去重
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentSet {
    pub domain: Vec<String>,
    pub non_ip: Vec<String>,
    pub ip: Vec<String>,
}

impl SegmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bucket: Bucket, value: String) {
        self.get_mut(bucket).push(value);
    }

    pub fn get(&self, bucket: Bucket) -> &[String] {
        match bucket {
            Bucket::Domain => &self.domain,
            Bucket::NonIp => &self.non_ip,
            Bucket::Ip => &self.ip,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Domain => &mut self.domain,
            Bucket::NonIp => &mut self.non_ip,
            Bucket::Ip => &mut self.ip,
        }
    }

    /// 按分段顺序追加另一组规则
    pub fn extend(&mut self, other: SegmentSet) {
        self.domain.extend(other.domain);
        self.non_ip.extend(other.non_ip);
        self.ip.extend(other.ip);
    }

    pub fn len(&self) -> usize {
        self.domain.len() + self.non_ip.len() + self.ip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 非空分段（按输出顺序）
    pub fn non_empty_buckets(&self) -> impl Iterator<Item = (Bucket, &[String])> + '_ {
        Bucket::ALL
            .into_iter()
            .map(move |bucket| (bucket, self.get(bucket)))
            .filter(|(_, lines)| !lines.is_empty())
    }
}

/// 单次聚合过程的运行期状态：分类名 → 分段集合
///
/// 每次运行新建、用完即丢，不跨运行共享。
#[derive(Debug, Default)]
pub struct SegmentAggregator {
    entries: HashMap<String, (Category, SegmentSet)>,
}

impl SegmentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一组分段到该分类的累计结果，保持文件遍历顺序
    pub fn append(&mut self, category: &Category, segments: SegmentSet) {
        let entry = self
            .entries
            .entry(category.name.clone())
            .or_insert_with(|| (category.clone(), SegmentSet::new()));
        entry.1.extend(segments);
    }

    pub fn get(&self, name: &str) -> Option<&SegmentSet> {
        self.entries.get(&name.to_lowercase()).map(|(_, set)| set)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按分类名排序输出，保证写盘与日志顺序稳定
    pub fn into_sorted(self) -> Vec<(Category, SegmentSet)> {
        let mut entries: Vec<_> = self.entries.into_values().collect();
        entries.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        entries
    }
}
