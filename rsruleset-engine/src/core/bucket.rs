use std::fmt::{Display, Formatter};

/// 输出分段枚举，每条规则行最终只属于其中一个
///
/// 顺序即下游的匹配顺序：域名（字符串匹配，开销低）优先，
/// 其次是不需要解析的非 IP 规则，最后才是需要解析的 IP 规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Domain,
    NonIp,
    Ip,
}

impl Bucket {
    /// 按输出顺序排列的全部分段
    pub const ALL: [Bucket; 3] = [Bucket::Domain, Bucket::NonIp, Bucket::Ip];

    /// 分段对应的输出子目录名
    pub fn dir_name(&self) -> &'static str {
        match self {
            Bucket::Domain => "domainset",
            Bucket::NonIp => "non_ip",
            Bucket::Ip => "ip",
        }
    }

    /// 由子目录名反查分段（大小写不敏感）
    pub fn from_dir_name(name: &str) -> Option<Bucket> {
        Bucket::ALL
            .into_iter()
            .find(|bucket| bucket.dir_name().eq_ignore_ascii_case(name))
    }

    /// 目录名是否与保留的分段名冲突
    pub fn is_reserved_name(name: &str) -> bool {
        Bucket::from_dir_name(name).is_some()
    }
}

impl Display for Bucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}
