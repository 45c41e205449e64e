//! 统一规则集的二次归一化
//!
//! 合并阶段按输出文件名重新读取已生成的方言文件，逐行重新归类。
//! 与首轮分类器不同，这里每个分支都有兜底分段，永不报错。
use crate::classifier::{is_comment_or_blank, leading_token, ClassifiedLine, RuleType};
use crate::core::Bucket;
use crate::ip::is_ip_or_cidr;

/// 通配前缀（后缀匹配）
pub const WILDCARD_PREFIX: &str = "+.";

/// 合并阶段的归一化选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// 已带 `+.` 的域名在归一化后是否保留通配前缀
    ///
    /// DOMAIN-SUFFIX 总会得到通配前缀，不受此开关影响。
    pub propagate_wildcard: bool,
}

/// 未识别行的兜底分段策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultBucketPolicy {
    /// 纯域名目录：一律视为域名
    Domain,
    /// 混合目录：先尝试 IP/CIDR，否则归入非 IP
    IpThenNonIp,
}

impl DefaultBucketPolicy {
    /// 按来源分段目录选择策略
    pub fn for_source_bucket(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Domain => DefaultBucketPolicy::Domain,
            Bucket::NonIp | Bucket::Ip => DefaultBucketPolicy::IpThenNonIp,
        }
    }
}

/// 合并阶段的行归一化器
#[derive(Debug, Clone, Copy, Default)]
pub struct UnifiedNormalizer {
    options: MergeOptions,
}

impl UnifiedNormalizer {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// 归一化单行；空行、注释与载荷为空的规则返回 None
    pub fn normalize(&self, line: &str, policy: DefaultBucketPolicy) -> Option<ClassifiedLine> {
        let text = line.trim();
        if is_comment_or_blank(text) {
            return None;
        }

        let classified = text
            .split_once(',')
            .and_then(|(raw_type, payload)| self.normalize_typed(RuleType::parse(raw_type), payload.trim()))
            .unwrap_or_else(|| match policy {
                DefaultBucketPolicy::Domain => ClassifiedLine::new(Bucket::Domain, self.normalize_domain(text)),
                DefaultBucketPolicy::IpThenNonIp if is_ip_or_cidr(text) => ClassifiedLine::new(Bucket::Ip, text),
                DefaultBucketPolicy::IpThenNonIp => ClassifiedLine::new(Bucket::NonIp, text),
            });

        // `DOMAIN,` / `DOMAIN-SUFFIX,` 之类的空载荷不能进入编译输入
        let value = classified.value.strip_prefix(WILDCARD_PREFIX).unwrap_or(&classified.value);
        if value.is_empty() {
            log::trace!("Dropping empty {} entry: {}", classified.bucket, text);
            return None;
        }
        Some(classified)
    }

    /// 带类型前缀的规则；未识别的类型交给兜底策略
    fn normalize_typed(&self, rule_type: RuleType, payload: &str) -> Option<ClassifiedLine> {
        match rule_type {
            RuleType::Domain => Some(ClassifiedLine::new(Bucket::Domain, self.normalize_domain(payload))),
            RuleType::DomainSuffix => Some(ClassifiedLine::new(
                Bucket::Domain,
                format!("{}{}", WILDCARD_PREFIX, bare_domain(leading_token(payload))),
            )),
            RuleType::IpCidr | RuleType::IpCidr6 => Some(ClassifiedLine::new(Bucket::Ip, leading_token(payload))),
            _ => None,
        }
    }

    /// 去掉已有的 `+.`，转小写并去掉一个前导 `.`；
    /// 仅当原值带通配前缀且开启了传播开关时重新加回。
    pub fn normalize_domain(&self, value: &str) -> String {
        let value = leading_token(value);
        let had_wildcard = value.starts_with(WILDCARD_PREFIX);
        let domain = bare_domain(value);
        if had_wildcard && self.options.propagate_wildcard {
            format!("{}{}", WILDCARD_PREFIX, domain)
        } else {
            domain
        }
    }
}

fn bare_domain(value: &str) -> String {
    let value = value.strip_prefix(WILDCARD_PREFIX).unwrap_or(value).to_lowercase();
    match value.strip_prefix('.') {
        Some(rest) => rest.to_string(),
        None => value,
    }
}
