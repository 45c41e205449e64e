/// 带类型前缀的规则（`TYPE,payload`）中分类器关心的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    IpCidr,
    IpCidr6,
    IpAsn,
    Domain,
    DomainSuffix,
    DomainKeyword,
    DomainWildcard,
    UserAgent,
    UrlRegex,
    ProcessName,
    /// 未识别的类型
    Other,
}

impl RuleType {
    /// 大小写不敏感地解析类型字段
    pub fn parse(raw: &str) -> RuleType {
        match raw.trim().to_ascii_uppercase().as_str() {
            "IP-CIDR" => RuleType::IpCidr,
            "IP-CIDR6" => RuleType::IpCidr6,
            "IP-ASN" => RuleType::IpAsn,
            "DOMAIN" => RuleType::Domain,
            "DOMAIN-SUFFIX" => RuleType::DomainSuffix,
            "DOMAIN-KEYWORD" => RuleType::DomainKeyword,
            "DOMAIN-WILDCARD" => RuleType::DomainWildcard,
            "USER-AGENT" => RuleType::UserAgent,
            "URL-REGEX" => RuleType::UrlRegex,
            "PROCESS-NAME" => RuleType::ProcessName,
            _ => RuleType::Other,
        }
    }

    pub fn is_cidr(&self) -> bool {
        matches!(self, RuleType::IpCidr | RuleType::IpCidr6)
    }

    /// 无需 DNS 解析即可匹配的关键字类型
    pub fn is_non_resolving_keyword(&self) -> bool {
        matches!(
            self,
            RuleType::Domain
                | RuleType::DomainSuffix
                | RuleType::DomainKeyword
                | RuleType::DomainWildcard
                | RuleType::UserAgent
                | RuleType::UrlRegex
                | RuleType::ProcessName
        )
    }
}
