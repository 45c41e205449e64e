//! 单行规则分类器
//! 把原始规则文本归入 域名 / 非 IP / IP 三个分段，并给出归一化后的行内容
mod rule_type;

pub use rule_type::RuleType;

use crate::core::Bucket;
use crate::error::{EngineError, EngineResult, MalformedKind};
use crate::ip::is_ip_or_cidr;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// 上游签名标记（来源 A 在规则中夹带的署名行）
pub const DEFAULT_SIGNATURE_MARKERS: [&str; 1] = ["this_ruleset_is_made_by_sukkaw"];

/// IP-ASN 载荷：整数，可带大小写不敏感的 AS 前缀
static ASN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:AS)?\d+$").expect("valid ASN regex"));

const NO_RESOLVE_MARKER: &str = "no-resolve";

/// 待分类的原始规则行
#[derive(Debug, Clone, Copy)]
pub struct RuleLine<'a> {
    pub text: &'a str,
    pub origin: &'a Path,
}

impl<'a> RuleLine<'a> {
    pub fn new(text: &'a str, origin: &'a Path) -> Self {
        Self { text, origin }
    }
}

/// 分类结果：所属分段 + 归一化后的行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub bucket: Bucket,
    pub value: String,
}

impl ClassifiedLine {
    pub fn new(bucket: Bucket, value: impl Into<String>) -> Self {
        Self {
            bucket,
            value: value.into(),
        }
    }
}

/// 分类模式
///
/// 两种模式刻意保持不一致：首个方言使用严格模式，格式错误直接上抛；
/// 后加入的方言使用宽松模式，每个分支都有兜底分段，永不报错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifyMode {
    #[default]
    Strict,
    Lenient,
}

/// 单行规则分类器
#[derive(Debug, Clone)]
pub struct LineClassifier {
    mode: ClassifyMode,
    signature_markers: Vec<String>,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(ClassifyMode::Strict)
    }
}

impl LineClassifier {
    pub fn new(mode: ClassifyMode) -> Self {
        Self {
            mode,
            signature_markers: DEFAULT_SIGNATURE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// 替换上游签名标记列表
    pub fn with_signature_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signature_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn mode(&self) -> ClassifyMode {
        self.mode
    }

    /// 分类单行规则
    ///
    /// 返回 `Ok(None)` 表示该行被丢弃（空行、注释、上游签名）。
    pub fn classify(&self, line: &RuleLine<'_>) -> EngineResult<Option<ClassifiedLine>> {
        let text = line.text.trim();
        if is_comment_or_blank(text) {
            return Ok(None);
        }
        if self.signature_markers.iter().any(|marker| text.contains(marker.as_str())) {
            return Ok(None);
        }

        match text.split_once(',') {
            None => self.classify_bare(line, text).map(Some),
            Some((raw_type, payload)) => self
                .classify_typed(line, text, RuleType::parse(raw_type), payload.trim())
                .map(Some),
        }
    }

    /// 无逗号的裸值：IP/CIDR 或域名
    fn classify_bare(&self, line: &RuleLine<'_>, value: &str) -> EngineResult<ClassifiedLine> {
        if is_ip_or_cidr(value) {
            return Ok(ClassifiedLine::new(Bucket::Ip, value));
        }
        self.domain_line(line, value)
    }

    /// `TYPE,payload` 形式
    fn classify_typed(
        &self,
        line: &RuleLine<'_>,
        text: &str,
        rule_type: RuleType,
        payload: &str,
    ) -> EngineResult<ClassifiedLine> {
        if rule_type.is_cidr() {
            // 显式禁用解析的 IP 规则不能当作纯 IP 匹配
            if payload.to_ascii_lowercase().contains(NO_RESOLVE_MARKER) {
                return Ok(ClassifiedLine::new(Bucket::NonIp, text));
            }
            if is_ip_or_cidr(leading_token(payload)) {
                return Ok(ClassifiedLine::new(Bucket::Ip, text));
            }
            return self.malformed_or_fallback(line, MalformedKind::InvalidCidr, text);
        }

        if rule_type == RuleType::IpAsn {
            if ASN_RE.is_match(leading_token(payload)) {
                return Ok(ClassifiedLine::new(Bucket::Ip, text));
            }
            return self.malformed_or_fallback(line, MalformedKind::InvalidAsn, text);
        }

        if rule_type.is_non_resolving_keyword() {
            return Ok(ClassifiedLine::new(Bucket::NonIp, text));
        }

        if is_ip_or_cidr(text) {
            return Ok(ClassifiedLine::new(Bucket::Ip, text));
        }
        self.domain_line(line, payload)
    }

    /// 域名归一化：去掉一个前导 `.` 并转小写
    fn domain_line(&self, line: &RuleLine<'_>, value: &str) -> EngineResult<ClassifiedLine> {
        let domain = strip_leading_dot(value).to_lowercase();
        if domain.is_empty() && self.mode == ClassifyMode::Strict {
            return Err(malformed(line, MalformedKind::EmptyDomain));
        }
        Ok(ClassifiedLine::new(Bucket::Domain, domain))
    }

    /// 严格模式上抛格式错误，宽松模式兜底归入非 IP 分段
    fn malformed_or_fallback(
        &self,
        line: &RuleLine<'_>,
        kind: MalformedKind,
        text: &str,
    ) -> EngineResult<ClassifiedLine> {
        match self.mode {
            ClassifyMode::Strict => Err(malformed(line, kind)),
            ClassifyMode::Lenient => {
                log::trace!("Lenient fallback to non_ip ({}): {}", kind, text);
                Ok(ClassifiedLine::new(Bucket::NonIp, text))
            }
        }
    }
}

fn malformed(line: &RuleLine<'_>, kind: MalformedKind) -> EngineError {
    EngineError::MalformedRule {
        kind,
        origin: line.origin.display().to_string(),
        line: line.text.trim().to_string(),
    }
}

/// 空行、`#` 或 `//` 开头的注释
#[inline]
pub fn is_comment_or_blank(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//")
}

/// 载荷中第一个逗号前的字段
#[inline]
pub fn leading_token(payload: &str) -> &str {
    payload.split(',').next().unwrap_or_default().trim()
}

#[inline]
fn strip_leading_dot(value: &str) -> &str {
    value.strip_prefix('.').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_with(mode: ClassifyMode, text: &str) -> EngineResult<Option<ClassifiedLine>> {
        let origin = Path::new("test/rules.list");
        LineClassifier::new(mode).classify(&RuleLine::new(text, origin))
    }

    fn strict(text: &str) -> Option<ClassifiedLine> {
        classify_with(ClassifyMode::Strict, text).unwrap()
    }

    fn bucket_of(text: &str) -> Bucket {
        strict(text).unwrap().bucket
    }

    #[test]
    fn test_drops_blank_comments_and_signatures() {
        assert_eq!(strict(""), None);
        assert_eq!(strict("   "), None);
        assert_eq!(strict("# comment"), None);
        assert_eq!(strict("// comment"), None);
        assert_eq!(strict("DOMAIN,this_ruleset_is_made_by_sukkaw.ruleset.skk.moe"), None);
    }

    #[test]
    fn test_custom_signature_markers() {
        let classifier = LineClassifier::new(ClassifyMode::Strict).with_signature_markers(["generated-by-foo"]);
        let origin = Path::new("x");
        assert_eq!(classifier.classify(&RuleLine::new("generated-by-foo.example", origin)).unwrap(), None);
        assert!(classifier
            .classify(&RuleLine::new("this_ruleset_is_made_by_sukkaw.example", origin))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_bare_ip_and_cidr() {
        for value in ["1.2.3.4", "10.0.0.0/8", "2001:db8::1", "2001:db8::/32", " 192.168.0.0/16 "] {
            let classified = strict(value).unwrap();
            assert_eq!(classified.bucket, Bucket::Ip, "{}", value);
            assert_eq!(classified.value, value.trim());
        }
    }

    #[test]
    fn test_bare_domain_is_normalized() {
        assert_eq!(strict(".Example.COM"), Some(ClassifiedLine::new(Bucket::Domain, "example.com")));
        assert_eq!(strict("sub.example.org"), Some(ClassifiedLine::new(Bucket::Domain, "sub.example.org")));
        // 只去掉一个前导点
        assert_eq!(strict("..a.com"), Some(ClassifiedLine::new(Bucket::Domain, ".a.com")));
        // 前缀长度越界不是 CIDR，按域名处理
        assert_eq!(strict("1.2.3.4/33").unwrap().bucket, Bucket::Domain);
    }

    #[test]
    fn test_bare_empty_domain_is_malformed_in_strict_mode() {
        let err = classify_with(ClassifyMode::Strict, ".").unwrap_err();
        assert_eq!(err.malformed_kind(), Some(MalformedKind::EmptyDomain));
    }

    #[test]
    fn test_ip_cidr_rules() {
        assert_eq!(bucket_of("IP-CIDR,10.0.0.0/8"), Bucket::Ip);
        assert_eq!(bucket_of("ip-cidr6,2001:db8::/32"), Bucket::Ip);
        assert_eq!(bucket_of("IP-CIDR,1.1.1.1/32,extra"), Bucket::Ip);
        assert_eq!(
            strict("IP-CIDR, 10.0.0.0/8 ").unwrap().value,
            "IP-CIDR, 10.0.0.0/8",
            "typed IP rules keep the whole trimmed line"
        );
    }

    #[test]
    fn test_no_resolve_is_never_ip() {
        assert_eq!(bucket_of("IP-CIDR,10.0.0.0/8,no-resolve"), Bucket::NonIp);
        assert_eq!(bucket_of("IP-CIDR6,2001:db8::/32,NO-RESOLVE"), Bucket::NonIp);
        // 即使载荷不合法，no-resolve 也优先
        assert_eq!(bucket_of("IP-CIDR,garbage,no-resolve"), Bucket::NonIp);
    }

    #[test]
    fn test_invalid_cidr_payload() {
        let err = classify_with(ClassifyMode::Strict, "IP-CIDR,not-an-ip").unwrap_err();
        assert_eq!(err.malformed_kind(), Some(MalformedKind::InvalidCidr));

        let lenient = classify_with(ClassifyMode::Lenient, "IP-CIDR,not-an-ip").unwrap().unwrap();
        assert_eq!(lenient, ClassifiedLine::new(Bucket::NonIp, "IP-CIDR,not-an-ip"));
    }

    #[test]
    fn test_ip_asn() {
        assert_eq!(bucket_of("IP-ASN,AS12345"), Bucket::Ip);
        assert_eq!(bucket_of("IP-ASN,as12345"), Bucket::Ip);
        assert_eq!(bucket_of("IP-ASN,12345,no-resolve"), Bucket::Ip);

        let err = classify_with(ClassifyMode::Strict, "IP-ASN,notanumber").unwrap_err();
        assert_eq!(err.malformed_kind(), Some(MalformedKind::InvalidAsn));

        let lenient = classify_with(ClassifyMode::Lenient, "IP-ASN,notanumber").unwrap().unwrap();
        assert_eq!(lenient.bucket, Bucket::NonIp);
    }

    #[test]
    fn test_keyword_types_are_non_ip() {
        for line in [
            "DOMAIN,example.com",
            "DOMAIN-SUFFIX,Example.COM",
            "DOMAIN-KEYWORD,google",
            "DOMAIN-WILDCARD,*.example.com",
            "USER-AGENT,Instagram*",
            "URL-REGEX,^https?://ads\\.",
            "PROCESS-NAME,curl",
        ] {
            let classified = strict(line).unwrap();
            assert_eq!(classified.bucket, Bucket::NonIp, "{}", line);
            assert_eq!(classified.value, line);
        }
    }

    #[test]
    fn test_unknown_type_uses_payload_as_domain() {
        assert_eq!(strict("HOST,.Example.com"), Some(ClassifiedLine::new(Bucket::Domain, "example.com")));

        let err = classify_with(ClassifyMode::Strict, "HOST,").unwrap_err();
        assert_eq!(err.malformed_kind(), Some(MalformedKind::EmptyDomain));
    }

    #[test]
    fn test_lenient_mode_never_errors_on_empty_domain() {
        for text in [".", "HOST,", "HOST, . "] {
            let classified = classify_with(ClassifyMode::Lenient, text).unwrap().unwrap();
            assert_eq!(classified.bucket, Bucket::Domain);
            assert_eq!(classified.value, "");
        }
    }

    #[test]
    fn test_error_carries_origin() {
        let err = classify_with(ClassifyMode::Strict, "IP-ASN,x").unwrap_err();
        assert!(err.to_string().contains("test/rules.list"));
    }
}
