//! rsruleset-engine 内核错误定义
//! 封装内核层所有错误，与应用层 I/O 错误解耦，基于thiserror实现类型安全处理
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// 规则行格式错误的具体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// IP-CIDR / IP-CIDR6 的载荷不是合法的 IP 或 CIDR
    InvalidCidr,
    /// IP-ASN 的载荷不是（可带 AS 前缀的）整数
    InvalidAsn,
    /// 归一化后的域名为空
    EmptyDomain,
}

impl Display for MalformedKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedKind::InvalidCidr => write!(f, "invalid IP/CIDR payload"),
            MalformedKind::InvalidAsn => write!(f, "invalid ASN payload"),
            MalformedKind::EmptyDomain => write!(f, "empty domain after normalization"),
        }
    }
}

/// 内核核心错误枚举
#[derive(Error, Debug)]
pub enum EngineError {
    /// 规则行格式错误（严格模式下由分类器抛出）
    #[error("Malformed rule ({kind}) in {origin}: {line}")]
    MalformedRule {
        kind: MalformedKind,
        origin: String,
        line: String,
    },

    /// 无效输入参数
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// 仅格式错误返回其类别
    pub fn malformed_kind(&self) -> Option<MalformedKind> {
        match self {
            EngineError::MalformedRule { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// 内核层全局Result类型别名
pub type EngineResult<T> = Result<T, EngineError>;
