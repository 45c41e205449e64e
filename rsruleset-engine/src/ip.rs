//! IP 字面量 / CIDR 工具函数
use ipnet::IpNet;
use std::net::IpAddr;

/// 解析 CIDR；裸 IP 字面量视为单地址网段
pub fn parse_ip_or_cidr(value: &str) -> Option<IpNet> {
    let value = value.trim();
    value
        .parse::<IpNet>()
        .ok()
        .or_else(|| value.parse::<IpAddr>().ok().map(IpNet::from))
}

#[inline]
pub fn is_ip_or_cidr(value: &str) -> bool {
    parse_ip_or_cidr(value).is_some()
}

/// 裸 IP 字面量补全为单地址 CIDR（/32 或 /128），其余原样返回
///
/// 外部规则编译器只接受 CIDR 写法。
pub fn to_cidr(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(addr) => IpNet::from(addr).to_string(),
        Err(_) => trimmed.to_string(),
    }
}
