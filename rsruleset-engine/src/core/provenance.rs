use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 规则来源标记
///
/// 在分类创建时确定并随分类一路携带；
/// 名称前缀只是序列化形式，合并阶段才需要从文件名反推。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// 自维护的内置规则
    BuiltIn,
    /// 第三方来源 A（SukkaW/Surge）
    SourceA,
    /// 第三方来源 B（blackmatrix7/ios_rule_script）
    SourceB,
}

impl Provenance {
    pub const ALL: [Provenance; 3] = [Provenance::BuiltIn, Provenance::SourceA, Provenance::SourceB];

    /// 分类名前缀
    pub fn prefix(&self) -> &'static str {
        match self {
            Provenance::BuiltIn => "custom",
            Provenance::SourceA => "sukka",
            Provenance::SourceB => "bm7",
        }
    }

    /// 从分类名（或输出文件名）反推来源，无匹配前缀时返回 None
    pub fn from_category_name(name: &str) -> Option<Provenance> {
        let lower = name.to_ascii_lowercase();
        Provenance::ALL.into_iter().find(|provenance| {
            lower
                .strip_prefix(provenance.prefix())
                .is_some_and(|rest| rest.starts_with('_'))
        })
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_category_name() {
        assert_eq!(Provenance::from_category_name("sukka_cdn.list"), Some(Provenance::SourceA));
        assert_eq!(Provenance::from_category_name("BM7_Google"), Some(Provenance::SourceB));
        assert_eq!(Provenance::from_category_name("custom_direct"), Some(Provenance::BuiltIn));
        // 仅前缀相同但缺少分隔符
        assert_eq!(Provenance::from_category_name("customer.list"), None);
        assert_eq!(Provenance::from_category_name("google.list"), None);
    }
}
