//! 分类解析：把 (来源, 规则组目录, 文件名) 映射为规范的分类名
use super::{Bucket, Provenance};
use std::fmt::{Display, Formatter};
use std::path::Path;

/// 文档/配置类文件扩展名，不含规则内容
pub const SKIPPED_EXTENSIONS: [&str; 4] = ["md", "yaml", "yml", "sgmodule"];

/// 路径中出现该标记的文件是 DNS 解析辅助规则，不参与处理
pub const RESOLVE_MARKER: &str = "resolve";

/// 规则分类
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub provenance: Provenance,
    /// `{prefix}_{base}`，全小写
    pub name: String,
}

impl Category {
    pub fn new(provenance: Provenance, base: &str) -> Self {
        let name = format!("{}_{}", provenance.prefix(), base).to_lowercase();
        Self { provenance, name }
    }

    /// 解析单个规则文件所属分类
    ///
    /// 规则组目录名与保留分段名（`ip` / `non_ip` / `domainset`）冲突时，
    /// 改用文件名（去扩展名）作为基础名。
    /// 需要跳过的文件返回 None。
    pub fn resolve(provenance: Provenance, group: &str, file_name: &str) -> Option<Category> {
        if Self::is_skipped(group, file_name) {
            return None;
        }

        let base = if Bucket::is_reserved_name(group) {
            Path::new(file_name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(file_name)
        } else {
            group
        };

        if base.is_empty() {
            return None;
        }

        Some(Category::new(provenance, base))
    }

    /// 判断文件是否应被跳过（文档/配置文件、解析辅助规则）
    pub fn is_skipped(group: &str, file_name: &str) -> bool {
        let extension_skipped = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SKIPPED_EXTENSIONS
                    .iter()
                    .any(|skipped| skipped.eq_ignore_ascii_case(ext))
            });

        let relative = format!("{}/{}", group, file_name).to_ascii_lowercase();
        extension_skipped || relative.contains(RESOLVE_MARKER)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
