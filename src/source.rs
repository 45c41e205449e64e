//! 规则源目录遍历：`<root>/<group>/<file>` → (分类, 文件路径)
use crate::config::SourceTree;
use crate::error::{RsResult, RulesetError};
use crate::fs_util::{sorted_dirs, sorted_files};
use log::trace;
use rsruleset_engine::Category;
use std::path::PathBuf;

/// 待处理的规则文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFile {
    pub category: Category,
    pub path: PathBuf,
}

/// 规则源目录遍历器
pub struct SourceTreeWalker<'a> {
    tree: &'a SourceTree,
}

impl<'a> SourceTreeWalker<'a> {
    pub fn new(tree: &'a SourceTree) -> Self {
        Self { tree }
    }

    /// 枚举所有规则文件（规则组、文件均按名称排序）
    ///
    /// 只看根目录下一层的规则组目录及其中直接包含的文件。
    pub fn rule_files(&self) -> RsResult<Vec<RuleFile>> {
        let root = &self.tree.root;
        if !root.is_dir() {
            return Err(RulesetError::SourceRootMissing(root.clone()));
        }

        let mut files = Vec::new();
        for group_dir in sorted_dirs(root)? {
            let Some(group) = group_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            for path in sorted_files(&group_dir)? {
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                match Category::resolve(self.tree.provenance, group, file_name) {
                    Some(category) => files.push(RuleFile { category, path }),
                    None => trace!("跳过非规则文件：{}", path.display()),
                }
            }
        }
        Ok(files)
    }
}
