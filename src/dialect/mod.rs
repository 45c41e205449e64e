//! 客户端方言：同一份规则内容的不同输出语法
pub mod header;
pub mod writer;

pub use header::HeaderBlock;
pub use writer::DialectWriter;

use crate::error::RsResult;
use rsruleset_engine::ClassifyMode;
use serde::Serialize;

/// 输出文件的语法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectFormat {
    /// 每行一条规则
    PlainList,
    /// 内联键值：`payload:` 列表
    YamlPayload,
}

#[derive(Serialize)]
struct Payload<'a> {
    payload: &'a [String],
}

impl DialectFormat {
    /// 渲染规则正文（不含头部）
    pub fn render_body(&self, lines: &[String]) -> RsResult<String> {
        match self {
            DialectFormat::PlainList => {
                let mut body = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
                for line in lines {
                    body.push_str(line);
                    body.push('\n');
                }
                Ok(body)
            }
            DialectFormat::YamlPayload => Ok(serde_yaml::to_string(&Payload { payload: lines })?),
        }
    }
}

/// 客户端方言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// 输出目录名
    pub name: &'static str,
    pub extension: &'static str,
    pub format: DialectFormat,
    /// 该方言聚合时使用的分类模式
    pub mode: ClassifyMode,
}

impl Dialect {
    /// 域名优先的纯列表方言，统一规则集以它为输入
    pub const SURGE: Dialect = Dialect {
        name: "Surge",
        extension: "list",
        format: DialectFormat::PlainList,
        mode: ClassifyMode::Strict,
    };

    /// 后加入的内联键值方言
    pub const CLASH: Dialect = Dialect {
        name: "Clash",
        extension: "yaml",
        format: DialectFormat::YamlPayload,
        mode: ClassifyMode::Lenient,
    };

    /// 按处理顺序排列的全部方言
    pub const ALL: [Dialect; 2] = [Dialect::SURGE, Dialect::CLASH];

    /// 分类对应的输出文件名
    pub fn file_name(&self, category: &str) -> String {
        format!("{}.{}", category, self.extension)
    }
}
