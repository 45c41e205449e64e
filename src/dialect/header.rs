//! 输出文件头部：生成器标识、UTC 时间戳、行数与来源许可声明
use chrono::{DateTime, SecondsFormat, Utc};
use rsruleset_engine::Provenance;

const BANNER: &str = "Generated by rsruleset";
const RULE: &str = "# ----------------------------------------------------------------";

/// 来源许可声明模板
fn attribution(provenance: Provenance) -> &'static [&'static str] {
    match provenance {
        Provenance::BuiltIn => &[
            "Source: built-in rules",
            "License: MIT",
        ],
        Provenance::SourceA => &[
            "Source: https://github.com/SukkaW/Surge",
            "License: AGPL-3.0",
            "Rules are redistributed with the upstream signature lines removed.",
        ],
        Provenance::SourceB => &[
            "Source: https://github.com/blackmatrix7/ios_rule_script",
            "License: GPL-2.0",
        ],
    }
}

/// 单次运行共用的头部生成器（时间戳在运行开始时确定）
#[derive(Debug, Clone, Copy)]
pub struct HeaderBlock {
    generated_at: DateTime<Utc>,
}

impl HeaderBlock {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// 秒级精度的 UTC 时间戳
    pub fn timestamp(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// 渲染头部；来源未知时不生成头部
    pub fn render(&self, provenance: Option<Provenance>, count: usize) -> String {
        let Some(provenance) = provenance else {
            return String::new();
        };

        let mut header = String::new();
        header.push_str(RULE);
        header.push('\n');
        header.push_str(&format!("# {}\n", BANNER));
        header.push_str(&format!("# Updated: {}\n", self.timestamp()));
        header.push_str(&format!("# Count: {}\n", count));
        header.push_str(RULE);
        header.push('\n');
        for line in attribution(provenance) {
            header.push_str(&format!("# {}\n", line));
        }
        header.push_str(RULE);
        header.push('\n');
        header
    }
}
