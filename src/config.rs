//! 全局配置管理,存储所有可配置项
//!
//! 配置来自 JSON 文件，可再由命令行或构建器覆盖。

use crate::dialect::Dialect;
use crate::error::{RsResult, RulesetError};
use rsruleset_engine::classifier::DEFAULT_SIGNATURE_MARKERS;
use rsruleset_engine::{MergeOptions, Provenance};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 统一规则集文本文件的扩展名（合并输入来自该方言）
const MERGE_TEXT_EXTENSION: &str = Dialect::SURGE.extension;

/// 运行间隔允许的天数范围
pub const INTERVAL_DAYS_RANGE: RangeInclusive<u32> = 1..=365;

/// 单个规则源目录
#[derive(Debug, Clone, Deserialize)]
pub struct SourceTree {
    /// 规则源根目录（`<root>/<group>/<file>`）
    pub root: PathBuf,
    pub provenance: Provenance,
    /// 严格模式下该源出现格式错误时删除整个目录，交由拉取步骤重新克隆
    #[serde(default)]
    pub reset_on_failure: bool,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>, provenance: Provenance) -> Self {
        Self {
            root: root.into(),
            provenance,
            reset_on_failure: false,
        }
    }
}

/// 合并阶段选项
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub propagate_wildcard: bool,
}

impl From<&MergeConfig> for MergeOptions {
    fn from(config: &MergeConfig) -> Self {
        MergeOptions {
            propagate_wildcard: config.propagate_wildcard,
        }
    }
}

/// 外部规则编译器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub enabled: bool,
    /// 编译器可执行文件
    pub program: PathBuf,
    /// 转换子命令
    pub subcommand: String,
    /// 编译产物扩展名
    pub compiled_extension: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: PathBuf::from("mihomo"),
            subcommand: "convert".to_string(),
            compiled_extension: "mrs".to_string(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("dist")
}

fn default_interval_days() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_signature_markers() -> Vec<String> {
    DEFAULT_SIGNATURE_MARKERS.iter().map(|m| m.to_string()).collect()
}

/// 流水线完整配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sources: Vec<SourceTree>,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
    #[serde(default = "default_signature_markers")]
    pub signature_markers: Vec<String>,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output_root: default_output_root(),
            run_on_startup: true,
            interval_days: default_interval_days(),
            signature_markers: default_signature_markers(),
            merge: MergeConfig::default(),
            compiler: CompilerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// 从 JSON 配置文件加载
    pub fn from_file(path: impl AsRef<Path>) -> RsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RulesetError::ConfigError(format!("读取配置文件失败: {} - {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> RsResult<Self> {
        let config: PipelineConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// 校验与文件系统无关的配置项
    pub fn validate(&self) -> RsResult<()> {
        if self.sources.is_empty() {
            return Err(RulesetError::ConfigError("至少需要配置一个规则源目录".into()));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(RulesetError::ConfigError("输出目录不能为空".into()));
        }
        if !INTERVAL_DAYS_RANGE.contains(&self.interval_days) {
            return Err(RulesetError::ConfigError(format!(
                "运行间隔必须在 {}~{} 天之间，当前为 {}",
                INTERVAL_DAYS_RANGE.start(),
                INTERVAL_DAYS_RANGE.end(),
                self.interval_days
            )));
        }
        if self.compiler.enabled {
            self.validate_compiled_extension()?;
        }
        Ok(())
    }

    /// 编译产物扩展名不能与统一规则集的文本扩展名相同，否则清理旧产物时会删掉编译输入
    fn validate_compiled_extension(&self) -> RsResult<()> {
        let extension = self.compiler.compiled_extension.trim();
        if extension.is_empty() {
            return Err(RulesetError::ConfigError("编译产物扩展名不能为空".into()));
        }
        if extension.contains('.') {
            return Err(RulesetError::ConfigError(format!(
                "编译产物扩展名不能包含 '.'：{}",
                extension
            )));
        }
        if extension.eq_ignore_ascii_case(MERGE_TEXT_EXTENSION) {
            return Err(RulesetError::ConfigError(format!(
                "编译产物扩展名不能与规则文本扩展名相同：{}",
                extension
            )));
        }
        Ok(())
    }

    /// 规则源目录必须存在，缺失属于致命配置错误
    pub fn validate_sources(&self) -> RsResult<()> {
        for source in &self.sources {
            if !source.root.is_dir() {
                return Err(RulesetError::SourceRootMissing(source.root.clone()));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_days) * 24 * 60 * 60)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions::from(&self.merge)
    }
}

/// 配置构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: PipelineConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有配置为基础继续覆盖
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn source(mut self, source: SourceTree) -> Self {
        self.config.sources.push(source);
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn run_on_startup(mut self, run: bool) -> Self {
        self.config.run_on_startup = run;
        self
    }

    pub fn interval_days(mut self, days: u32) -> Self {
        self.config.interval_days = days;
        self
    }

    pub fn signature_markers(mut self, markers: Vec<String>) -> Self {
        self.config.signature_markers = markers;
        self
    }

    pub fn propagate_wildcard(mut self, propagate: bool) -> Self {
        self.config.merge.propagate_wildcard = propagate;
        self
    }

    pub fn compiler_enabled(mut self, enabled: bool) -> Self {
        self.config.compiler.enabled = enabled;
        self
    }

    pub fn compiler_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.compiler.program = program.into();
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
