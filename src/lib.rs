//! rsruleset - 代理规则集聚合、多方言转换与统一合并工具

// 导出全局错误类型
pub use self::error::{FileError, FileResult, RsResult, RulesetError};

// 导出配置模块
pub use self::config::{CompilerConfig, CustomConfigBuilder, MergeConfig, PipelineConfig, SourceTree};

// 导出取消信号
pub use self::cancel::{CancelHandle, CancelSignal};

// 导出方言与写出模块核心接口
pub use self::dialect::{Dialect, DialectFormat, DialectWriter, HeaderBlock};

// 导出各处理阶段
pub use self::aggregate::DialectPass;
pub use self::merger::{UnifiedMerger, UNIFIED_DIR_NAME};
pub use self::compactor::{Behavior, Compactor, RuleCompiler, SubprocessCompiler};

// 导出流水线与调度器
pub use self::pipeline::{Pipeline, RunReport};
pub use self::scheduler::Scheduler;

// 导出统计信息
pub use self::stats::{BucketCounts, CompactStats, MergeStats, PassStats};

// 导出引擎层核心类型（便于直接使用）
pub use rsruleset_engine::{Bucket, Category, ClassifyMode, LineClassifier, Provenance};

// 声明所有子模块
pub mod aggregate;
pub mod cancel;
pub mod compactor;
pub mod config;
pub mod dialect;
pub mod error;
pub mod fs_util;
pub mod merger;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod stats;
