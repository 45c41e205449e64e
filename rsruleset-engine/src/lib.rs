// 核心公共结构体+枚举（分段/来源/分类）
pub mod core;
// 单行规则分类器（严格/宽松两种模式）
pub mod classifier;
// 统一规则集的二次归一化
pub mod unified;
// IP 字面量 / CIDR 解析
pub mod ip;
// 内核错误定义
pub mod error;

// 顶层导出常用类型
pub use classifier::{ClassifiedLine, ClassifyMode, LineClassifier, RuleLine, RuleType};
pub use core::{Bucket, Category, Provenance, SegmentAggregator, SegmentSet};
pub use error::{EngineError, EngineResult, MalformedKind};
pub use unified::{DefaultBucketPolicy, MergeOptions, UnifiedNormalizer};
