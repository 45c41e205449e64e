//! 全局错误类型定义
//!
//! 两类错误刻意分开：
//! - `RulesetError`：终止本次运行（向上传播并触发失败处理）
//! - `FileError`：只放弃当前文件（记录日志后跳过）
use rsruleset_engine::EngineError;
use std::io::Error as IoError;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// 运行级错误
#[derive(Error, Debug)]
pub enum RulesetError {
    // 配置相关错误
    #[error("配置无效：{0}")]
    ConfigError(String),
    #[error("规则源目录不存在：{}", .0.display())]
    SourceRootMissing(PathBuf),

    // 规则相关错误
    #[error("规则格式错误：{path}:{line_no}：{source}")]
    MalformedRule {
        path: PathBuf,
        line_no: usize,
        #[source]
        source: EngineError,
    },
    #[error("规则处理失败：{0}")]
    EngineError(#[from] EngineError),

    // 文件系统错误
    #[error("目录被占用，重试后仍无法删除：{}：{source}", .path.display())]
    FsContention {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML序列化失败：{0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("运行已取消")]
    Cancelled,
}

impl RulesetError {
    /// 是否为配置错误（此时输出目录尚未被改动）
    pub fn is_config_error(&self) -> bool {
        matches!(self, RulesetError::ConfigError(_) | RulesetError::SourceRootMissing(_))
    }
}

/// 文件级错误：仅影响单个文件的压缩编译
#[derive(Error, Debug)]
pub enum FileError {
    #[error("规则编译器退出异常（{status}）：{}：{stderr}", .path.display())]
    CompileFailed {
        path: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    #[error("无法启动规则编译器 {program}：{source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: IoError,
    },
    #[error("编译被取消：{}", .path.display())]
    Interrupted { path: PathBuf },
    #[error("临时文件读写失败：{}：{source}", .path.display())]
    ScratchIo {
        path: PathBuf,
        #[source]
        source: IoError,
    },
}

// 全局Result类型
pub type RsResult<T> = Result<T, RulesetError>;
pub type FileResult<T> = Result<T, FileError>;
