//! 外部规则编译器
//!
//! 调用约定：`{program} {subcommand} <domain|ipcidr> text <input> <output>`，
//! 非零退出码只视为该文件失败。
use crate::cancel::CancelSignal;
use crate::config::CompilerConfig;
use crate::error::{FileError, FileResult};
use async_trait::async_trait;
use rsruleset_engine::Bucket;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// 编译行为（规则集类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Domain,
    IpCidr,
}

impl Behavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Behavior::Domain => "domain",
            Behavior::IpCidr => "ipcidr",
        }
    }

    /// 只有域名与 IP 分段有二进制形式
    pub fn for_bucket(bucket: Bucket) -> Option<Behavior> {
        match bucket {
            Bucket::Domain => Some(Behavior::Domain),
            Bucket::Ip => Some(Behavior::IpCidr),
            Bucket::NonIp => None,
        }
    }
}

impl Display for Behavior {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规则编译器接口
#[async_trait]
pub trait RuleCompiler: Send + Sync {
    /// 把文本规则 `input` 编译为二进制 `output`
    async fn convert(&self, behavior: Behavior, input: &Path, output: &Path, cancel: &CancelSignal)
        -> FileResult<()>;
}

/// 以子进程方式调用的外部编译器
#[derive(Debug, Clone)]
pub struct SubprocessCompiler {
    program: PathBuf,
    subcommand: String,
}

impl SubprocessCompiler {
    pub fn new(program: impl Into<PathBuf>, subcommand: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            subcommand: subcommand.into(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(&config.program, &config.subcommand)
    }

    fn command(&self, behavior: Behavior, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        if !self.subcommand.is_empty() {
            command.arg(&self.subcommand);
        }
        command
            .arg(behavior.as_str())
            .arg("text")
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl RuleCompiler for SubprocessCompiler {
    async fn convert(
        &self,
        behavior: Behavior,
        input: &Path,
        output: &Path,
        cancel: &CancelSignal,
    ) -> FileResult<()> {
        let child = self
            .command(behavior, input, output)
            .spawn()
            .map_err(|source| FileError::SpawnFailed {
                program: self.program.display().to_string(),
                source,
            })?;

        // 取消时丢弃 future，kill_on_drop 负责结束子进程
        tokio::select! {
            result = child.wait_with_output() => {
                let result = result.map_err(|source| FileError::SpawnFailed {
                    program: self.program.display().to_string(),
                    source,
                })?;
                if result.status.success() {
                    Ok(())
                } else {
                    Err(FileError::CompileFailed {
                        path: output.to_path_buf(),
                        status: result.status,
                        stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
                    })
                }
            }
            _ = cancel.cancelled() => Err(FileError::Interrupted { path: output.to_path_buf() }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let compiler = SubprocessCompiler::new("/nonexistent/rule-compiler", "convert");
        let err = compiler
            .convert(Behavior::Domain, Path::new("in"), Path::new("out"), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_compile_failure() {
        // `false` 忽略参数并返回 1
        let compiler = SubprocessCompiler::new("false", "");
        let err = compiler
            .convert(Behavior::IpCidr, Path::new("in"), Path::new("out.mrs"), &CancelSignal::never())
            .await
            .unwrap_err();
        match err {
            FileError::CompileFailed { path, status, .. } => {
                assert_eq!(path, PathBuf::from("out.mrs"));
                assert!(!status.success());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_command_line() {
        let compiler = SubprocessCompiler::from_config(&CompilerConfig::default());
        let command = compiler.command(Behavior::Domain, Path::new("in.txt"), Path::new("out.mrs"));
        let cmd = command.as_std();
        assert_eq!(cmd.get_program(), "mihomo");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["convert", "domain", "text", "in.txt", "out.mrs"]);
    }

    #[tokio::test]
    async fn test_argument_order() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fake-compiler.sh");
        let log = tmp.path().join("args.txt");
        std::fs::write(&script, format!("echo \"$@\" > {}\n", log.display())).unwrap();

        // 以脚本路径充当子命令：sh <script> ipcidr text <in> <out>
        let compiler = SubprocessCompiler::new("sh", script.display().to_string());
        compiler
            .convert(Behavior::IpCidr, Path::new("a.txt"), Path::new("a.mrs"), &CancelSignal::never())
            .await
            .unwrap();

        let args = std::fs::read_to_string(&log).unwrap();
        assert_eq!(args.trim(), "ipcidr text a.txt a.mrs");
    }
}
