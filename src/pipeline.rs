//! 流水线：一次完整运行 = 各方言聚合写出 + 统一合并 + 压缩编译
//!
//! 运行之间由进程级锁串行化（先到先得、阻塞等待、从不跳过）；
//! 运行内部严格顺序执行，聚合状态只存在于单次运行内。
use crate::aggregate::DialectPass;
use crate::cancel::CancelSignal;
use crate::compactor::{Compactor, RuleCompiler, SubprocessCompiler};
use crate::config::PipelineConfig;
use crate::dialect::{Dialect, DialectWriter, HeaderBlock};
use crate::error::{RsResult, RulesetError};
use crate::fs_util::recreate_dir;
use crate::merger::UnifiedMerger;
use crate::stats::{CompactStats, MergeStats, PassStats};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 进程级运行锁
static RUN_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// 作为统一合并输入的方言（域名优先格式）
const MERGE_SOURCE_DIALECT: Dialect = Dialect::SURGE;

/// 单次运行的统计汇总
#[derive(Debug, Clone)]
pub struct RunReport {
    pub passes: Vec<PassStats>,
    pub merge: MergeStats,
    /// 未启用编译器时为 None
    pub compact: Option<CompactStats>,
    pub elapsed: Duration,
}

/// 规则集生成流水线
pub struct Pipeline {
    config: PipelineConfig,
    compiler: Arc<dyn RuleCompiler>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let compiler = Arc::new(SubprocessCompiler::from_config(&config.compiler));
        Self { config, compiler }
    }

    /// 使用自定义编译器实现
    pub fn with_compiler(config: PipelineConfig, compiler: Arc<dyn RuleCompiler>) -> Self {
        Self { config, compiler }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 执行一次完整运行；另一运行进行中时阻塞等待
    pub async fn run(&self, cancel: &CancelSignal) -> RsResult<RunReport> {
        let _guard = RUN_LOCK.lock().await;
        let result = self.run_locked(cancel).await;
        if let Err(e) = &result {
            self.handle_failure(e).await;
        }
        result
    }

    async fn run_locked(&self, cancel: &CancelSignal) -> RsResult<RunReport> {
        let start = Instant::now();

        // 配置错误必须在改动输出目录之前暴露
        self.config.validate()?;
        self.config.validate_sources()?;
        cancel.checkpoint()?;

        let output_root = self.config.output_root.as_path();
        info!("开始生成规则集：{}", output_root.display());
        recreate_dir(output_root).await?;

        let header = HeaderBlock::now();
        let mut passes = Vec::with_capacity(Dialect::ALL.len());
        for dialect in Dialect::ALL {
            let writer = DialectWriter::new(output_root, dialect, header);
            let pass = DialectPass::new(&self.config, dialect);
            passes.push(pass.run(&writer, cancel).await?);
        }

        let merger = UnifiedMerger::new(
            &output_root.join(MERGE_SOURCE_DIALECT.name),
            output_root,
            self.config.merge_options(),
            header,
        );
        let merge = merger.run(cancel).await?;

        let compact = if self.config.compiler.enabled {
            let compactor = Compactor::new(self.compiler.clone(), &self.config.compiler.compiled_extension);
            Some(compactor.compact(merger.target_root(), cancel).await?)
        } else {
            info!("规则编译器未启用，跳过压缩编译");
            None
        };

        let elapsed = start.elapsed();
        info!("规则集生成完成，总耗时：{:?}", elapsed);
        Ok(RunReport {
            passes,
            merge,
            compact,
            elapsed,
        })
    }

    /// 失败处理：严格模式下的格式错误可按配置重置对应规则源
    async fn handle_failure(&self, err: &RulesetError) {
        error!("本次运行失败：{}", err);

        let RulesetError::MalformedRule { path, .. } = err else {
            return;
        };
        let Some(tree) = self
            .config
            .sources
            .iter()
            .find(|tree| path.starts_with(&tree.root))
        else {
            return;
        };
        if !tree.reset_on_failure {
            return;
        }

        warn!("规则源存在格式错误，重置该目录以便重新拉取：{}", tree.root.display());
        if let Err(e) = remove_source_tree(&tree.root).await {
            warn!("重置规则源失败：{} - {}", tree.root.display(), e);
        }
    }
}

async fn remove_source_tree(root: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(root).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compactor::Behavior;
    use crate::config::{CustomConfigBuilder, SourceTree};
    use crate::error::FileResult;
    use crate::merger::UNIFIED_DIR_NAME;
    use async_trait::async_trait;
    use rsruleset_engine::Provenance;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use walkdir::WalkDir;

    /// 把临时文件内容原样写入产物，可选地在调用中途让出执行权
    #[derive(Default)]
    struct RecordingCompiler {
        outputs: std::sync::Mutex<Vec<PathBuf>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl RuleCompiler for RecordingCompiler {
        async fn convert(
            &self,
            behavior: Behavior,
            input: &Path,
            output: &Path,
            _cancel: &CancelSignal,
        ) -> FileResult<()> {
            self.outputs.lock().unwrap().push(output.to_path_buf());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let scratch = fs::read_to_string(input).unwrap();
            fs::write(output, format!("{}\n{}", behavior, scratch)).unwrap();
            Ok(())
        }
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn body(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    /// 输出目录快照（去掉时间戳行）
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
        WalkDir::new(root)
            .into_iter()
            .map(Result::unwrap)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let content = fs::read_to_string(e.path())
                    .unwrap()
                    .lines()
                    .filter(|l| !l.starts_with("# Updated:"))
                    .collect::<Vec<_>>()
                    .join("\n");
                (e.path().strip_prefix(root).unwrap().to_path_buf(), content)
            })
            .collect()
    }

    fn fixture(tmp: &Path, output: &str) -> CustomConfigBuilder {
        let bm7 = tmp.join("bm7");
        write(
            &bm7,
            "Google/Google.list",
            "# NAME: Google\nDOMAIN-SUFFIX,Example.COM\n.YouTube.com\n8.8.8.8\nIP-CIDR,8.8.4.0/24,no-resolve\n",
        );
        write(&bm7, "ip/Google.list", "2001:db8::1\n");
        write(&bm7, "Google/README.md", "not a rule file\n");

        let sukka = tmp.join("sukka");
        write(
            &sukka,
            "ip/cdn.conf",
            "DOMAIN,this_ruleset_is_made_by_sukkaw.ruleset.skk.moe\nIP-CIDR,1.0.0.0/24\nIP-ASN,AS13335\n",
        );

        CustomConfigBuilder::new()
            .source(SourceTree::new(&bm7, Provenance::SourceB))
            .source(SourceTree::new(&sukka, Provenance::SourceA))
            .output_root(tmp.join(output))
    }

    #[tokio::test]
    async fn test_full_run_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path(), "dist").build();
        let compiler = Arc::new(RecordingCompiler::default());
        let pipeline = Pipeline::with_compiler(config, compiler.clone());

        let report = pipeline.run(&CancelSignal::never()).await.unwrap();
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.compact.as_ref().unwrap().failed, 0);

        let dist = tmp.path().join("dist");
        assert_eq!(body(&dist.join("Surge/domainset/bm7_google.list")), vec!["youtube.com"]);
        assert_eq!(body(&dist.join("Surge/ip/bm7_google.list")), vec!["8.8.8.8", "2001:db8::1"]);
        let clash = fs::read_to_string(dist.join("Clash/non_ip/bm7_google.yaml")).unwrap();
        assert!(clash.contains("- DOMAIN-SUFFIX,Example.COM"));
        assert!(clash.contains("- IP-CIDR,8.8.4.0/24,no-resolve"));

        let unified = dist.join(UNIFIED_DIR_NAME);
        assert_eq!(
            body(&unified.join("domainset/bm7_google.list")),
            vec!["youtube.com", "+.example.com"]
        );
        assert_eq!(
            fs::read_to_string(unified.join("ip/bm7_google.mrs")).unwrap(),
            "ipcidr\n8.8.4.0/24\n8.8.8.8/32\n2001:db8::1/128\n"
        );
        assert!(unified.join("domainset/bm7_google.mrs").is_file());
        assert!(!unified.join("non_ip/bm7_google.mrs").exists());

        // 签名行被丢弃，来源头部包含许可声明
        let cdn = fs::read_to_string(dist.join("Surge/ip/sukka_cdn.list")).unwrap();
        assert!(!cdn.contains("this_ruleset_is_made_by_sukkaw"));
        assert!(cdn.contains("# License: AGPL-3.0"));
    }

    #[tokio::test]
    async fn test_rerun_is_identical_except_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path(), "dist").build();
        let pipeline = Pipeline::with_compiler(config, Arc::new(RecordingCompiler::default()));
        let dist = tmp.path().join("dist");

        pipeline.run(&CancelSignal::never()).await.unwrap();
        let first = snapshot(&dist);
        pipeline.run(&CancelSignal::never()).await.unwrap();
        let second = snapshot(&dist);

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_interleave() {
        let tmp = tempfile::tempdir().unwrap();
        let compiler = Arc::new(RecordingCompiler {
            delay: Some(Duration::from_millis(5)),
            ..Default::default()
        });
        let first = Pipeline::with_compiler(fixture(tmp.path(), "a").build(), compiler.clone());
        let second = Pipeline::with_compiler(fixture(tmp.path(), "b").build(), compiler.clone());

        let cancel = CancelSignal::never();
        let (a, b) = tokio::join!(first.run(&cancel), second.run(&cancel));
        a.unwrap();
        b.unwrap();

        let runs: Vec<bool> = compiler
            .outputs
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.starts_with(tmp.path().join("a")))
            .collect();
        assert!(runs.len() >= 4);
        let switches = runs.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(switches, 1, "runs interleaved: {:?}", runs);
    }

    #[tokio::test]
    async fn test_config_error_leaves_output_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let dist = tmp.path().join("dist");
        write(&dist, "Surge/ip/keep.list", "1.1.1.1\n");

        let config = CustomConfigBuilder::new()
            .source(SourceTree::new(tmp.path().join("missing"), Provenance::SourceB))
            .output_root(&dist)
            .build();
        let err = Pipeline::with_compiler(config, Arc::new(RecordingCompiler::default()))
            .run(&CancelSignal::never())
            .await
            .unwrap_err();

        assert!(err.is_config_error());
        assert!(dist.join("Surge/ip/keep.list").is_file());
    }

    #[tokio::test]
    async fn test_malformed_rule_resets_flagged_source() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = fixture(tmp.path(), "dist").build();
        for source in &mut config.sources {
            source.reset_on_failure = source.provenance == Provenance::SourceA;
        }
        write(&tmp.path().join("sukka"), "ip/cdn.conf", "IP-ASN,notanumber\n");

        let err = Pipeline::with_compiler(config, Arc::new(RecordingCompiler::default()))
            .run(&CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, RulesetError::MalformedRule { line_no: 1, .. }));
        assert!(!tmp.path().join("sukka").exists());
        assert!(tmp.path().join("bm7").is_dir());
    }

    #[tokio::test]
    async fn test_cancelled_run_does_not_touch_output() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path(), "dist").build();
        write(&tmp.path().join("dist"), "keep.txt", "x");

        let (handle, signal) = CancelSignal::new();
        handle.cancel();
        let err = Pipeline::with_compiler(config, Arc::new(RecordingCompiler::default()))
            .run(&signal)
            .await
            .unwrap_err();

        assert!(matches!(err, RulesetError::Cancelled));
        assert!(tmp.path().join("dist/keep.txt").is_file());
    }

    #[tokio::test]
    async fn test_compiler_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let config = fixture(tmp.path(), "dist").compiler_enabled(false).build();
        let compiler = Arc::new(RecordingCompiler::default());
        let report = Pipeline::with_compiler(config, compiler.clone())
            .run(&CancelSignal::never())
            .await
            .unwrap();

        assert!(report.compact.is_none());
        assert!(compiler.outputs.lock().unwrap().is_empty());
    }
}
