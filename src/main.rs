//! rsruleset 命令行入口
use anyhow::Context;
use clap::{Parser, Subcommand};
use rsruleset::{
    CancelHandle, CancelSignal, ClassifyMode, CustomConfigBuilder, LineClassifier, Pipeline, PipelineConfig,
    Scheduler,
};
use rsruleset_engine::RuleLine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rsruleset", version, about = "代理规则集聚合、多方言转换与统一合并工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON 配置文件
    #[arg(short = 'c', long, global = true, default_value = "rsruleset.json")]
    config: PathBuf,

    /// 覆盖输出目录
    #[arg(short = 'o', long, global = true)]
    output: Option<PathBuf>,

    /// 跳过压缩编译阶段
    #[arg(long, global = true)]
    no_compile: bool,

    /// 覆盖规则编译器路径
    #[arg(long, global = true, value_name = "PATH")]
    compiler: Option<PathBuf>,

    /// 合并阶段保留域名的 `+.` 通配前缀
    #[arg(long, global = true)]
    propagate_wildcard: bool,

    /// 日志详细程度（-v 为 debug，-vv 为 trace）
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 执行一次完整运行
    Run,
    /// 常驻运行，按配置周期调度，Ctrl-C 退出
    Daemon,
    /// 对单个规则文件逐行分类并输出 `分段\t值`
    Classify {
        file: PathBuf,
        /// 使用宽松模式（不报格式错误）
        #[arg(long)]
        lenient: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Run => {
            let pipeline = Pipeline::new(load_config(&cli)?);
            let (handle, signal) = CancelSignal::new();
            shutdown_on_ctrl_c(handle);
            let report = pipeline.run(&signal).await?;
            tracing::info!(elapsed = ?report.elapsed, "运行完成");
        }
        Command::Daemon => {
            let scheduler = Scheduler::new(Arc::new(Pipeline::new(load_config(&cli)?)));
            let (handle, signal) = CancelSignal::new();
            shutdown_on_ctrl_c(handle);
            scheduler.run_until_shutdown(signal).await;
        }
        Command::Classify { file, lenient } => classify(file, *lenient).await?,
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    // 同时安装 log -> tracing 桥接，库内的 log 记录也会输出
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init() {
        eprintln!("日志初始化失败：{e}");
    }
}

/// 读取配置文件并应用命令行覆盖
fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let config = PipelineConfig::from_file(&cli.config)
        .with_context(|| format!("加载配置失败：{}", cli.config.display()))?;

    let mut builder = CustomConfigBuilder::from_config(config);
    if let Some(output) = &cli.output {
        builder = builder.output_root(output);
    }
    if cli.no_compile {
        builder = builder.compiler_enabled(false);
    }
    if let Some(program) = &cli.compiler {
        builder = builder.compiler_program(program);
    }
    if cli.propagate_wildcard {
        builder = builder.propagate_wildcard(true);
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}

fn shutdown_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到退出信号，正在取消当前运行");
            handle.cancel();
        }
    });
}

async fn classify(file: &Path, lenient: bool) -> anyhow::Result<()> {
    let mode = if lenient { ClassifyMode::Lenient } else { ClassifyMode::Strict };
    let classifier = LineClassifier::new(mode);
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("读取规则文件失败：{}", file.display()))?;

    for (idx, text) in content.lines().enumerate() {
        let classified = classifier
            .classify(&RuleLine::new(text, file))
            .with_context(|| format!("{}:{}", file.display(), idx + 1))?;
        if let Some(line) = classified {
            println!("{}\t{}", line.bucket, line.value);
        }
    }
    Ok(())
}
