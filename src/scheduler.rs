//! 定时调度：启动时可选运行一次，之后每隔 N 天运行一次
use crate::cancel::CancelSignal;
use crate::error::{RsResult, RulesetError};
use crate::pipeline::{Pipeline, RunReport};
use log::{debug, info};
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// 规则集生成调度器
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// 立即运行一次；已有运行进行中时等待其结束
    pub async fn trigger(&self, cancel: &CancelSignal) -> RsResult<RunReport> {
        self.pipeline.run(cancel).await
    }

    /// 按配置周期运行，直到收到关闭信号
    ///
    /// 单次运行失败只记录日志，不影响后续调度；关闭信号同时会取消进行中的运行。
    pub async fn run_until_shutdown(&self, shutdown: CancelSignal) {
        let config = self.pipeline.config();
        let period = config.interval();
        let first = if config.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + period
        };

        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "调度器已启动：每 {} 天运行一次，启动时运行：{}",
            config.interval_days, config.run_on_startup
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.trigger(&shutdown).await {
                        Ok(report) => debug!("本次运行完成，耗时 {:?}", report.elapsed),
                        Err(RulesetError::Cancelled) => break,
                        // 失败已在流水线内记录
                        Err(_) => {}
                    }
                }
            }
        }
        info!("调度器已停止");
    }
}
