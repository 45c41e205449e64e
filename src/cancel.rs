//! 运行取消信号
//!
//! 唯一的取消来源是外部关闭。运行在每个文件/行检查点以及子进程调用处响应取消，
//! 已写出的文件不回滚。
use crate::error::{RsResult, RulesetError};
use tokio::sync::watch;

/// 取消信号的发送端
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal { rx: self.tx.subscribe() }
    }
}

/// 取消信号的接收端，可廉价克隆
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// 永不取消的信号（单次运行/测试）
    pub fn never() -> CancelSignal {
        let (tx, rx) = watch::channel(false);
        // 发送端丢弃后值保持 false
        drop(tx);
        CancelSignal { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 检查点：已取消则返回错误
    pub fn checkpoint(&self) -> RsResult<()> {
        if self.is_cancelled() {
            Err(RulesetError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 等待取消；发送端已丢弃且未取消时永远挂起
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
