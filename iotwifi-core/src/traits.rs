use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::structs::{Connection, Credentials, Network, StatusResult};

/// 网卡管理器接口：网关唯一依赖的外部协作者。
///
/// `Send + Sync` 约束是必须的，因为它将被用于 Axum 的共享状态 (State) 中，
/// 并被多个并发请求同时调用。实现者自己负责并发调用的安全性。
#[async_trait]
pub trait AdapterManager: Send + Sync {
    /// 当前 supplicant 状态
    async fn status(&self) -> crate::Result<StatusResult>;

    /// 断开所有网络。失败只记录日志，不向调用者暴露。
    async fn disconnect(&self);

    /// 尝试连接到指定网络
    async fn connect_network(&self, credentials: &Credentials) -> crate::Result<Connection>;

    /// 执行一次 Wi-Fi 扫描
    async fn scan_networks(&self) -> crate::Result<Vec<Network>>;

    /// Background event loop, driven by the worker for the life of the process.
    ///
    /// Must return once `shutdown` is cancelled. The default does nothing but wait.
    async fn run(&self, shutdown: CancellationToken) -> crate::Result<()> {
        shutdown.cancelled().await;
        Ok(())
    }
}
