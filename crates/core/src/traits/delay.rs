use std::time::Duration;

use async_trait::async_trait;

/// 重试间隔的等待原语，测试中可替换为不真正休眠的实现
#[async_trait]
pub trait RetryDelay: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// 基于 `tokio::time::sleep` 的默认实现
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRetryDelay;

#[async_trait]
impl RetryDelay for TokioRetryDelay {
    async fn wait(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::time::sleep(delay).await;
    }
}
