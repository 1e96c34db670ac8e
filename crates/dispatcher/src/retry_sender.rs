use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, error, warn};

use taskrelay_core::{
    errors::TransportFailure,
    models::{Command, Host, HostAttempt},
    traits::{RetryDelay, TransportSender},
    DispatchConfig,
};

/// 单节点重试策略：固定次数、固定间隔，不做指数退避
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for RetryPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }
}

/// 对单个节点做有限次重试的发送器
///
/// 只负责一个节点，节点间的故障转移由 [`crate::FailoverDispatcher`] 处理。
pub struct BoundedRetrySender {
    transport: Arc<dyn TransportSender>,
    delay: Arc<dyn RetryDelay>,
    policy: RetryPolicy,
}

impl BoundedRetrySender {
    pub fn new(
        transport: Arc<dyn TransportSender>,
        delay: Arc<dyn RetryDelay>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            delay,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 最多尝试 `max_retries + 1` 次，成功时返回该节点的尝试记录
    ///
    /// 每次失败后等待固定间隔再重试，最后一次失败后不再等待。
    pub async fn send(&self, host: &Host, command: &Command) -> Result<HostAttempt, TransportFailure> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            counter!("taskrelay_send_attempts_total").increment(1);

            match self.transport.send(host, command).await {
                Ok(()) => {
                    debug!(
                        host = %host,
                        command_id = %command.id,
                        attempt,
                        "命令 {} 已发送到节点 {}",
                        command.command_type,
                        host
                    );
                    return Ok(HostAttempt::succeeded(host.clone(), attempt));
                }
                Err(e) => {
                    error!(
                        host = %host,
                        command_id = %command.id,
                        attempt,
                        max_attempts,
                        "发送命令 {} 到节点 {} 失败: {}",
                        command.command_type,
                        host,
                        e
                    );

                    if attempt >= max_attempts {
                        warn!(
                            host = %host,
                            command_id = %command.id,
                            "节点 {} 重试次数已耗尽，共尝试 {} 次",
                            host,
                            attempt
                        );
                        return Err(TransportFailure {
                            host: host.clone(),
                            attempts: attempt,
                            last_error: e,
                        });
                    }

                    self.delay.wait(self.policy.retry_delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskrelay_core::errors::TransportError;
    use taskrelay_testing_utils::{RecordingDelay, ScriptedTransport};

    fn sender(
        transport: Arc<ScriptedTransport>,
        delay: Arc<RecordingDelay>,
        max_retries: u32,
    ) -> BoundedRetrySender {
        BoundedRetrySender::new(
            transport,
            delay,
            RetryPolicy::new(max_retries, Duration::from_millis(100)),
        )
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.retry_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_wait() {
        let host = Host::new("10.0.0.1", 1234);
        let transport = Arc::new(ScriptedTransport::new());
        let delay = Arc::new(RecordingDelay::new());

        let attempt = sender(transport.clone(), delay.clone(), 3)
            .send(&host, &Command::task_execute_request(json!({})))
            .await
            .unwrap();

        assert_eq!(attempt, HostAttempt::succeeded(host.clone(), 1));
        assert_eq!(transport.attempts_for(&host), 1);
        assert!(delay.waits().is_empty());
    }

    #[tokio::test]
    async fn test_succeeds_after_k_failures() {
        let host = Host::new("10.0.0.1", 1234);
        for k in 0..=3u32 {
            let transport = Arc::new(ScriptedTransport::new());
            transport.fail_times(&host, k);
            let delay = Arc::new(RecordingDelay::new());

            let attempt = sender(transport.clone(), delay.clone(), 3)
                .send(&host, &Command::task_execute_request(json!({})))
                .await
                .unwrap();

            assert_eq!(attempt.attempts, k + 1);
            assert!(attempt.is_success());
            assert_eq!(transport.attempts_for(&host), (k + 1) as usize);
            assert_eq!(delay.waits().len(), k as usize);
        }
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error_without_trailing_wait() {
        let host = Host::new("10.0.0.1", 1234);
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail_always(&host);
        let delay = Arc::new(RecordingDelay::new());

        let failure = sender(transport.clone(), delay.clone(), 3)
            .send(&host, &Command::task_execute_request(json!({})))
            .await
            .unwrap_err();

        assert_eq!(failure.host, host);
        assert_eq!(failure.attempts, 4);
        assert!(matches!(failure.last_error, TransportError::Connection(_)));
        assert_eq!(transport.attempts_for(&host), 4);
        assert_eq!(delay.waits(), vec![Duration::from_millis(100); 3]);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let host = Host::new("10.0.0.1", 1234);
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail_always(&host);
        let delay = Arc::new(RecordingDelay::new());

        let failure = sender(transport.clone(), delay.clone(), 0)
            .send(&host, &Command::task_execute_request(json!({})))
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 1);
        assert!(delay.waits().is_empty());
    }
}
