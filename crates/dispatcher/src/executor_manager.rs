use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use taskrelay_core::{
    errors::TransportFailure,
    models::{Command, CommandType, DispatchOutcome, DispatchRequest, Host, HostAttempt},
    traits::{NodeCandidateResolver, ResponseProcessor, RetryDelay, TokioRetryDelay, TransportSender},
    DispatchConfig, DispatchError, DispatchResult,
};

use crate::direct::DirectDispatcher;
use crate::failover::FailoverDispatcher;
use crate::retry_sender::{BoundedRetrySender, RetryPolicy};
use crate::strategies::{HostOrderingStrategy, PreferredFirstStrategy};

/// 派发层的组装入口
///
/// 两个派发器共用同一个传输层和重试发送器。`init` 负责在传输通道上
/// 注册Worker回传消息的处理器，派发调用本身从不等待这些回传消息。
pub struct ExecutorManager {
    transport: Arc<dyn TransportSender>,
    failover: FailoverDispatcher,
    direct: DirectDispatcher,
}

impl ExecutorManager {
    pub fn new(
        config: &DispatchConfig,
        resolver: Arc<dyn NodeCandidateResolver>,
        transport: Arc<dyn TransportSender>,
    ) -> Self {
        ExecutorManagerBuilder::new(resolver, transport)
            .with_policy(RetryPolicy::from(config))
            .build()
    }

    pub fn builder(
        resolver: Arc<dyn NodeCandidateResolver>,
        transport: Arc<dyn TransportSender>,
    ) -> ExecutorManagerBuilder {
        ExecutorManagerBuilder::new(resolver, transport)
    }

    /// 注册回传消息处理器，确认、执行结果、终止响应三类必须齐全
    pub fn init(
        &self,
        processors: Vec<(CommandType, Arc<dyn ResponseProcessor>)>,
    ) -> DispatchResult<()> {
        let mut registered = HashSet::new();
        for (command_type, _) in &processors {
            if !command_type.is_response() {
                return Err(DispatchError::config_error(format!(
                    "{command_type} 不是Worker回传消息类型，不能注册处理器"
                )));
            }
            registered.insert(*command_type);
        }

        let missing: Vec<String> = CommandType::inbound_kinds()
            .into_iter()
            .filter(|kind| !registered.contains(kind))
            .map(|kind| kind.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DispatchError::config_error(format!(
                "缺少回传消息处理器: {}",
                missing.join(", ")
            )));
        }

        for (command_type, processor) in processors {
            info!("注册 {} 处理器: {}", command_type, processor.name());
            self.transport.register_processor(command_type, processor);
        }

        Ok(())
    }

    /// 在候选节点间故障转移派发
    pub async fn execute(&self, request: &DispatchRequest) -> DispatchResult<DispatchOutcome> {
        self.failover.dispatch(request).await
    }

    /// 只发往 `host`，不做故障转移
    pub async fn execute_directly(
        &self,
        host: &Host,
        command: &Command,
    ) -> Result<HostAttempt, TransportFailure> {
        self.direct.dispatch_direct(host, command).await
    }
}

pub struct ExecutorManagerBuilder {
    resolver: Arc<dyn NodeCandidateResolver>,
    transport: Arc<dyn TransportSender>,
    strategy: Arc<dyn HostOrderingStrategy>,
    delay: Arc<dyn RetryDelay>,
    policy: RetryPolicy,
}

impl ExecutorManagerBuilder {
    pub fn new(
        resolver: Arc<dyn NodeCandidateResolver>,
        transport: Arc<dyn TransportSender>,
    ) -> Self {
        Self {
            resolver,
            transport,
            strategy: Arc::new(PreferredFirstStrategy::new()),
            delay: Arc::new(TokioRetryDelay),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn HostOrderingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_retry_delay(mut self, delay: Arc<dyn RetryDelay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> ExecutorManager {
        let sender = Arc::new(BoundedRetrySender::new(
            self.transport.clone(),
            self.delay,
            self.policy,
        ));

        ExecutorManager {
            failover: FailoverDispatcher::new(self.resolver, self.strategy, sender.clone()),
            direct: DirectDispatcher::new(sender),
            transport: self.transport,
        }
    }
}
