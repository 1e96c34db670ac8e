use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, error, info, instrument, warn};

use taskrelay_core::{
    models::{DispatchOutcome, DispatchRequest, Host, HostAttempt, TargetCategory},
    traits::NodeCandidateResolver,
    DispatchError, DispatchResult,
};

use crate::retry_sender::BoundedRetrySender;
use crate::strategies::HostOrderingStrategy;

/// 带故障转移的派发器
///
/// 按排序策略给出的顺序逐个尝试节点，每个节点交由 [`BoundedRetrySender`] 重试，
/// 第一个成功的节点即为结果。节点之间严格串行，不做并发扇出。
pub struct FailoverDispatcher {
    resolver: Arc<dyn NodeCandidateResolver>,
    strategy: Arc<dyn HostOrderingStrategy>,
    sender: Arc<BoundedRetrySender>,
}

impl FailoverDispatcher {
    pub fn new(
        resolver: Arc<dyn NodeCandidateResolver>,
        strategy: Arc<dyn HostOrderingStrategy>,
        sender: Arc<BoundedRetrySender>,
    ) -> Self {
        Self {
            resolver,
            strategy,
            sender,
        }
    }

    #[instrument(skip(self, request), fields(
        command_id = %request.command().id,
        command_type = %request.command().command_type,
        category = %request.target_category(),
    ))]
    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult<DispatchOutcome> {
        let started = Instant::now();

        let candidates = self.resolve_candidates(request).await?;
        let hosts = self.strategy.order(candidates, request.preferred_host());

        if hosts.is_empty() {
            warn!("没有可用的候选节点，分组: {}", request.effective_group());
        }

        let command = request.command();
        let mut attempts: Vec<HostAttempt> = Vec::with_capacity(hosts.len());

        for host in &hosts {
            match self.sender.send(host, command).await {
                Ok(attempt) => {
                    attempts.push(attempt);
                    histogram!("taskrelay_dispatch_duration_ms")
                        .record(started.elapsed().as_millis() as f64);

                    info!(
                        "命令 {} 派发到节点 {} 成功，已尝试 {} 个节点",
                        command.id,
                        host,
                        attempts.len()
                    );
                    return Ok(DispatchOutcome {
                        succeeded_host: host.clone(),
                        attempts,
                    });
                }
                Err(failure) => {
                    counter!("taskrelay_host_failovers_total").increment(1);
                    error!(
                        "命令 {} 在节点 {} 上失败，尝试下一个节点: {}",
                        command.id, host, failure
                    );
                    attempts.push(failure.into());
                }
            }
        }

        counter!("taskrelay_dispatch_exhausted_total").increment(1);
        histogram!("taskrelay_dispatch_duration_ms").record(started.elapsed().as_millis() as f64);

        let err = DispatchError::DispatchExhausted { attempts };
        error!("命令 {} 派发失败: {}", command.id, err);
        Err(err)
    }

    async fn resolve_candidates(&self, request: &DispatchRequest) -> DispatchResult<HashSet<Host>> {
        match request.target_category() {
            TargetCategory::NodePool => {
                let group = request.effective_group();
                let candidates = self.resolver.resolve(group).await?;
                debug!("分组 {} 解析到 {} 个候选节点", group, candidates.len());
                Ok(candidates)
            }
            TargetCategory::PinnedHost => Ok(HashSet::new()),
        }
    }
}
