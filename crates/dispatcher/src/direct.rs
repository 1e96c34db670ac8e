use std::sync::Arc;

use tracing::{info, instrument};

use taskrelay_core::{
    errors::TransportFailure,
    models::{Command, Host, HostAttempt},
};

use crate::retry_sender::BoundedRetrySender;

/// 直接派发到已确定的节点，不查询注册中心，也不做故障转移
///
/// 用于调用方已经锁定节点的场景，例如让正在执行任务的Worker终止该任务。
pub struct DirectDispatcher {
    sender: Arc<BoundedRetrySender>,
}

impl DirectDispatcher {
    pub fn new(sender: Arc<BoundedRetrySender>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self, command), fields(
        host = %host,
        command_id = %command.id,
        command_type = %command.command_type,
    ))]
    pub async fn dispatch_direct(
        &self,
        host: &Host,
        command: &Command,
    ) -> Result<HostAttempt, TransportFailure> {
        let attempt = self.sender.send(host, command).await?;
        info!("命令 {} 已直接发送到节点 {}", command.id, host);
        Ok(attempt)
    }
}
