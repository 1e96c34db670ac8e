use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    errors::TransportError,
    models::{Command, CommandType, Host},
};

/// 网络传输层
///
/// 每次 `send` 是对目标节点的一次投递尝试，任何错误在派发层都被视为可重试。
/// 实现必须支持多个派发调用并发使用。
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// 向 `host` 投递一次 `command`
    async fn send(&self, host: &Host, command: &Command) -> Result<(), TransportError>;

    /// 在发送所用的同一通道上注册入站消息处理器
    fn register_processor(&self, command_type: CommandType, processor: Arc<dyn ResponseProcessor>);
}

/// Worker回传消息（确认、执行结果、终止响应）的处理器
#[async_trait]
pub trait ResponseProcessor: Send + Sync {
    async fn process(&self, host: &Host, command: Command);

    fn name(&self) -> &str;
}
