use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use taskrelay_core::{
    models::{Command, CommandType, Host},
    traits::ResponseProcessor,
};

/// 把Worker回传消息写入日志的处理器
///
/// 派发层不关联这些消息，真正的状态更新由上层注册自己的处理器完成。
pub struct LoggingResponseProcessor {
    command_type: CommandType,
    name: String,
}

impl LoggingResponseProcessor {
    pub fn new(command_type: CommandType) -> Self {
        Self {
            command_type,
            name: format!("logging-{}", command_type.as_str().to_lowercase()),
        }
    }
}

#[async_trait]
impl ResponseProcessor for LoggingResponseProcessor {
    async fn process(&self, host: &Host, command: Command) {
        if command.command_type != self.command_type {
            warn!(
                "处理器 {} 收到类型不匹配的消息 {}，来自 {}",
                self.name, command.command_type, host
            );
            return;
        }

        match command.command_type {
            CommandType::TaskExecuteAck => {
                info!(host = %host, command_id = %command.id, "收到任务执行确认: {}", command.body);
            }
            CommandType::TaskExecuteResponse => {
                info!(host = %host, command_id = %command.id, "收到任务执行结果: {}", command.body);
            }
            CommandType::TaskKillResponse => {
                info!(host = %host, command_id = %command.id, "收到任务终止响应: {}", command.body);
            }
            other => {
                warn!("Worker {} 回传了非响应类型的消息: {}", host, other);
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 三类回传消息各一个日志处理器
pub fn logging_processors() -> Vec<(CommandType, Arc<dyn ResponseProcessor>)> {
    CommandType::inbound_kinds()
        .into_iter()
        .map(|kind| {
            let processor: Arc<dyn ResponseProcessor> =
                Arc::new(LoggingResponseProcessor::new(kind));
            (kind, processor)
        })
        .collect()
}
