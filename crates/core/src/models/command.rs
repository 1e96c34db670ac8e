use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DispatchError;

/// 命令类型，接收端按此选择处理器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    TaskExecuteRequest,
    TaskExecuteAck,
    TaskExecuteResponse,
    TaskKillRequest,
    TaskKillResponse,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::TaskExecuteRequest => "TASK_EXECUTE_REQUEST",
            CommandType::TaskExecuteAck => "TASK_EXECUTE_ACK",
            CommandType::TaskExecuteResponse => "TASK_EXECUTE_RESPONSE",
            CommandType::TaskKillRequest => "TASK_KILL_REQUEST",
            CommandType::TaskKillResponse => "TASK_KILL_RESPONSE",
        }
    }

    /// Worker回传给派发端的消息类型
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            CommandType::TaskExecuteAck
                | CommandType::TaskExecuteResponse
                | CommandType::TaskKillResponse
        )
    }

    /// 派发端启动时必须注册处理器的入站类型
    pub fn inbound_kinds() -> [CommandType; 3] {
        [
            CommandType::TaskExecuteAck,
            CommandType::TaskExecuteResponse,
            CommandType::TaskKillResponse,
        ]
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TASK_EXECUTE_REQUEST" => Ok(CommandType::TaskExecuteRequest),
            "TASK_EXECUTE_ACK" => Ok(CommandType::TaskExecuteAck),
            "TASK_EXECUTE_RESPONSE" => Ok(CommandType::TaskExecuteResponse),
            "TASK_KILL_REQUEST" => Ok(CommandType::TaskKillRequest),
            "TASK_KILL_RESPONSE" => Ok(CommandType::TaskKillResponse),
            _ => Err(DispatchError::invalid_request(format!("未知的命令类型: {s}"))),
        }
    }
}

/// 发往Worker的命令，派发层只转发不解析 `body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub command_type: CommandType,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Command {
    pub fn new(command_type: CommandType, body: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            command_type,
            body,
            created_at: Utc::now(),
        }
    }
    pub fn task_execute_request(body: serde_json::Value) -> Self {
        Self::new(CommandType::TaskExecuteRequest, body)
    }
    pub fn task_kill_request(body: serde_json::Value) -> Self {
        Self::new(CommandType::TaskKillRequest, body)
    }
}
