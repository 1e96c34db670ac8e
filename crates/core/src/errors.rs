use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Host, HostAttempt};

/// 单次发送尝试的传输层错误
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum TransportError {
    #[error("连接失败: {0}")]
    Connection(String),

    #[error("发送超时: {0}")]
    Timeout(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("IO错误: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

/// 单个节点的重试次数耗尽
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("向节点 {host} 发送命令失败，共尝试 {attempts} 次: {last_error}")]
pub struct TransportFailure {
    pub host: Host,
    pub attempts: u32,
    pub last_error: TransportError,
}

impl From<TransportFailure> for HostAttempt {
    fn from(failure: TransportFailure) -> Self {
        HostAttempt {
            host: failure.host,
            attempts: failure.attempts,
            last_error: Some(failure.last_error),
        }
    }
}

/// 派发错误类型定义
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("所有候选节点派发失败: {}", summarize_attempts(.attempts))]
    DispatchExhausted { attempts: Vec<HostAttempt> },

    #[error("无效的派发目标类型: {0}")]
    InvalidTargetCategory(String),

    #[error("无效的派发请求: {0}")]
    InvalidRequest(String),

    #[error("节点注册中心错误: {0}")]
    Registry(String),

    #[error("配置错误: {0}")]
    Configuration(String),
}

impl DispatchError {
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }
    pub fn registry_error<S: Into<String>>(msg: S) -> Self {
        Self::Registry(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 调用方稍后重新入队可能成功的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::DispatchExhausted { .. } | DispatchError::Registry(_)
        )
    }

    /// 请求本身或配置有误，重试无意义
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DispatchError::InvalidTargetCategory(_)
                | DispatchError::InvalidRequest(_)
                | DispatchError::Configuration(_)
        )
    }

    /// 派发耗尽时的逐节点尝试记录
    pub fn attempts(&self) -> &[HostAttempt] {
        match self {
            DispatchError::DispatchExhausted { attempts } => attempts,
            _ => &[],
        }
    }
}

fn summarize_attempts(attempts: &[HostAttempt]) -> String {
    if attempts.is_empty() {
        return "没有可用的候选节点".to_string();
    }
    let details: Vec<String> = attempts
        .iter()
        .map(|attempt| match &attempt.last_error {
            Some(err) => format!("{} ({}次, {})", attempt.host, attempt.attempts, err),
            None => format!("{} ({}次)", attempt.host, attempt.attempts),
        })
        .collect();
    format!("已尝试 {} 个节点 [{}]", attempts.len(), details.join(", "))
}
