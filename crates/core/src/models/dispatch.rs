use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Command, Host};
use crate::errors::{DispatchError, TransportError};
use crate::DispatchResult;

/// 未指定分组时使用的Worker分组
pub const DEFAULT_WORKER_GROUP: &str = "default";

/// 派发目标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCategory {
    /// 从Worker分组中任选可用节点，支持故障转移
    NodePool,
    /// 只发往已确定的节点
    PinnedHost,
}

impl fmt::Display for TargetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetCategory::NodePool => f.write_str("node_pool"),
            TargetCategory::PinnedHost => f.write_str("pinned_host"),
        }
    }
}

impl FromStr for TargetCategory {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node_pool" => Ok(TargetCategory::NodePool),
            "pinned_host" => Ok(TargetCategory::PinnedHost),
            _ => Err(DispatchError::InvalidTargetCategory(s.to_string())),
        }
    }
}

/// 一次派发调用的输入，构造时完成校验，之后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    target_category: TargetCategory,
    group_id: Option<String>,
    command: Command,
    preferred_host: Option<Host>,
}

impl DispatchRequest {
    pub fn new(
        target_category: TargetCategory,
        group_id: Option<String>,
        command: Command,
        preferred_host: Option<Host>,
    ) -> DispatchResult<Self> {
        if let Some(group) = &group_id {
            if group.trim().is_empty() {
                return Err(DispatchError::invalid_request("Worker分组不能为空字符串"));
            }
        }

        if target_category == TargetCategory::PinnedHost && preferred_host.is_none() {
            return Err(DispatchError::invalid_request(
                "pinned_host 类型的派发请求必须指定目标节点",
            ));
        }

        Ok(Self {
            target_category,
            group_id,
            command,
            preferred_host,
        })
    }

    /// 发往 `group_id` 分组内任一可用节点
    pub fn node_pool<S: Into<String>>(group_id: S, command: Command) -> DispatchResult<Self> {
        Self::new(
            TargetCategory::NodePool,
            Some(group_id.into()),
            command,
            None,
        )
    }

    /// 只发往 `host`
    pub fn pinned_host(host: Host, command: Command) -> Self {
        Self {
            target_category: TargetCategory::PinnedHost,
            group_id: None,
            command,
            preferred_host: Some(host),
        }
    }

    /// 优先尝试 `host`（通常是上次成功的节点）
    pub fn with_preferred_host(mut self, host: Host) -> Self {
        self.preferred_host = Some(host);
        self
    }

    pub fn target_category(&self) -> TargetCategory {
        self.target_category
    }
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }
    /// 未指定分组时回落到 [`DEFAULT_WORKER_GROUP`]
    pub fn effective_group(&self) -> &str {
        self.group_id.as_deref().unwrap_or(DEFAULT_WORKER_GROUP)
    }
    pub fn command(&self) -> &Command {
        &self.command
    }
    pub fn preferred_host(&self) -> Option<&Host> {
        self.preferred_host.as_ref()
    }
}

/// 单个节点上的尝试记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAttempt {
    pub host: Host,
    pub attempts: u32,
    pub last_error: Option<TransportError>,
}

impl HostAttempt {
    pub fn succeeded(host: Host, attempts: u32) -> Self {
        Self {
            host,
            attempts,
            last_error: None,
        }
    }
    pub fn is_success(&self) -> bool {
        self.last_error.is_none()
    }
}

/// 成功派发的结果，按值返回给调用方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub succeeded_host: Host,
    /// 按尝试顺序排列，最后一项为成功的节点
    pub attempts: Vec<HostAttempt>,
}

impl DispatchOutcome {
    pub fn hosts_tried(&self) -> usize {
        self.attempts.len()
    }
    pub fn total_attempts(&self) -> u32 {
        self.attempts.iter().map(|a| a.attempts).sum()
    }
    pub fn failed_over(&self) -> bool {
        self.attempts.len() > 1
    }
}
