use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 派发重试配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 单个节点首次失败后的重试次数，总尝试次数为 `max_retries + 1`
    pub max_retries: u32,
    /// 两次尝试之间的固定间隔（毫秒）
    pub retry_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl DispatchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// TCP传输配置，超时均作用于单次发送尝试
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// 发送成功后等待Worker回传消息的空闲时间，超时即关闭连接
    pub response_idle_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3_000,
            write_timeout_ms: 3_000,
            response_idle_timeout_ms: 30_000,
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn response_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.response_idle_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(anyhow::anyhow!("连接超时时间必须大于0"));
        }

        if self.write_timeout_ms == 0 {
            return Err(anyhow::anyhow!("写入超时时间必须大于0"));
        }

        if self.response_idle_timeout_ms == 0 {
            return Err(anyhow::anyhow!("回传消息空闲超时时间必须大于0"));
        }

        Ok(())
    }
}
