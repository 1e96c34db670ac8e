use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DispatchError;

/// Worker节点地址
///
/// 相等性和排序都按 `address` 再按 `port` 比较，候选节点的确定性顺序依赖于此。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
    pub port: u16,
}

impl Host {
    pub fn new<S: Into<String>>(address: S, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl FromStr for Host {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| DispatchError::invalid_request(format!("节点地址缺少端口: {s}")))?;

        if address.is_empty() {
            return Err(DispatchError::invalid_request(format!(
                "节点地址不能为空: {s}"
            )));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| DispatchError::invalid_request(format!("无效的端口 {port}: {e}")))?;

        Ok(Host::new(address, port))
    }
}
