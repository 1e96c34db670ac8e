use std::collections::{HashMap, HashSet};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::Host;

/// 静态Worker分组配置，节点地址格式为 `address:port`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,
}

impl RegistryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.parsed_groups().map(|_| ())
    }

    /// 解析所有分组的节点地址
    pub fn parsed_groups(&self) -> anyhow::Result<HashMap<String, HashSet<Host>>> {
        let mut groups = HashMap::with_capacity(self.groups.len());
        for (group, addresses) in &self.groups {
            if group.trim().is_empty() {
                return Err(anyhow::anyhow!("Worker分组名不能为空"));
            }
            let hosts = addresses
                .iter()
                .map(|address| {
                    address
                        .parse::<Host>()
                        .with_context(|| format!("分组 {group} 中的节点地址无效: {address}"))
                })
                .collect::<anyhow::Result<HashSet<Host>>>()?;
            groups.insert(group.clone(), hosts);
        }
        Ok(groups)
    }
}
