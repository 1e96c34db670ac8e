use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use taskrelay_core::{
    models::Host, traits::NodeCandidateResolver, DispatchResult, RegistryConfig,
};

/// 内存中的Worker分组注册表
///
/// 初始成员来自配置，运行期间可以增删节点，供多个派发调用并发读取。
#[derive(Debug, Default)]
pub struct StaticNodeRegistry {
    groups: RwLock<HashMap<String, HashSet<Host>>>,
}

impl StaticNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RegistryConfig) -> anyhow::Result<Self> {
        let groups = config.parsed_groups()?;
        info!("从配置加载 {} 个Worker分组", groups.len());
        Ok(Self {
            groups: RwLock::new(groups),
        })
    }

    pub async fn register_host(&self, group_id: &str, host: Host) {
        let mut groups = self.groups.write().await;
        if groups
            .entry(group_id.to_string())
            .or_default()
            .insert(host.clone())
        {
            info!("节点 {} 加入分组 {}", host, group_id);
        }
    }

    /// 移除节点，返回节点此前是否在分组内
    pub async fn remove_host(&self, group_id: &str, host: &Host) -> bool {
        let mut groups = self.groups.write().await;
        let removed = groups
            .get_mut(group_id)
            .map(|hosts| hosts.remove(host))
            .unwrap_or(false);
        if removed {
            info!("节点 {} 离开分组 {}", host, group_id);
        }
        removed
    }

    pub async fn group_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.groups.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl NodeCandidateResolver for StaticNodeRegistry {
    async fn resolve(&self, group_id: &str) -> DispatchResult<HashSet<Host>> {
        let hosts = self
            .groups
            .read()
            .await
            .get(group_id)
            .cloned()
            .unwrap_or_default();
        debug!("分组 {} 当前有 {} 个节点", group_id, hosts.len());
        Ok(hosts)
    }
}
