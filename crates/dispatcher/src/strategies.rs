use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use taskrelay_core::models::Host;

/// 将候选节点集合排成尝试顺序
pub trait HostOrderingStrategy: Send + Sync {
    /// 返回的序列中每个节点至多出现一次，`preferred` 存在时必为第一个
    fn order(&self, candidates: HashSet<Host>, preferred: Option<&Host>) -> Vec<Host>;

    fn name(&self) -> &str;
}

/// 优先节点排首位，其余节点按地址、端口升序排列
pub struct PreferredFirstStrategy;

impl PreferredFirstStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PreferredFirstStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HostOrderingStrategy for PreferredFirstStrategy {
    fn order(&self, candidates: HashSet<Host>, preferred: Option<&Host>) -> Vec<Host> {
        let mut remaining: BTreeSet<Host> = candidates.into_iter().collect();
        let mut ordered = Vec::with_capacity(remaining.len() + 1);

        if let Some(host) = preferred {
            remaining.remove(host);
            ordered.push(host.clone());
        }
        ordered.extend(remaining);

        debug!(
            "节点排序策略 {} 生成尝试顺序: {:?}",
            self.name(),
            ordered.iter().map(Host::to_string).collect::<Vec<_>>()
        );

        ordered
    }

    fn name(&self) -> &str {
        "PreferredFirst"
    }
}
