use std::collections::HashSet;

use async_trait::async_trait;

use crate::{models::Host, DispatchResult};

/// 节点注册中心：Worker分组到当前存活节点的映射
#[async_trait]
pub trait NodeCandidateResolver: Send + Sync {
    /// 返回分组内当前可用的节点，分组不存在或为空时返回空集合
    async fn resolve(&self, group_id: &str) -> DispatchResult<HashSet<Host>>;
}
