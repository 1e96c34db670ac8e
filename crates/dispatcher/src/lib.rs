//! 任务派发层
//!
//! 候选节点排序、单节点有限重试、跨节点故障转移，以及面向已锁定节点的直接派发。

pub mod direct;
pub mod executor_manager;
pub mod failover;
pub mod retry_sender;
pub mod strategies;

pub use direct::DirectDispatcher;
pub use executor_manager::{ExecutorManager, ExecutorManagerBuilder};
pub use failover::FailoverDispatcher;
pub use retry_sender::{BoundedRetrySender, RetryPolicy};
pub use strategies::*;
