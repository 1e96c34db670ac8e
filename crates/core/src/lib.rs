pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::{AppConfig, DispatchConfig, ObservabilityConfig, RegistryConfig, TransportConfig};
pub use errors::*;
pub use models::{
    Command, CommandType, DispatchOutcome, DispatchRequest, Host, HostAttempt, TargetCategory,
};
pub use traits::{
    NodeCandidateResolver, ResponseProcessor, RetryDelay, TokioRetryDelay, TransportSender,
};

/// 统一的Result类型
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
