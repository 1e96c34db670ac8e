pub mod app_config;
pub mod dispatch_transport;
pub mod observability;
pub mod registry;

pub use app_config::AppConfig;
pub use dispatch_transport::{DispatchConfig, TransportConfig};
pub use observability::ObservabilityConfig;
pub use registry::RegistryConfig;
