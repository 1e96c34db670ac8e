pub mod processors;
pub mod registry;
pub mod transport;

pub use processors::*;
pub use registry::*;
pub use transport::*;
