pub mod delay;
pub mod registry;
pub mod transport;

pub use delay::*;
pub use registry::*;
pub use transport::*;
