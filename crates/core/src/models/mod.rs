pub mod command;
pub mod dispatch;
pub mod host;

pub use command::*;
pub use dispatch::*;
pub use host::*;
