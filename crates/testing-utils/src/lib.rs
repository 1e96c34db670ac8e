//! # Taskrelay Testing Utils
//!
//! Shared testing utilities for the dispatch layer.
//!
//! - **Mock Resolver**: in-memory worker group registry that counts lookups
//! - **Scripted Transport**: per-host scripted send results plus an attempt log
//! - **Recording Delay**: retry delay that records instead of sleeping
//! - **Builders**: commands and host sets with sensible defaults
//!
//! ```toml
//! [dev-dependencies]
//! taskrelay-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
