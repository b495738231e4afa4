//! Common utilities shared across the refund scoring workspace.
//!
//! - YAML configuration with `!include` support
//! - Shared test utilities and assertion macros (feature `test-helpers`)

pub mod config;
pub mod yaml_include;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{TestError, TestResult};
