//! Test support shared by the engine's unit and integration tests.
//!
//! Kept free of any dependency on the engine itself so that the engine can
//! use it from `#[cfg(test)]` code.

pub mod logging;
pub mod props;

pub use props::proptest_config;
