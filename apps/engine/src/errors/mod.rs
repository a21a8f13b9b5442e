//! Error handling for the spellbee engine.

pub mod error_code;

pub use error_code::ErrorCode;
