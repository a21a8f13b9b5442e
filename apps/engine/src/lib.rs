#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

//! Turn-based spelling session engine.
//!
//! A [`SessionRegistry`] owns live sessions; each [`SessionHandle`] serializes
//! the mutations of one session, talks to the external [`capabilities`] and
//! publishes ordered events on its [`EventBus`].

pub mod capabilities;
pub mod config;
pub mod domain;
pub mod error;
pub mod errors;
pub mod events;
pub mod services;

// Re-exports for public API
pub use capabilities::{Capabilities, Capability, CapabilityError};
pub use config::EngineConfig;
pub use domain::{
    Attempt, AttemptSource, GameMode, HintKind, PlayerId, PlayerProfile, SessionEvent, SessionId,
    SessionKind, SessionSettings, SessionSnapshot, SessionStatus, Word,
};
pub use error::EngineError;
pub use errors::ErrorCode;
pub use events::{EventBus, OverflowPolicy, Subscription};
pub use services::{AttemptReport, HintReport, SessionHandle, SessionRegistry, SweeperHandle};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    engine_test_support::logging::init();
}
