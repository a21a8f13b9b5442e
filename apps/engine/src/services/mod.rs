//! Session orchestration: the registry and the handles it hands out.

pub mod registry;
pub mod session_flow;
pub mod sweeper;

pub use registry::SessionRegistry;
pub use session_flow::{AttemptReport, HintReport, SessionHandle};
pub use sweeper::SweeperHandle;
