//! Per-session event streams.

pub mod bus;
pub mod sink;

pub use bus::{EventBus, Lagged, OverflowPolicy, RecvError, Subscription};
pub use sink::{spawn_forwarder, EventSink, ForwardStats, SinkError};
