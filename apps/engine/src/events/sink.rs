//! Hand-off of a session's events to an external fan-out mechanism.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::bus::{RecvError, Subscription};
use crate::domain::events::SessionEvent;

const FORWARD_MAX_ATTEMPTS: u32 = 3;
const FORWARD_INITIAL_RETRY_DELAY_MS: u64 = 50;
const FORWARD_MAX_RETRY_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Worth retrying.
    #[error("transient sink failure: {0}")]
    Transient(String),
    #[error("sink rejected event: {0}")]
    Permanent(String),
}

/// Where a forwarder delivers events: a socket broadcaster, a push queue, a
/// log.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &SessionEvent) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    pub delivered: u64,
    pub failed: u64,
    pub lagged: u64,
}

/// Drain `subscription` into `sink` until the session's bus closes.
pub fn spawn_forwarder(
    mut subscription: Subscription,
    sink: Arc<dyn EventSink>,
) -> JoinHandle<ForwardStats> {
    tokio::spawn(async move {
        let mut stats = ForwardStats::default();
        loop {
            match subscription.recv().await {
                Ok(event) => {
                    if deliver_with_retry(sink.as_ref(), &event).await {
                        stats.delivered += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed = missed.0, "Event forwarder lagged, events dropped");
                    stats.lagged += missed.0;
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(
            delivered = stats.delivered,
            failed = stats.failed,
            lagged = stats.lagged,
            "Event forwarder finished"
        );
        stats
    })
}

async fn deliver_with_retry(sink: &dyn EventSink, event: &SessionEvent) -> bool {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match sink.deliver(event).await {
            Ok(()) => return true,
            Err(err) => {
                let transient = matches!(err, SinkError::Transient(_));
                if attempt >= FORWARD_MAX_ATTEMPTS || !transient {
                    warn!(
                        error = %err,
                        session_id = %event.session_id,
                        seq = event.seq,
                        attempt,
                        "Dropping event after sink failure"
                    );
                    return false;
                }

                let delay_ms = FORWARD_INITIAL_RETRY_DELAY_MS
                    .saturating_mul(2_u64.pow(attempt - 1))
                    .min(FORWARD_MAX_RETRY_DELAY_MS);
                warn!(
                    error = %err,
                    attempt,
                    retry_delay_ms = delay_ms,
                    "Sink delivery failed, retrying"
                );
                sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
