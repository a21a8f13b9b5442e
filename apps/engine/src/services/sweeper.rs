//! Optional background task that settles overdue turns in idle sessions.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::registry::SessionRegistry;

/// Owner of a running sweeper. Dropping it leaves the task running until
/// the registry itself is dropped.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to wind down.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(super) fn spawn(registry: Weak<SessionRegistry>, period: Duration) -> SweeperHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis() as u64, "Turn sweeper started");

        loop {
            ticker.tick().await;
            let Some(registry) = registry.upgrade() else {
                break;
            };
            let settled = registry.sweep_expired_turns().await;
            if settled > 0 {
                debug!(settled, "Sweeper settled expired turns");
            }
        }
        info!("Turn sweeper stopped: registry dropped");
    });
    SweeperHandle { task }
}
