//! Stopping the block loop at a block boundary.
//!
//! A block is always finished once started: its snapshot is stored before
//! the state is published, so stopping never leaves a half-applied block.
//! [`StopMode::Drain`] closes the queue and lets the loop work through what
//! is already in it; [`StopMode::Now`] stops after the block in flight.

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StopMode {
    Drain,
    Now,
}

pub struct ShutdownController {
    tx: watch::Sender<Option<StopMode>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// A receiver whose current value is the mode requested so far.
    pub fn subscribe(&self) -> watch::Receiver<Option<StopMode>> {
        self.tx.subscribe()
    }

    pub fn requested(&self) -> Option<StopMode> {
        *self.tx.borrow()
    }

    /// Request a stop. A request never weakens an earlier one.
    pub fn stop(&self, mode: StopMode) {
        self.tx.send_if_modified(|current| {
            if current.is_some_and(|c| c >= mode) {
                return false;
            }
            *current = Some(mode);
            true
        });
    }

    /// First SIGINT or SIGTERM drains the queue, the second stops at once.
    pub async fn wait_for_signal(&self) {
        next_signal().await;
        info!("draining queued blocks before shutdown");
        self.stop(StopMode::Drain);
        next_signal().await;
        info!("stopping after the current block");
        self.stop(StopMode::Now);
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

async fn next_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "no SIGTERM handler, waiting for SIGINT only");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_escalates_to_now() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        assert_eq!(*rx.borrow(), None);

        controller.stop(StopMode::Drain);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(StopMode::Drain));

        controller.stop(StopMode::Now);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(StopMode::Now));
    }

    #[test]
    fn later_drain_does_not_cancel_now() {
        let controller = ShutdownController::new();
        controller.stop(StopMode::Now);
        controller.stop(StopMode::Drain);
        assert_eq!(controller.requested(), Some(StopMode::Now));
    }

    #[test]
    fn late_subscriber_sees_earlier_request() {
        let controller = ShutdownController::new();
        controller.stop(StopMode::Drain);
        assert_eq!(*controller.subscribe().borrow(), Some(StopMode::Drain));
    }
}
