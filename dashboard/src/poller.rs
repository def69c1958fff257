use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::app::Event;
use crate::client::Backend;

/// Fetches status snapshots on a fixed interval.
///
/// Each tick gets its own task, so a slow response never delays the next
/// tick. Snapshots reach the event loop in arrival order, which is not
/// necessarily tick order; the renderer overwrites everything on each one.
#[derive(Clone)]
pub struct StatusPoller {
    backend: Arc<dyn Backend>,
    events: UnboundedSender<Event>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn Backend>, events: UnboundedSender<Event>, interval: Duration) -> Self {
        Self { backend, events, interval }
    }

    /// One fetch in the background. Failures are logged and dropped; the
    /// document keeps whatever it last rendered.
    pub fn poll_now(&self) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            match backend.fetch_status().await {
                Ok(snap) => {
                    debug!("Status fetched: active={}", snap.active);
                    events.send(Event::Snapshot(Box::new(snap))).ok();
                }
                Err(e) => warn!("Status poll failed: {e}"),
            }
        })
    }

    /// Poll immediately, then every interval until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Polling every {}ms", self.interval.as_millis());
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_now();
                }
                _ = shutdown.changed() => {
                    debug!("Poller stopping");
                    break;
                }
            }
        }
    }
}
