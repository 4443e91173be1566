use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::action::Action;
use crate::api::{ApiClient, FetchError};
use crate::models::DisplaySnapshot;

/// Fixed liveness cadence, independent of the display's refresh interval.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Where snapshots come from. The refresher only ever talks to this seam,
/// so it can run against an in-memory source in tests.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    async fn fetch(&self) -> Result<DisplaySnapshot, FetchError>;
}

#[async_trait]
impl SnapshotSource for ApiClient {
    async fn fetch(&self) -> Result<DisplaySnapshot, FetchError> {
        self.fetch_snapshot().await
    }
}

/// Periodic snapshot refresher. Fetches once immediately, then on every
/// interval tick. The interval follows the backend-configured
/// `auto_refresh_seconds` through the watch channel; a change rebuilds the
/// timer instead of letting the old deadline run out. A poke on the
/// refresh channel (manual retry, push-channel `refresh`) fetches at once.
pub struct Poller<S> {
    source: S,
    action_tx: mpsc::UnboundedSender<Action>,
    interval_rx: watch::Receiver<Duration>,
    refresh_rx: mpsc::UnboundedReceiver<()>,
}

impl<S: SnapshotSource> Poller<S> {
    pub fn new(
        source: S,
        action_tx: mpsc::UnboundedSender<Action>,
        interval_rx: watch::Receiver<Duration>,
        refresh_rx: mpsc::UnboundedReceiver<()>,
    ) -> Self {
        Self {
            source,
            action_tx,
            interval_rx,
            refresh_rx,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(mut self, cancel: CancellationToken) {
        loop {
            self.fetch_once().await;

            let period = *self.interval_rx.borrow_and_update();
            let sleep = tokio::time::sleep(period);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = &mut sleep => break,
                    poke = self.refresh_rx.recv() => {
                        if poke.is_none() {
                            return;
                        }
                        break;
                    }
                    changed = self.interval_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let period = *self.interval_rx.borrow_and_update();
                        sleep.as_mut().reset(tokio::time::Instant::now() + period);
                    }
                }
            }
        }
    }

    /// A failure leaves the last good snapshot in place; only the typed
    /// error travels to the app.
    async fn fetch_once(&self) {
        match self.source.fetch().await {
            Ok(snapshot) => {
                let _ = self.action_tx.send(Action::SnapshotLoaded(Box::new(snapshot)));
            }
            Err(err) => {
                warn!("snapshot fetch failed: {err}");
                let _ = self.action_tx.send(Action::SnapshotFailed(err));
            }
        }
    }
}

/// Lower-frequency liveness ping. Failures are logged and swallowed; the
/// backend only uses it to mark the display online.
pub fn spawn_heartbeat(api: ApiClient, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = interval.tick() => {
                    if let Err(err) = api.heartbeat().await {
                        debug!("heartbeat failed: {err}");
                    }
                }
            }
        }
    })
}
